//! Status layer.
//!
//! Typed module self-reports, the correlation key used by liveness tracking,
//! and the channel-aware codec that turns raw discovery traffic into statuses.

pub(crate) mod codec;
pub(crate) mod module_status;
