//! Liveness layer.
//!
//! Tracks when each status stream was last heard from and hands the latest
//! status of a stream that went silent to a [`monitor::TimeoutHandler`].

pub(crate) mod monitor;
pub(crate) mod record;
