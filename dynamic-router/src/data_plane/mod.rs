//! Data-plane layer.
//!
//! Discovery listeners decode statuses and record liveness on the broker's
//! delivery path, then hand each status over a bounded queue to a single
//! dispatch worker. Everything that talks to the broker (route installs,
//! dropped-topic removal) happens on that worker.

pub(crate) mod discovery_listener;
pub(crate) mod dispatch_worker;
