//! Control-plane layer.
//!
//! Owns route-installation semantics and the bookkeeping that makes them
//! idempotent: the inbox route table, the installed-topic set, and the
//! per-module memory of domain log-playback topics. A record is only written
//! after the broker has accepted and started the route, so a failed install is
//! retried by the next report of the same module.

pub(crate) mod domain_topics;
pub(crate) mod route_installer;
pub(crate) mod route_table;
pub(crate) mod topic_installer;
