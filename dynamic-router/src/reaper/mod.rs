//! Removal layer.
//!
//! Deletes broker routes and channels whose names contain a module's
//! identifying substrings. Each removal opens its own admin session; the
//! session is closed off the caller's path when the removal ends, however it
//! ends. Per-item failures are collected, never fatal.

pub(crate) mod admin_session;
pub(crate) mod channel_reaper;
pub(crate) mod report;
