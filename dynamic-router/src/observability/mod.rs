//! Structured logging vocabulary.
//!
//! Library code emits `tracing` events tagged with `event` and `component`
//! fields and never installs a global subscriber.

pub mod events;
pub mod fields;
