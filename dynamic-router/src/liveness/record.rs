//! Per-status-key liveness bookkeeping.

use crate::status::module_status::{ModuleStatus, StatusKey};
use tokio::time::Instant;

/// Liveness state of one status stream. Updated in place on every report;
/// `timed_out` is terminal for this record.
#[derive(Clone, Debug)]
pub struct LivenessRecord {
    pub status_key: StatusKey,
    /// Monotonic instant the latest report was handled.
    pub last_received: Instant,
    /// Timestamp the module put in its latest report, for diagnostics only.
    pub last_sent_timestamp_ms: u64,
    pub latest_status: ModuleStatus,
    pub timed_out: bool,
    pub(crate) removal_attempts: u32,
}

impl LivenessRecord {
    pub(crate) fn new(status: ModuleStatus, sent_timestamp_ms: u64) -> Self {
        Self {
            status_key: status.status_key(),
            last_received: Instant::now(),
            last_sent_timestamp_ms: sent_timestamp_ms,
            latest_status: status,
            timed_out: false,
            removal_attempts: 0,
        }
    }

    pub(crate) fn refresh(&mut self, status: ModuleStatus, sent_timestamp_ms: u64) {
        self.last_received = Instant::now();
        self.last_sent_timestamp_ms = sent_timestamp_ms;
        self.latest_status = status;
    }
}
