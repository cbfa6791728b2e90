/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Liveness tracking: one record and one periodic check per status key.
//!
//! The table lock is only held to look up, insert or remove an entry. Each
//! entry carries its own lock, so a report for one key never waits on another
//! key's timeout handling. The timeout handler runs with no lock held.

use crate::config::LivenessConfig;
use crate::liveness::record::LivenessRecord;
use crate::observability::{events, fields};
use crate::reaper::report::RemovalError;
use crate::status::module_status::{ModuleStatus, StatusKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

const COMPONENT: &str = "liveness_monitor";

/// Invoked once per timed-out status key with the latest status it reported.
#[async_trait]
pub trait TimeoutHandler: Send + Sync {
    async fn on_timeout(&self, status: &ModuleStatus) -> Result<(), RemovalError>;
}

/// How a report was folded into the liveness table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportOutcome {
    /// First report for the key, or first report after it timed out.
    Discovered,
    /// Existing record refreshed in place.
    Updated,
}

struct LivenessEntry {
    record: Mutex<LivenessRecord>,
    timer: OnceLock<AbortHandle>,
}

impl LivenessEntry {
    fn new(status: ModuleStatus, sent_timestamp_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(LivenessRecord::new(status, sent_timestamp_ms)),
            timer: OnceLock::new(),
        })
    }

    fn abort_timer(&self) {
        if let Some(timer) = self.timer.get() {
            timer.abort();
        }
    }
}

struct MonitorInner {
    config: LivenessConfig,
    handler: Arc<dyn TimeoutHandler>,
    entries: Mutex<HashMap<StatusKey, Arc<LivenessEntry>>>,
}

impl MonitorInner {
    async fn is_current(&self, key: &StatusKey, entry: &Arc<LivenessEntry>) -> bool {
        self.entries
            .lock()
            .await
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    async fn remove_if_current(&self, key: &StatusKey, entry: &Arc<LivenessEntry>) -> bool {
        let mut entries = self.entries.lock().await;
        if entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            entries.remove(key);
            return true;
        }
        false
    }
}

#[derive(Clone)]
pub(crate) struct LivenessMonitor {
    inner: Arc<MonitorInner>,
}

impl LivenessMonitor {
    pub(crate) fn new(config: LivenessConfig, handler: Arc<dyn TimeoutHandler>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                config,
                handler,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Records a report. Creates the record and its periodic check on first
    /// sight of the key, otherwise refreshes the existing record in place.
    pub(crate) async fn record_report(
        &self,
        status: &ModuleStatus,
        sent_timestamp_ms: u64,
    ) -> ReportOutcome {
        let key = status.status_key();
        loop {
            let existing = self.inner.entries.lock().await.get(&key).cloned();

            if let Some(entry) = existing.as_ref() {
                let mut record = entry.record.lock().await;
                if !record.timed_out {
                    record.refresh(status.clone(), sent_timestamp_ms);
                    trace!(
                        event = events::LIVENESS_UPDATED,
                        component = COMPONENT,
                        status_key = %key,
                        sent_timestamp_ms,
                        "liveness record refreshed"
                    );
                    return ReportOutcome::Updated;
                }
                // timed out and awaiting cleanup; this report starts a new record
            }

            if self
                .insert_fresh(&key, existing.as_ref(), status, sent_timestamp_ms)
                .await
            {
                return ReportOutcome::Discovered;
            }
            // lost a race with another report or a cleanup; look again
        }
    }

    async fn insert_fresh(
        &self,
        key: &StatusKey,
        expected: Option<&Arc<LivenessEntry>>,
        status: &ModuleStatus,
        sent_timestamp_ms: u64,
    ) -> bool {
        let mut entries = self.inner.entries.lock().await;
        let unchanged = match (entries.get(key), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => Arc::ptr_eq(current, expected),
            _ => false,
        };
        if !unchanged {
            return false;
        }

        let entry = LivenessEntry::new(status.clone(), sent_timestamp_ms);
        let timer = tokio::spawn(Self::run_timer(
            self.inner.clone(),
            key.clone(),
            entry.clone(),
        ));
        let _ = entry.timer.set(timer.abort_handle());
        let reason = match entries.insert(key.clone(), entry) {
            Some(_) => fields::REASON_SUPERSEDED,
            None => fields::NONE,
        };

        info!(
            event = events::LIVENESS_DISCOVERED,
            component = COMPONENT,
            status_key = %key,
            module_type = %status.module_type,
            module_name = status.module_name.as_str(),
            inbox = status.inbox_channel.as_str(),
            topic = %fields::format_broadcast_topic(status),
            reason,
            "tracking module liveness"
        );
        true
    }

    async fn run_timer(inner: Arc<MonitorInner>, key: StatusKey, entry: Arc<LivenessEntry>) {
        let period = inner.config.poll_interval();
        let timeout = inner.config.timeout();
        let max_attempts = inner.config.max_removal_attempts.max(1);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (status, attempt) = {
                let mut record = entry.record.lock().await;
                if !record.timed_out {
                    let silent_for = record.last_received.elapsed();
                    if silent_for <= timeout {
                        continue;
                    }
                    record.timed_out = true;
                    info!(
                        event = events::LIVENESS_TIMED_OUT,
                        component = COMPONENT,
                        status_key = %key,
                        elapsed_ms = silent_for.as_millis() as u64,
                        "module went silent"
                    );
                }
                record.removal_attempts += 1;
                (record.latest_status.clone(), record.removal_attempts)
            };

            if attempt > 1 && !inner.is_current(&key, &entry).await {
                // a newer report took over the key while waiting to retry
                break;
            }

            match inner.handler.on_timeout(&status).await {
                Err(err @ RemovalError::AdminConnection { .. }) if attempt < max_attempts => {
                    warn!(
                        event = events::LIVENESS_REMOVAL_RETRY,
                        component = COMPONENT,
                        status_key = %key,
                        attempt,
                        err = %err,
                        "removal could not start; retrying on next check"
                    );
                    continue;
                }
                Err(err) => {
                    warn!(
                        event = events::LIVENESS_RECORD_REMOVED,
                        component = COMPONENT,
                        status_key = %key,
                        attempt,
                        err = %err,
                        "giving up on removal; dropping liveness record"
                    );
                }
                Ok(()) => {
                    debug!(
                        event = events::LIVENESS_RECORD_REMOVED,
                        component = COMPONENT,
                        status_key = %key,
                        attempt,
                        "dropping liveness record"
                    );
                }
            }

            inner.remove_if_current(&key, &entry).await;
            break;
        }
    }

    pub(crate) async fn is_tracking(&self, key: &StatusKey) -> bool {
        self.inner.entries.lock().await.contains_key(key)
    }

    pub(crate) async fn tracked_keys(&self) -> Vec<StatusKey> {
        let mut keys: Vec<StatusKey> = self.inner.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of the record for `key`.
    pub(crate) async fn record(&self, key: &StatusKey) -> Option<LivenessRecord> {
        let entry = self.inner.entries.lock().await.get(key).cloned()?;
        let record = entry.record.lock().await;
        Some(record.clone())
    }

    /// Cancels every periodic check and forgets all records.
    pub(crate) async fn shutdown(&self) {
        let entries: Vec<Arc<LivenessEntry>> = self
            .inner
            .entries
            .lock()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in entries {
            entry.abort_timer();
        }
    }
}
