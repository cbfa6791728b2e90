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

//! Per-module memory of the log-playback topics a domain module last reported.

use crate::status::module_status::StatusKey;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

/// Change between two successive topic sets of one module.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct TopicDiff {
    pub(crate) added: BTreeSet<String>,
    pub(crate) removed: BTreeSet<String>,
}

impl TopicDiff {
    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub(crate) struct DomainTopicTracker {
    topics_by_module: Mutex<HashMap<StatusKey, BTreeSet<String>>>,
}

impl DomainTopicTracker {
    pub(crate) fn new() -> Self {
        Self {
            topics_by_module: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `current` as the module's topic set and returns what changed.
    pub(crate) async fn observe(&self, key: &StatusKey, current: &BTreeSet<String>) -> TopicDiff {
        let mut topics_by_module = self.topics_by_module.lock().await;
        let previous = topics_by_module
            .insert(key.clone(), current.clone())
            .unwrap_or_default();

        TopicDiff {
            added: current.difference(&previous).cloned().collect(),
            removed: previous.difference(current).cloned().collect(),
        }
    }

    /// Keeps `topic` in the module's set after its removal could not be
    /// carried out, so the next report diffs it as removed again.
    pub(crate) async fn retain_pending(&self, key: &StatusKey, topic: &str) {
        self.topics_by_module
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .insert(topic.to_string());
    }

    pub(crate) async fn topics_for(&self, key: &StatusKey) -> BTreeSet<String> {
        self.topics_by_module
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn forget(&self, key: &StatusKey) -> Option<BTreeSet<String>> {
        self.topics_by_module.lock().await.remove(key)
    }
}
