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

//! Typed module self-reports and the identity used to correlate them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// The fixed set of module kinds that announce themselves on discovery channels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub enum ModuleType {
    Gateway,
    Tutor,
    Domain,
    Sensor,
    Learner,
    Pedagogical,
    #[serde(rename = "LMS")]
    Lms,
    #[serde(rename = "UMS")]
    Ums,
    WebMonitor,
}

impl ModuleType {
    pub const ALL: [ModuleType; 9] = [
        ModuleType::Gateway,
        ModuleType::Tutor,
        ModuleType::Domain,
        ModuleType::Sensor,
        ModuleType::Learner,
        ModuleType::Pedagogical,
        ModuleType::Lms,
        ModuleType::Ums,
        ModuleType::WebMonitor,
    ];

    /// Default discovery channel this module type announces on.
    pub fn default_discovery_channel(&self) -> String {
        let prefix = match self {
            ModuleType::WebMonitor => "Monitor",
            other => other.as_str(),
        };
        format!("{prefix}_Discovery_Topic")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Gateway => "Gateway",
            ModuleType::Tutor => "Tutor",
            ModuleType::Domain => "Domain",
            ModuleType::Sensor => "Sensor",
            ModuleType::Learner => "Learner",
            ModuleType::Pedagogical => "Pedagogical",
            ModuleType::Lms => "LMS",
            ModuleType::Ums => "UMS",
            ModuleType::WebMonitor => "WebMonitor",
        }
    }
}

impl Display for ModuleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant payload of a [`ModuleStatus`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StatusKind {
    /// Plain "I am alive" report carrying only the inbox.
    Heartbeat,
    /// Gateway instance that also streams live training-application state.
    Gateway { topic: String },
    /// Embedded-application session advertised by the tutor; identity is the topic.
    TutorSession { topic: String },
    /// Domain module with its current set of log-playback session topics.
    Domain { log_playback_topics: BTreeSet<String> },
}

/// Most recent self-report of one module.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleStatus {
    pub module_type: ModuleType,
    pub module_name: String,
    pub inbox_channel: String,
    pub kind: StatusKind,
}

impl ModuleStatus {
    pub fn heartbeat(
        module_type: ModuleType,
        module_name: impl Into<String>,
        inbox_channel: impl Into<String>,
    ) -> Self {
        Self {
            module_type,
            module_name: module_name.into(),
            inbox_channel: inbox_channel.into(),
            kind: StatusKind::Heartbeat,
        }
    }

    pub fn gateway(
        module_name: impl Into<String>,
        inbox_channel: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            module_type: ModuleType::Gateway,
            module_name: module_name.into(),
            inbox_channel: inbox_channel.into(),
            kind: StatusKind::Gateway {
                topic: topic.into(),
            },
        }
    }

    pub fn tutor_session(
        module_name: impl Into<String>,
        inbox_channel: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            module_type: ModuleType::Tutor,
            module_name: module_name.into(),
            inbox_channel: inbox_channel.into(),
            kind: StatusKind::TutorSession {
                topic: topic.into(),
            },
        }
    }

    pub fn domain<I, S>(
        module_name: impl Into<String>,
        inbox_channel: impl Into<String>,
        log_playback_topics: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module_type: ModuleType::Domain,
            module_name: module_name.into(),
            inbox_channel: inbox_channel.into(),
            kind: StatusKind::Domain {
                log_playback_topics: log_playback_topics.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// The broadcast topic, for variants that carry exactly one.
    pub fn broadcast_topic(&self) -> Option<&str> {
        match &self.kind {
            StatusKind::Gateway { topic } | StatusKind::TutorSession { topic } => Some(topic),
            StatusKind::Heartbeat | StatusKind::Domain { .. } => None,
        }
    }

    pub fn log_playback_topics(&self) -> Option<&BTreeSet<String>> {
        match &self.kind {
            StatusKind::Domain {
                log_playback_topics,
            } => Some(log_playback_topics),
            StatusKind::Heartbeat | StatusKind::Gateway { .. } | StatusKind::TutorSession { .. } => {
                None
            }
        }
    }

    /// Identity used to recognize successive reports as the same stream.
    pub fn status_key(&self) -> StatusKey {
        match &self.kind {
            StatusKind::TutorSession { topic } => StatusKey(topic.clone()),
            StatusKind::Heartbeat | StatusKind::Gateway { .. } | StatusKind::Domain { .. } => {
                StatusKey(self.inbox_channel.clone())
            }
        }
    }
}

impl Display for ModuleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} module '{}' (inbox {})",
            self.module_type, self.module_name, self.inbox_channel
        )?;
        match &self.kind {
            StatusKind::Heartbeat => Ok(()),
            StatusKind::Gateway { topic } | StatusKind::TutorSession { topic } => {
                write!(f, " topic {topic}")
            }
            StatusKind::Domain {
                log_playback_topics,
            } => write!(f, " {} log playback topic(s)", log_playback_topics.len()),
        }
    }
}

/// Correlation identity of a status stream.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct StatusKey(pub String);

impl StatusKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StatusKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusKey {
    fn from(value: &str) -> Self {
        StatusKey(value.to_string())
    }
}
