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

//! Conversion between raw discovery messages and typed [`ModuleStatus`] records.
//!
//! The wire envelope is JSON:
//!
//! ```json
//! {
//!   "message_type": "GatewayModuleStatus",
//!   "time_stamp": 1700000000000,
//!   "payload": {
//!     "module_name": "gateway",
//!     "module_type": "Gateway",
//!     "queue_name": "Gateway_Queue_abc_Inbox",
//!     "topic_name": "Gateway_Topic_abc"
//!   }
//! }
//! ```
//!
//! Decoding is channel aware: each discovery channel belongs to one module type
//! and only accepts the message types that module type emits.

use crate::broker::RawMessage;
use crate::status::module_status::{ModuleStatus, ModuleType, StatusKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum WireMessageType {
    ModuleStatus,
    GatewayModuleStatus,
    TutorModuleStatus,
    DomainModuleStatus,
    WebMonitorModuleStatus,
}

impl Display for WireMessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WireMessageType::ModuleStatus => "ModuleStatus",
            WireMessageType::GatewayModuleStatus => "GatewayModuleStatus",
            WireMessageType::TutorModuleStatus => "TutorModuleStatus",
            WireMessageType::DomainModuleStatus => "DomainModuleStatus",
            WireMessageType::WebMonitorModuleStatus => "WebMonitorModuleStatus",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct WireEnvelope {
    message_type: WireMessageType,
    time_stamp: u64,
    payload: WirePayload,
}

#[derive(Debug, Deserialize, Serialize)]
struct WirePayload {
    module_name: String,
    module_type: ModuleType,
    queue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_playback_topics: Option<BTreeSet<String>>,
}

/// Reasons a discovery message is dropped.
#[derive(Debug)]
pub enum DecodeError {
    Malformed(serde_json::Error),
    UnknownDiscoveryChannel(String),
    UnexpectedMessageType {
        channel: String,
        message_type: WireMessageType,
    },
    ModuleTypeMismatch {
        channel: String,
        expected: ModuleType,
        found: ModuleType,
    },
    MissingField(&'static str),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "malformed discovery payload: {err}"),
            DecodeError::UnknownDiscoveryChannel(channel) => {
                write!(f, "message received on unknown discovery channel '{channel}'")
            }
            DecodeError::UnexpectedMessageType {
                channel,
                message_type,
            } => write!(
                f,
                "message type {message_type} is not handled on discovery channel '{channel}'"
            ),
            DecodeError::ModuleTypeMismatch {
                channel,
                expected,
                found,
            } => write!(
                f,
                "discovery channel '{channel}' carries {expected} statuses but received {found}"
            ),
            DecodeError::MissingField(field) => {
                write!(f, "discovery payload is missing required field '{field}'")
            }
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

/// A decoded status plus the sender's own timestamp (milliseconds).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedStatus {
    pub status: ModuleStatus,
    pub sent_timestamp_ms: u64,
}

/// Channel-aware decoder for discovery traffic.
#[derive(Clone, Debug)]
pub struct StatusCodec {
    channel_types: HashMap<String, ModuleType>,
}

impl StatusCodec {
    pub fn new<I, S>(discovery_channels: I) -> Self
    where
        I: IntoIterator<Item = (S, ModuleType)>,
        S: Into<String>,
    {
        Self {
            channel_types: discovery_channels
                .into_iter()
                .map(|(channel, module_type)| (channel.into(), module_type))
                .collect(),
        }
    }

    pub fn module_type_for(&self, channel: &str) -> Option<ModuleType> {
        self.channel_types.get(channel).copied()
    }

    /// Decodes one message received on `channel`. Fails closed on anything
    /// that is not a well-formed status for that channel's module type.
    pub fn decode(&self, channel: &str, message: &RawMessage) -> Result<DecodedStatus, DecodeError> {
        let channel_type = self
            .module_type_for(channel)
            .ok_or_else(|| DecodeError::UnknownDiscoveryChannel(channel.to_string()))?;

        let envelope: WireEnvelope =
            serde_json::from_slice(message.as_bytes()).map_err(DecodeError::Malformed)?;

        if !Self::accepts(channel_type, envelope.message_type) {
            return Err(DecodeError::UnexpectedMessageType {
                channel: channel.to_string(),
                message_type: envelope.message_type,
            });
        }

        let payload = envelope.payload;
        if payload.module_type != channel_type {
            return Err(DecodeError::ModuleTypeMismatch {
                channel: channel.to_string(),
                expected: channel_type,
                found: payload.module_type,
            });
        }
        if payload.queue_name.is_empty() {
            return Err(DecodeError::MissingField("queue_name"));
        }

        let kind = match envelope.message_type {
            WireMessageType::ModuleStatus | WireMessageType::WebMonitorModuleStatus => {
                StatusKind::Heartbeat
            }
            WireMessageType::GatewayModuleStatus => StatusKind::Gateway {
                topic: Self::required_topic(payload.topic_name)?,
            },
            WireMessageType::TutorModuleStatus => StatusKind::TutorSession {
                topic: Self::required_topic(payload.topic_name)?,
            },
            WireMessageType::DomainModuleStatus => StatusKind::Domain {
                log_playback_topics: payload
                    .log_playback_topics
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|topic| !topic.is_empty())
                    .collect(),
            },
        };

        Ok(DecodedStatus {
            status: ModuleStatus {
                module_type: payload.module_type,
                module_name: payload.module_name,
                inbox_channel: payload.queue_name,
                kind,
            },
            sent_timestamp_ms: envelope.time_stamp,
        })
    }

    /// Encodes a status in the envelope [`StatusCodec::decode`] understands.
    pub fn encode(status: &ModuleStatus, sent_timestamp_ms: u64) -> Result<RawMessage, serde_json::Error> {
        let (message_type, topic_name, log_playback_topics) = match &status.kind {
            StatusKind::Heartbeat if status.module_type == ModuleType::WebMonitor => {
                (WireMessageType::WebMonitorModuleStatus, None, None)
            }
            StatusKind::Heartbeat => (WireMessageType::ModuleStatus, None, None),
            StatusKind::Gateway { topic } => {
                (WireMessageType::GatewayModuleStatus, Some(topic.clone()), None)
            }
            StatusKind::TutorSession { topic } => {
                (WireMessageType::TutorModuleStatus, Some(topic.clone()), None)
            }
            StatusKind::Domain {
                log_playback_topics,
            } => (
                WireMessageType::DomainModuleStatus,
                None,
                Some(log_playback_topics.clone()),
            ),
        };

        let envelope = WireEnvelope {
            message_type,
            time_stamp: sent_timestamp_ms,
            payload: WirePayload {
                module_name: status.module_name.clone(),
                module_type: status.module_type,
                queue_name: status.inbox_channel.clone(),
                topic_name,
                log_playback_topics,
            },
        };

        serde_json::to_string(&envelope).map(RawMessage::text)
    }

    fn accepts(channel_type: ModuleType, message_type: WireMessageType) -> bool {
        match channel_type {
            ModuleType::Gateway => message_type == WireMessageType::GatewayModuleStatus,
            ModuleType::Domain => message_type == WireMessageType::DomainModuleStatus,
            ModuleType::WebMonitor => message_type == WireMessageType::WebMonitorModuleStatus,
            ModuleType::Tutor => matches!(
                message_type,
                WireMessageType::ModuleStatus | WireMessageType::TutorModuleStatus
            ),
            ModuleType::Sensor
            | ModuleType::Learner
            | ModuleType::Pedagogical
            | ModuleType::Lms
            | ModuleType::Ums => message_type == WireMessageType::ModuleStatus,
        }
    }

    fn required_topic(topic_name: Option<String>) -> Result<String, DecodeError> {
        topic_name
            .filter(|topic| !topic.is_empty())
            .ok_or(DecodeError::MissingField("topic_name"))
    }
}
