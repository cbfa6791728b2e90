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

//! Router configuration.
//!
//! Every field has a default so an empty json5 document (`{}`) is a valid
//! configuration.

use crate::status::module_status::ModuleType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RouterConfig {
    pub dispatch_queue_size: usize,
    pub channels: ChannelNaming,
    pub liveness: LivenessConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dispatch_queue_size: 256,
            channels: ChannelNaming::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryChannelConfig {
    pub module_type: ModuleType,
    pub channel: String,
}

/// Channel-name conventions the router relies on.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ChannelNaming {
    pub discovery: Vec<DiscoveryChannelConfig>,
    pub logger_sink: String,
    pub monitor_topic: String,
    pub inbox_suffix: String,
    pub gateway_topic_prefix: String,
    pub gateway_queue_prefix: String,
    pub tutor_topic_prefix: String,
    pub domain_topic_prefix: String,
}

impl Default for ChannelNaming {
    fn default() -> Self {
        Self {
            discovery: ModuleType::ALL
                .iter()
                .map(|module_type| DiscoveryChannelConfig {
                    module_type: *module_type,
                    channel: module_type.default_discovery_channel(),
                })
                .collect(),
            logger_sink: "Logger_Queue".to_string(),
            monitor_topic: "Monitor_Topic".to_string(),
            inbox_suffix: "_Inbox".to_string(),
            gateway_topic_prefix: "Gateway_Topic_".to_string(),
            gateway_queue_prefix: "Gateway_Queue_".to_string(),
            tutor_topic_prefix: "Tutor_Topic_".to_string(),
            domain_topic_prefix: "Domain_Topic_".to_string(),
        }
    }
}

impl ChannelNaming {
    /// Outbox for an inbox: the inbox with the reserved suffix stripped. An
    /// inbox without the suffix is its own base name.
    pub fn outbox_for<'a>(&self, inbox: &'a str) -> &'a str {
        inbox.strip_suffix(self.inbox_suffix.as_str()).unwrap_or(inbox)
    }

    /// Name of the queue-flavoured variant of a gateway topic, used to find
    /// advisory channels that embed the queue name instead of the topic name.
    pub fn gateway_queue_variant(&self, gateway_topic: &str) -> String {
        gateway_topic.replace(
            self.gateway_topic_prefix.as_str(),
            self.gateway_queue_prefix.as_str(),
        )
    }

    /// Whether `topic` is named like a domain module's log-playback topic.
    pub fn is_domain_topic(&self, topic: &str) -> bool {
        topic.starts_with(self.domain_topic_prefix.as_str())
    }

    /// Session identifier of a tutor session topic. Channels created for the
    /// session embed the bare identifier, so removal searches for it. A topic
    /// without the prefix is its own identifier.
    pub fn tutor_session_id<'a>(&self, topic: &'a str) -> &'a str {
        match topic.strip_prefix(self.tutor_topic_prefix.as_str()) {
            Some(session_id) if !session_id.is_empty() => session_id,
            _ => topic,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LivenessConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub max_removal_attempts: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            timeout_ms: 60_000,
            max_removal_attempts: 1,
        }
    }
}

impl LivenessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(json5::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "unable to read router config: {err}"),
            ConfigError::Parse(err) => write!(f, "unable to parse router config: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid router config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl RouterConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = json5::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json5_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_queue_size must be non-zero".to_string(),
            ));
        }

        let channels = &self.channels;
        for (field, value) in [
            ("logger_sink", &channels.logger_sink),
            ("monitor_topic", &channels.monitor_topic),
            ("inbox_suffix", &channels.inbox_suffix),
            ("gateway_topic_prefix", &channels.gateway_topic_prefix),
            ("gateway_queue_prefix", &channels.gateway_queue_prefix),
            ("tutor_topic_prefix", &channels.tutor_topic_prefix),
            ("domain_topic_prefix", &channels.domain_topic_prefix),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        let mut seen = HashSet::new();
        for discovery in &channels.discovery {
            if discovery.channel.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "discovery channel for {} must not be empty",
                    discovery.module_type
                )));
            }
            if !seen.insert(discovery.channel.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate discovery channel '{}'",
                    discovery.channel
                )));
            }
        }

        let liveness = &self.liveness;
        if liveness.poll_interval_ms == 0 || liveness.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "liveness poll interval and timeout must be non-zero".to_string(),
            ));
        }
        if liveness.poll_interval_ms > liveness.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "liveness poll interval ({} ms) exceeds timeout ({} ms)",
                liveness.poll_interval_ms, liveness.timeout_ms
            )));
        }
        if liveness.max_removal_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_removal_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RouterConfig};
    use crate::status::module_status::ModuleType;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RouterConfig::from_json5_str("{}").expect("empty config is valid");

        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.liveness.timeout_ms, 60_000);
        assert_eq!(config.liveness.poll_interval_ms, 5_000);
        assert_eq!(config.channels.discovery.len(), ModuleType::ALL.len());
    }

    #[test]
    fn json5_overrides_are_applied() {
        let config = RouterConfig::from_json5_str(
            r#"{
                // faster checks for a lab deployment
                liveness: { poll_interval_ms: 500, timeout_ms: 2000 },
                channels: {
                    logger_sink: "Audit_Queue",
                    discovery: [{ module_type: "Gateway", channel: "GW_Discovery" }],
                },
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.liveness.poll_interval_ms, 500);
        assert_eq!(config.liveness.max_removal_attempts, 1);
        assert_eq!(config.channels.logger_sink, "Audit_Queue");
        assert_eq!(config.channels.monitor_topic, "Monitor_Topic");
        assert_eq!(config.channels.discovery.len(), 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RouterConfig::from_json5_str("{ jmx_url: 'localhost:7020' }")
            .expect_err("unknown field");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn poll_interval_larger_than_timeout_is_invalid() {
        let err = RouterConfig::from_json5_str(
            "{ liveness: { poll_interval_ms: 10000, timeout_ms: 5000 } }",
        )
        .expect_err("poll interval above timeout");

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_discovery_channels_are_invalid() {
        let err = RouterConfig::from_json5_str(
            r#"{ channels: { discovery: [
                { module_type: "Sensor", channel: "Shared" },
                { module_type: "Learner", channel: "Shared" },
            ] } }"#,
        )
        .expect_err("duplicate channel");

        assert!(err.to_string().contains("duplicate discovery channel"));
    }

    #[test]
    fn outbox_strips_inbox_suffix_only_once_and_only_at_the_end() {
        let naming = RouterConfig::default().channels;

        assert_eq!(naming.outbox_for("Gateway_Queue_abc_Inbox"), "Gateway_Queue_abc");
        assert_eq!(naming.outbox_for("_Inbox_Queue"), "_Inbox_Queue");
        assert_eq!(
            naming.gateway_queue_variant("Gateway_Topic_abc"),
            "Gateway_Queue_abc"
        );
    }

    #[test]
    fn domain_topics_are_recognised_by_prefix() {
        let naming =
            RouterConfig::from_json5_str("{ channels: { domain_topic_prefix: 'Playback_' } }")
                .expect("config should parse")
                .channels;

        assert!(naming.is_domain_topic("Playback_7"));
        assert!(!naming.is_domain_topic("Domain_Topic_7"));
        assert!(!naming.is_domain_topic("Lab_Playback_7"));
    }

    #[test]
    fn tutor_session_id_strips_the_topic_prefix() {
        let naming = RouterConfig::default().channels;

        assert_eq!(naming.tutor_session_id("Tutor_Topic_5f2a"), "5f2a");
        assert_eq!(naming.tutor_session_id("Tutor_Topic_"), "Tutor_Topic_");
        assert_eq!(naming.tutor_session_id("Session_5f2a"), "Session_5f2a");
    }
}
