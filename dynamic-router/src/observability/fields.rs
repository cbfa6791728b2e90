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

//! Canonical structured field keys and value-format helpers.

use crate::broker::ChannelRef;
use crate::status::module_status::ModuleStatus;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const ROUTER: &str = "router";
pub const CHANNEL: &str = "channel";
pub const ROUTE_ID: &str = "route_id";
pub const STATUS_KEY: &str = "status_key";
pub const MODULE_TYPE: &str = "module_type";
pub const MODULE_NAME: &str = "module_name";
pub const TOPIC: &str = "topic";
pub const NEEDLE: &str = "needle";
pub const ATTEMPT: &str = "attempt";
pub const ELAPSED_MS: &str = "elapsed_ms";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_SUPERSEDED: &str = "superseded_by_new_report";
pub const REASON_ALREADY_INSTALLED: &str = "already_installed";

/// Compact destination list for route log lines, e.g. `queue:A,topic:B`.
pub fn format_destinations(destinations: &[ChannelRef]) -> String {
    if destinations.is_empty() {
        return NONE.to_string();
    }
    destinations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn format_broadcast_topic(status: &ModuleStatus) -> String {
    status
        .broadcast_topic()
        .map(str::to_string)
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_topics<'a, I>(topics: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let joined = topics
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        NONE.to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::{format_broadcast_topic, format_destinations, format_topics, NONE};
    use crate::broker::ChannelRef;
    use crate::status::module_status::{ModuleStatus, ModuleType};

    #[test]
    fn format_destinations_joins_kind_qualified_names() {
        let destinations = [ChannelRef::queue("Out"), ChannelRef::topic("Monitor_Topic")];

        assert_eq!(
            format_destinations(&destinations),
            "queue:Out,topic:Monitor_Topic"
        );
        assert_eq!(format_destinations(&[]), NONE);
    }

    #[test]
    fn format_broadcast_topic_falls_back_when_absent() {
        let heartbeat = ModuleStatus::heartbeat(ModuleType::Sensor, "s", "Sensor_Queue_Inbox");
        let gateway = ModuleStatus::gateway("g", "Gateway_Queue_a_Inbox", "Gateway_Topic_a");

        assert_eq!(format_broadcast_topic(&heartbeat), NONE);
        assert_eq!(format_broadcast_topic(&gateway), "Gateway_Topic_a");
    }

    #[test]
    fn format_topics_is_none_for_empty_sets() {
        let empty: Vec<String> = Vec::new();
        let topics = vec!["A".to_string(), "B".to_string()];

        assert_eq!(format_topics(&empty), NONE);
        assert_eq!(format_topics(&topics), "A,B");
    }
}
