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

use dynamic_router::{ModuleStatus, ModuleType, RawMessage, StatusCodec};

pub const GATEWAY_DISCOVERY: &str = "Gateway_Discovery_Topic";
pub const TUTOR_DISCOVERY: &str = "Tutor_Discovery_Topic";
pub const DOMAIN_DISCOVERY: &str = "Domain_Discovery_Topic";
pub const SENSOR_DISCOVERY: &str = "Sensor_Discovery_Topic";

fn encode(status: &ModuleStatus, sent_timestamp_ms: u64) -> RawMessage {
    StatusCodec::encode(status, sent_timestamp_ms).expect("status should encode")
}

pub fn heartbeat_message(
    module_type: ModuleType,
    inbox: &str,
    sent_timestamp_ms: u64,
) -> RawMessage {
    let module_name = module_type.as_str().to_lowercase();
    encode(
        &ModuleStatus::heartbeat(module_type, module_name, inbox),
        sent_timestamp_ms,
    )
}

pub fn gateway_message(inbox: &str, topic: &str, sent_timestamp_ms: u64) -> RawMessage {
    encode(
        &ModuleStatus::gateway("gateway", inbox, topic),
        sent_timestamp_ms,
    )
}

pub fn tutor_session_message(inbox: &str, topic: &str, sent_timestamp_ms: u64) -> RawMessage {
    encode(
        &ModuleStatus::tutor_session("tutor", inbox, topic),
        sent_timestamp_ms,
    )
}

pub fn domain_message(inbox: &str, topics: &[&str], sent_timestamp_ms: u64) -> RawMessage {
    encode(
        &ModuleStatus::domain("domain", inbox, topics.iter().copied()),
        sent_timestamp_ms,
    )
}
