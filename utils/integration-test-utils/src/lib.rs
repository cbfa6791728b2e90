/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

mod in_memory_broker;
pub use in_memory_broker::InMemoryBroker;
mod status_messages;
pub use status_messages::{
    domain_message, gateway_message, heartbeat_message, tutor_session_message, DOMAIN_DISCOVERY,
    GATEWAY_DISCOVERY, SENSOR_DISCOVERY, TUTOR_DISCOVERY,
};

/// Installs a `tracing` subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
