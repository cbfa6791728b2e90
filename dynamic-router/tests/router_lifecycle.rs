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

mod support;

use dynamic_router::{ModuleType, RouterConfig, RouterError};
use integration_test_utils::{
    heartbeat_message, InMemoryBroker, DOMAIN_DISCOVERY, GATEWAY_DISCOVERY, SENSOR_DISCOVERY,
    TUTOR_DISCOVERY,
};
use support::{make_router, start_router};

#[tokio::test(flavor = "multi_thread")]
async fn start_subscribes_to_every_discovery_channel() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new("broker");
    let router = start_router("lifecycle", &broker).await;

    for module_type in ModuleType::ALL {
        assert_eq!(
            broker.subscriber_count(&module_type.default_discovery_channel()),
            1,
            "{module_type} discovery channel should be subscribed"
        );
    }
    assert!(matches!(
        router.start().await,
        Err(RouterError::AlreadyStarted)
    ));

    router.shutdown().await;
    for module_type in ModuleType::ALL {
        assert_eq!(
            broker.subscriber_count(&module_type.default_discovery_channel()),
            0
        );
    }
    assert_eq!(
        broker
            .deliver(
                SENSOR_DISCOVERY,
                heartbeat_message(ModuleType::Sensor, "Sensor_Queue_1_Inbox", 0),
            )
            .await,
        0
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_subscription_rolls_back_earlier_subscriptions() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new("broker");
    broker.fail_subscription(DOMAIN_DISCOVERY);
    let router = make_router("rollback", &broker, RouterConfig::default());

    match router.start().await {
        Err(RouterError::Subscribe { channel, .. }) => assert_eq!(channel, DOMAIN_DISCOVERY),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => panic!("start should fail"),
    }
    assert_eq!(broker.subscriber_count(GATEWAY_DISCOVERY), 0);
    assert_eq!(broker.subscriber_count(TUTOR_DISCOVERY), 0);

    // the router is not marked started, so a second attempt reaches the broker again
    assert!(matches!(
        router.start().await,
        Err(RouterError::Subscribe { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_discovery_channels_come_from_config() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new("broker");
    let config = RouterConfig::from_json5_str(
        r#"{
            channels: {
                discovery: [
                    { module_type: "Sensor", channel: "Lab_Sensor_Discovery" },
                ],
            },
        }"#,
    )
    .expect("config should parse");
    let router = make_router("custom-channels", &broker, config);
    router.start().await.expect("router should start");

    assert_eq!(broker.subscriber_count("Lab_Sensor_Discovery"), 1);
    assert_eq!(broker.subscriber_count(SENSOR_DISCOVERY), 0);

    broker
        .deliver(
            "Lab_Sensor_Discovery",
            heartbeat_message(ModuleType::Sensor, "Sensor_Queue_1_Inbox", 0),
        )
        .await;
    router.flush_dispatch().await;
    assert_eq!(broker.route_ids(), vec!["Sensor_Queue_1_Inbox"]);

    router.shutdown().await;
}

#[test]
fn invalid_config_is_rejected_before_anything_runs() {
    let broker = InMemoryBroker::new("broker");
    let config = RouterConfig {
        dispatch_queue_size: 0,
        ..RouterConfig::default()
    };

    let result = dynamic_router::DynamicRouter::new(
        "invalid",
        config,
        std::sync::Arc::new(broker.clone()),
        std::sync::Arc::new(broker),
    );
    assert!(matches!(result, Err(RouterError::Config(_))));
}
