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

//! # dynamic-router
//!
//! `dynamic-router` watches the discovery channels on which modules announce
//! themselves, installs a fan-out route on the broker for each module it sees,
//! and tears those routes and channels down again once a module stops
//! reporting.
//!
//! The broker is reached only through the traits in [`broker`], so the router
//! runs on top of any pub/sub broker that can install routes and offers an
//! administrative interface for removing routes and channels.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dynamic_router::{
//!     AdminSession, Broker, BrokerAdmin, BrokerError, ChannelRef,
//!     DiscoveryListener, DynamicRouter, ModuleStatus, ModuleType, RawMessage,
//!     RouteDefinition, RouterConfig, StatusCodec,
//! };
//!
//! # struct NoopBroker;
//! #
//! # #[async_trait]
//! # impl Broker for NoopBroker {
//! #     async fn subscribe(
//! #         &self,
//! #         _channel: &ChannelRef,
//! #         _listener: Arc<dyn DiscoveryListener>,
//! #     ) -> Result<(), BrokerError> {
//! #         Ok(())
//! #     }
//! #     async fn unsubscribe(
//! #         &self,
//! #         _channel: &ChannelRef,
//! #         _listener: Arc<dyn DiscoveryListener>,
//! #     ) -> Result<(), BrokerError> {
//! #         Ok(())
//! #     }
//! #     async fn publish(&self, _channel: &ChannelRef, _message: RawMessage) -> Result<(), BrokerError> {
//! #         Ok(())
//! #     }
//! #     async fn install_route(&self, _route: &RouteDefinition) -> Result<(), BrokerError> {
//! #         Ok(())
//! #     }
//! # }
//! #
//! # struct NoopAdmin;
//! #
//! # #[async_trait]
//! # impl BrokerAdmin for NoopAdmin {
//! #     async fn connect(&self) -> Result<Box<dyn AdminSession>, BrokerError> {
//! #         Err(BrokerError::Unavailable("not needed for this doctest".to_string()))
//! #     }
//! # }
//! #
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let router = DynamicRouter::new(
//!     "quick-start",
//!     RouterConfig::default(),
//!     Arc::new(NoopBroker),
//!     Arc::new(NoopAdmin),
//! )
//! .unwrap();
//! router.start().await.unwrap();
//!
//! let heartbeat = ModuleStatus::heartbeat(ModuleType::Sensor, "sensor", "Sensor_Queue_1_Inbox");
//! let message = StatusCodec::encode(&heartbeat, 0).unwrap();
//! router
//!     .handle_discovery_message("Sensor_Discovery_Topic", message)
//!     .await
//!     .unwrap();
//! router.flush_dispatch().await;
//!
//! assert_eq!(router.installed_routes().await[0].outbox_channel, "Sensor_Queue_1");
//! router.shutdown().await;
//! # });
//! ```
//!
//! ## Layers
//!
//! - `status`: typed module statuses, status keys, and the discovery codec.
//! - `control_plane`: idempotent inbox and topic route installation.
//! - `liveness`: one record and one periodic check per status key.
//! - `reaper`: substring-based removal of broker routes and channels.
//! - `data_plane`: discovery listeners and the dispatch worker between them
//!   and the control plane.
//!
//! ## Observability
//!
//! Every log line is a `tracing` event carrying `event` and `component` fields;
//! the event names are listed in [`observability::events`]. The library never
//! installs a subscriber.

pub mod broker;
pub mod config;
mod control_plane;
mod data_plane;
mod dynamic_router;
mod liveness;
pub mod observability;
mod reaper;
mod status;

#[cfg(test)]
mod test_support;

pub use broker::{
    AdminSession, Broker, BrokerAdmin, BrokerError, ChannelKind, ChannelRef, DiscoveryListener,
    MessageBody, RawMessage, RouteDefinition,
};
pub use config::{ChannelNaming, ConfigError, DiscoveryChannelConfig, LivenessConfig, RouterConfig};
pub use control_plane::route_installer::{EnsureOutcome, RouteInstallError};
pub use control_plane::route_table::RouteRecord;
pub use dynamic_router::{DynamicRouter, RouterError};
pub use liveness::monitor::ReportOutcome;
pub use liveness::record::LivenessRecord;
pub use reaper::report::{ItemRemovalError, RemovalError, RemovalItem, RemovalReport};
pub use status::codec::{DecodeError, DecodedStatus, StatusCodec, WireMessageType};
pub use status::module_status::{ModuleStatus, ModuleType, StatusKey, StatusKind};
