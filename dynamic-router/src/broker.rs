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

//! Capability contract the router needs from the underlying message broker.
//!
//! The router never speaks a broker wire protocol itself. It subscribes to
//! discovery channels through [`Broker`], declares routes through
//! [`Broker::install_route`], and tears things down through an
//! [`AdminSession`] opened by [`BrokerAdmin`].

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Whether a channel is point-to-point or fan-out.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum ChannelKind {
    Queue,
    Topic,
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Queue => write!(f, "queue"),
            ChannelKind::Topic => write!(f, "topic"),
        }
    }
}

/// A named broker channel together with its kind.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct ChannelRef {
    pub kind: ChannelKind,
    pub name: String,
}

impl ChannelRef {
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Queue,
            name: name.into(),
        }
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Topic,
            name: name.into(),
        }
    }
}

impl Display for ChannelRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A standing forwarding rule: everything arriving on `source` is multicast to
/// every entry of `destinations`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteDefinition {
    pub route_id: String,
    pub source: ChannelRef,
    pub destinations: Vec<ChannelRef>,
}

/// Body of a message as delivered by the broker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageBody {
    Text(String),
    Bytes(Vec<u8>),
}

/// An opaque message received from (or published to) a broker channel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMessage {
    pub body: MessageBody,
}

impl RawMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: MessageBody::Text(body.into()),
        }
    }

    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: MessageBody::Bytes(body.into()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.body {
            MessageBody::Text(text) => text.as_bytes(),
            MessageBody::Bytes(bytes) => bytes,
        }
    }
}

/// Failure reported by a broker collaborator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BrokerError {
    /// The broker (or its management interface) could not be reached.
    Unavailable(String),
    /// The broker refused the operation.
    Rejected(String),
    /// The named route or channel does not exist.
    NotFound(String),
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::Unavailable(reason) => write!(f, "broker unavailable: {reason}"),
            BrokerError::Rejected(reason) => write!(f, "broker rejected operation: {reason}"),
            BrokerError::NotFound(name) => write!(f, "not found on broker: {name}"),
        }
    }
}

impl Error for BrokerError {}

/// Receives raw messages delivered on a subscribed channel.
#[async_trait]
pub trait DiscoveryListener: Send + Sync {
    async fn on_receive(&self, channel: &str, message: RawMessage);
}

/// Data-path and declarative-route capabilities of the broker.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn subscribe(
        &self,
        channel: &ChannelRef,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError>;

    async fn unsubscribe(
        &self,
        channel: &ChannelRef,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError>;

    async fn publish(&self, channel: &ChannelRef, message: RawMessage) -> Result<(), BrokerError>;

    async fn install_route(&self, route: &RouteDefinition) -> Result<(), BrokerError>;

    /// Starts an installed route. Brokers whose routes run as soon as they are
    /// installed keep the default.
    async fn start_route(&self, _route_id: &str) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// Opens administrative sessions against the broker's management interface.
#[async_trait]
pub trait BrokerAdmin: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn AdminSession>, BrokerError>;
}

/// One administrative connection. Closing may block on the network and is
/// therefore always driven off the caller's path.
#[async_trait]
pub trait AdminSession: Send + Sync {
    /// Route ids whose name contains `filter`.
    async fn list_routes(&self, filter: &str) -> Result<Vec<String>, BrokerError>;

    async fn stop_route(&self, route_id: &str) -> Result<(), BrokerError>;

    async fn remove_route(&self, route_id: &str) -> Result<(), BrokerError>;

    /// Channel names of `kind` whose identifying property contains `filter`.
    async fn list_channels(&self, kind: ChannelKind, filter: &str)
        -> Result<Vec<String>, BrokerError>;

    async fn remove_channel(&self, kind: ChannelKind, name: &str) -> Result<(), BrokerError>;

    async fn close(self: Box<Self>) -> Result<(), BrokerError>;
}
