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

use async_trait::async_trait;
use dynamic_router::{
    AdminSession, Broker, BrokerAdmin, BrokerError, ChannelKind, ChannelRef, DiscoveryListener,
    RawMessage, RouteDefinition,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Default)]
struct BrokerState {
    subscribers: Mutex<Vec<(ChannelRef, Arc<dyn DiscoveryListener>)>>,
    routes: Mutex<BTreeMap<String, RouteDefinition>>,
    started_routes: Mutex<BTreeSet<String>>,
    queues: Mutex<BTreeSet<String>>,
    topics: Mutex<BTreeSet<String>>,
    published: Mutex<Vec<(ChannelRef, RawMessage)>>,
    install_count: AtomicUsize,
    connect_count: AtomicUsize,
    close_count: AtomicUsize,
    fail_installs: AtomicBool,
    fail_starts: AtomicBool,
    fail_connect: AtomicBool,
    failing_subscriptions: Mutex<HashSet<String>>,
    failing_items: Mutex<HashSet<String>>,
    removal_delay: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A broker living entirely in memory, used as both the data-path broker and
/// its management interface.
///
/// Installing a route declares its source and destination channels, the way a
/// real broker creates destinations on first use. A second route with an id
/// that is already installed is rejected. Failures can be injected per
/// operation.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    name: Arc<String>,
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::new(name.to_string()),
            state: Arc::default(),
        }
    }

    /// Delivers `message` to every listener subscribed to `channel`, awaiting
    /// each in turn.
    pub async fn deliver(&self, channel: &str, message: RawMessage) -> usize {
        let listeners: Vec<Arc<dyn DiscoveryListener>> = lock(&self.state.subscribers)
            .iter()
            .filter(|(subscribed, _)| subscribed.name == channel)
            .map(|(_, listener)| listener.clone())
            .collect();

        debug!(
            "{}: delivering to {} listener(s) on {channel}",
            self.name,
            listeners.len()
        );
        for listener in &listeners {
            listener.on_receive(channel, message.clone()).await;
        }
        listeners.len()
    }

    pub fn declare_queue(&self, name: &str) {
        lock(&self.state.queues).insert(name.to_string());
    }

    pub fn declare_topic(&self, name: &str) {
        lock(&self.state.topics).insert(name.to_string());
    }

    pub fn fail_installs(&self, fail: bool) {
        self.state.fail_installs.store(fail, Ordering::SeqCst);
    }

    /// Installed routes refuse to start; they stay installed and stopped.
    pub fn fail_starts(&self, fail: bool) {
        self.state.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscription(&self, channel: &str) {
        lock(&self.state.failing_subscriptions).insert(channel.to_string());
    }

    /// Every admin operation naming `item` fails with `Rejected`.
    pub fn fail_item(&self, item: &str) {
        lock(&self.state.failing_items).insert(item.to_string());
    }

    /// Route and channel removals sleep for `delay` before completing.
    pub fn slow_removals(&self, delay: Duration) {
        *lock(&self.state.removal_delay) = Some(delay);
    }

    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.close_count.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        lock(&self.state.subscribers)
            .iter()
            .filter(|(subscribed, _)| subscribed.name == channel)
            .count()
    }

    pub fn route(&self, route_id: &str) -> Option<RouteDefinition> {
        lock(&self.state.routes).get(route_id).cloned()
    }

    pub fn route_ids(&self) -> Vec<String> {
        lock(&self.state.routes).keys().cloned().collect()
    }

    pub fn is_started(&self, route_id: &str) -> bool {
        lock(&self.state.started_routes).contains(route_id)
    }

    pub fn queues(&self) -> BTreeSet<String> {
        lock(&self.state.queues).clone()
    }

    pub fn topics(&self) -> BTreeSet<String> {
        lock(&self.state.topics).clone()
    }

    pub fn published(&self) -> Vec<(ChannelRef, RawMessage)> {
        lock(&self.state.published).clone()
    }

    fn declare(&self, channel: &ChannelRef) {
        match channel.kind {
            ChannelKind::Queue => self.declare_queue(&channel.name),
            ChannelKind::Topic => self.declare_topic(&channel.name),
        }
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn subscribe(
        &self,
        channel: &ChannelRef,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError> {
        if lock(&self.state.failing_subscriptions).contains(&channel.name) {
            return Err(BrokerError::Rejected(format!(
                "subscription to {channel} refused"
            )));
        }
        lock(&self.state.subscribers).push((channel.clone(), listener));
        Ok(())
    }

    async fn unsubscribe(
        &self,
        channel: &ChannelRef,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError> {
        let mut subscribers = lock(&self.state.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(subscribed, registered)| {
            !(subscribed == channel && Arc::ptr_eq(registered, &listener))
        });
        if subscribers.len() == before {
            return Err(BrokerError::NotFound(channel.to_string()));
        }
        Ok(())
    }

    async fn publish(&self, channel: &ChannelRef, message: RawMessage) -> Result<(), BrokerError> {
        lock(&self.state.published).push((channel.clone(), message));
        Ok(())
    }

    async fn install_route(&self, route: &RouteDefinition) -> Result<(), BrokerError> {
        // let concurrent callers interleave the way a networked broker would
        tokio::task::yield_now().await;
        self.state.install_count.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_installs.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable(format!(
                "{}: route installation disabled",
                self.name
            )));
        }

        let mut routes = lock(&self.state.routes);
        if routes.contains_key(&route.route_id) {
            return Err(BrokerError::Rejected(format!(
                "{}: route {} already exists",
                self.name, route.route_id
            )));
        }
        routes.insert(route.route_id.clone(), route.clone());
        drop(routes);

        self.declare(&route.source);
        for destination in &route.destinations {
            self.declare(destination);
        }
        Ok(())
    }

    async fn start_route(&self, route_id: &str) -> Result<(), BrokerError> {
        if self.state.fail_starts.load(Ordering::SeqCst) {
            return Err(BrokerError::Rejected(format!(
                "{}: route {route_id} failed to start",
                self.name
            )));
        }
        if !lock(&self.state.routes).contains_key(route_id) {
            return Err(BrokerError::NotFound(route_id.to_string()));
        }
        lock(&self.state.started_routes).insert(route_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl BrokerAdmin for InMemoryBroker {
    async fn connect(&self) -> Result<Box<dyn AdminSession>, BrokerError> {
        self.state.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable(format!(
                "{}: management interface unreachable",
                self.name
            )));
        }
        Ok(Box::new(InMemorySession {
            state: self.state.clone(),
        }))
    }
}

struct InMemorySession {
    state: Arc<BrokerState>,
}

impl InMemorySession {
    async fn before_removal(&self, item: &str) -> Result<(), BrokerError> {
        let delay = *lock(&self.state.removal_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_item(item)
    }

    fn check_item(&self, item: &str) -> Result<(), BrokerError> {
        if lock(&self.state.failing_items).contains(item) {
            return Err(BrokerError::Rejected(format!("{item} is locked")));
        }
        Ok(())
    }

    fn channels(&self, kind: ChannelKind) -> &Mutex<BTreeSet<String>> {
        match kind {
            ChannelKind::Queue => &self.state.queues,
            ChannelKind::Topic => &self.state.topics,
        }
    }
}

#[async_trait]
impl AdminSession for InMemorySession {
    async fn list_routes(&self, filter: &str) -> Result<Vec<String>, BrokerError> {
        Ok(lock(&self.state.routes)
            .keys()
            .filter(|route_id| route_id.contains(filter))
            .cloned()
            .collect())
    }

    async fn stop_route(&self, route_id: &str) -> Result<(), BrokerError> {
        self.check_item(route_id)?;
        lock(&self.state.started_routes).remove(route_id);
        Ok(())
    }

    async fn remove_route(&self, route_id: &str) -> Result<(), BrokerError> {
        self.before_removal(route_id).await?;
        match lock(&self.state.routes).remove(route_id) {
            Some(_) => Ok(()),
            None => Err(BrokerError::NotFound(route_id.to_string())),
        }
    }

    async fn list_channels(
        &self,
        kind: ChannelKind,
        filter: &str,
    ) -> Result<Vec<String>, BrokerError> {
        Ok(lock(self.channels(kind))
            .iter()
            .filter(|name| name.contains(filter))
            .cloned()
            .collect())
    }

    async fn remove_channel(&self, kind: ChannelKind, name: &str) -> Result<(), BrokerError> {
        self.before_removal(name).await?;
        if lock(self.channels(kind)).remove(name) {
            Ok(())
        } else {
            Err(BrokerError::NotFound(name.to_string()))
        }
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
