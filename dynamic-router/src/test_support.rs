//! In-crate broker doubles shared by unit tests.

use crate::broker::{
    AdminSession, Broker, BrokerAdmin, BrokerError, ChannelKind, ChannelRef, DiscoveryListener,
    RawMessage, RouteDefinition,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct RecordingBroker {
    installs: AtomicUsize,
    starts: AtomicUsize,
    fail_installs: AtomicBool,
    fail_starts: AtomicBool,
    routes: Mutex<Vec<RouteDefinition>>,
}

impl RecordingBroker {
    pub(crate) fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub(crate) fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_installs(&self, fail: bool) {
        self.fail_installs.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_starts(&self, fail: bool) {
        self.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn installed_route_ids(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .map(|route| route.route_id.clone())
            .collect()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn subscribe(
        &self,
        _channel: &ChannelRef,
        _listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn unsubscribe(
        &self,
        _channel: &ChannelRef,
        _listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn publish(&self, _channel: &ChannelRef, _message: RawMessage) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn install_route(&self, route: &RouteDefinition) -> Result<(), BrokerError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        // yield so concurrent callers get a chance to interleave
        tokio::task::yield_now().await;
        if self.fail_installs.load(Ordering::SeqCst) {
            return Err(BrokerError::Rejected(format!(
                "install of {} refused",
                route.route_id
            )));
        }
        self.routes.lock().unwrap().push(route.clone());
        Ok(())
    }

    async fn start_route(&self, route_id: &str) -> Result<(), BrokerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_starts.load(Ordering::SeqCst) {
            return Err(BrokerError::Rejected(format!("start of {route_id} refused")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct AdminState {
    pub(crate) routes: Mutex<BTreeSet<String>>,
    pub(crate) queues: Mutex<BTreeSet<String>>,
    pub(crate) topics: Mutex<BTreeSet<String>>,
    pub(crate) stopped_routes: Mutex<Vec<String>>,
    pub(crate) failing_items: Mutex<HashSet<String>>,
    pub(crate) fail_connect: AtomicBool,
    pub(crate) connects: AtomicUsize,
    pub(crate) closes: AtomicUsize,
    pub(crate) removal_delay: Mutex<Option<Duration>>,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingAdmin {
    pub(crate) state: Arc<AdminState>,
}

impl RecordingAdmin {
    pub(crate) fn with_routes(self, routes: &[&str]) -> Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .extend(routes.iter().map(|route| route.to_string()));
        self
    }

    pub(crate) fn with_queues(self, queues: &[&str]) -> Self {
        self.state
            .queues
            .lock()
            .unwrap()
            .extend(queues.iter().map(|queue| queue.to_string()));
        self
    }

    pub(crate) fn with_topics(self, topics: &[&str]) -> Self {
        self.state
            .topics
            .lock()
            .unwrap()
            .extend(topics.iter().map(|topic| topic.to_string()));
        self
    }

    pub(crate) fn fail_item(&self, name: &str) {
        self.state
            .failing_items
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub(crate) fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn slow_removals(&self, delay: Duration) {
        *self.state.removal_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn routes(&self) -> BTreeSet<String> {
        self.state.routes.lock().unwrap().clone()
    }

    pub(crate) fn queues(&self) -> BTreeSet<String> {
        self.state.queues.lock().unwrap().clone()
    }

    pub(crate) fn topics(&self) -> BTreeSet<String> {
        self.state.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerAdmin for RecordingAdmin {
    async fn connect(&self) -> Result<Box<dyn AdminSession>, BrokerError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("management port closed".to_string()));
        }
        Ok(Box::new(RecordingSession {
            state: self.state.clone(),
        }))
    }
}

struct RecordingSession {
    state: Arc<AdminState>,
}

impl RecordingSession {
    fn channels(&self, kind: ChannelKind) -> &Mutex<BTreeSet<String>> {
        match kind {
            ChannelKind::Queue => &self.state.queues,
            ChannelKind::Topic => &self.state.topics,
        }
    }

    fn check_failing(&self, name: &str) -> Result<(), BrokerError> {
        if self.state.failing_items.lock().unwrap().contains(name) {
            return Err(BrokerError::Rejected(format!("{name} is in use")));
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        let delay = *self.state.removal_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AdminSession for RecordingSession {
    async fn list_routes(&self, filter: &str) -> Result<Vec<String>, BrokerError> {
        Ok(self
            .state
            .routes
            .lock()
            .unwrap()
            .iter()
            .filter(|route| route.contains(filter))
            .cloned()
            .collect())
    }

    async fn stop_route(&self, route_id: &str) -> Result<(), BrokerError> {
        self.check_failing(route_id)?;
        self.state
            .stopped_routes
            .lock()
            .unwrap()
            .push(route_id.to_string());
        Ok(())
    }

    async fn remove_route(&self, route_id: &str) -> Result<(), BrokerError> {
        self.maybe_delay().await;
        self.check_failing(route_id)?;
        if self.state.routes.lock().unwrap().remove(route_id) {
            Ok(())
        } else {
            Err(BrokerError::NotFound(route_id.to_string()))
        }
    }

    async fn list_channels(
        &self,
        kind: ChannelKind,
        filter: &str,
    ) -> Result<Vec<String>, BrokerError> {
        Ok(self
            .channels(kind)
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.contains(filter))
            .cloned()
            .collect())
    }

    async fn remove_channel(&self, kind: ChannelKind, name: &str) -> Result<(), BrokerError> {
        self.maybe_delay().await;
        self.check_failing(name)?;
        if self.channels(kind).lock().unwrap().remove(name) {
            Ok(())
        } else {
            Err(BrokerError::NotFound(name.to_string()))
        }
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
