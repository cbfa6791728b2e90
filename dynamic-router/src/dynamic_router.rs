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

//! Composition root of the router.
//!
//! [`DynamicRouter`] wires the discovery listeners, the dispatch worker, the
//! liveness monitor and the reaper together. Statuses flow from the broker's
//! delivery path into a bounded dispatch queue; route installation and the
//! removal of dropped domain topics happen on the single dispatch worker.
//! Timeouts are handled by `ModuleRemoval`, which reaps the module on the
//! broker before it forgets the router's own records of it.

use crate::broker::{Broker, BrokerAdmin, BrokerError, ChannelRef, DiscoveryListener, RawMessage};
use crate::config::{ChannelNaming, ConfigError, RouterConfig};
use crate::control_plane::domain_topics::DomainTopicTracker;
use crate::control_plane::route_installer::RouteInstaller;
use crate::control_plane::route_table::RouteRecord;
use crate::control_plane::topic_installer::TopicRouteInstaller;
use crate::data_plane::discovery_listener::{DiscoveryChannelListener, DiscoveryIngress};
use crate::data_plane::dispatch_worker::{spawn_dispatch_worker, DispatchCommand, StatusDispatcher};
use crate::liveness::monitor::{LivenessMonitor, ReportOutcome, TimeoutHandler};
use crate::liveness::record::LivenessRecord;
use crate::observability::{events, fields};
use crate::reaper::channel_reaper::ChannelReaper;
use crate::reaper::report::RemovalError;
use crate::status::codec::{DecodeError, StatusCodec};
use crate::status::module_status::{ModuleStatus, StatusKey, StatusKind};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "dynamic_router";

/// Failures of router construction and lifecycle calls.
#[derive(Debug)]
pub enum RouterError {
    Config(ConfigError),
    Subscribe { channel: String, source: BrokerError },
    AlreadyStarted,
}

impl Display for RouterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::Config(err) => write!(f, "{err}"),
            RouterError::Subscribe { channel, source } => {
                write!(f, "unable to subscribe to discovery channel '{channel}': {source}")
            }
            RouterError::AlreadyStarted => write!(f, "router was already started"),
        }
    }
}

impl Error for RouterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RouterError::Config(err) => Some(err),
            RouterError::Subscribe { source, .. } => Some(source),
            RouterError::AlreadyStarted => None,
        }
    }
}

impl From<ConfigError> for RouterError {
    fn from(err: ConfigError) -> Self {
        RouterError::Config(err)
    }
}

/// Timeout handling: reap on the broker first, then forget the bookkeeping so
/// the module is installed afresh if it comes back.
struct ModuleRemoval {
    naming: ChannelNaming,
    reaper: Arc<ChannelReaper>,
    routes: Arc<RouteInstaller>,
    topics: Arc<TopicRouteInstaller>,
    domain_topics: Arc<DomainTopicTracker>,
}

#[async_trait]
impl TimeoutHandler for ModuleRemoval {
    async fn on_timeout(&self, status: &ModuleStatus) -> Result<(), RemovalError> {
        let key = status.status_key();
        let tracked_topics = self.domain_topics.topics_for(&key).await;

        // nothing changed on the broker when this fails, so the records stay
        self.reaper.remove_module(status, &tracked_topics).await?;

        let mut forgotten_topics = Vec::new();
        match &status.kind {
            StatusKind::Heartbeat => {
                self.routes.forget_route(&status.inbox_channel).await;
            }
            StatusKind::Gateway { topic } => {
                self.routes.forget_route(&status.inbox_channel).await;
                self.topics.forget_topic(topic).await;
                forgotten_topics.push(topic.clone());
            }
            StatusKind::TutorSession { topic } => {
                // the tutor's inbox route belongs to the tutor module itself
                self.topics.forget_topic(topic).await;
                forgotten_topics.push(topic.clone());
            }
            StatusKind::Domain {
                log_playback_topics,
            } => {
                self.routes.forget_route(&status.inbox_channel).await;
                for topic in tracked_topics
                    .union(log_playback_topics)
                    .filter(|topic| self.naming.is_domain_topic(topic))
                {
                    self.topics.forget_topic(topic).await;
                    forgotten_topics.push(topic.clone());
                }
                self.domain_topics.forget(&key).await;
            }
        }

        debug!(
            event = events::MODULE_REMOVAL_BOOKKEEPING,
            component = COMPONENT,
            status_key = %key,
            topics = %fields::format_topics(&forgotten_topics),
            "forgot route records of removed module"
        );
        Ok(())
    }
}

struct RouterLifecycle {
    pending_commands: Option<Receiver<DispatchCommand>>,
    worker: Option<JoinHandle<()>>,
    subscriptions: Vec<ChannelRef>,
}

/// Discovers modules on the configured discovery channels, installs their
/// routes on the broker, and removes everything belonging to a module once it
/// stops reporting.
///
/// Statuses are accepted through [`DynamicRouter::handle_discovery_message`]
/// as soon as the router is built; route installation begins with
/// [`DynamicRouter::start`].
pub struct DynamicRouter {
    name: String,
    broker: Arc<dyn Broker>,
    discovery_channels: Vec<ChannelRef>,
    listener: Arc<dyn DiscoveryListener>,
    ingress: Arc<DiscoveryIngress>,
    dispatcher: Arc<StatusDispatcher>,
    routes: Arc<RouteInstaller>,
    topics: Arc<TopicRouteInstaller>,
    liveness: LivenessMonitor,
    lifecycle: Mutex<RouterLifecycle>,
}

impl DynamicRouter {
    /// Builds a router. The configuration is validated here.
    pub fn new(
        name: &str,
        config: RouterConfig,
        broker: Arc<dyn Broker>,
        admin: Arc<dyn BrokerAdmin>,
    ) -> Result<Self, RouterError> {
        config.validate()?;

        let naming = config.channels.clone();
        let routes = Arc::new(RouteInstaller::new(
            broker.clone(),
            admin.clone(),
            naming.clone(),
        ));
        let topics = Arc::new(TopicRouteInstaller::new(
            broker.clone(),
            admin.clone(),
            naming.clone(),
        ));
        let domain_topics = Arc::new(DomainTopicTracker::new());
        let reaper = Arc::new(ChannelReaper::new(admin, naming.clone()));

        let removal = Arc::new(ModuleRemoval {
            naming: naming.clone(),
            reaper: reaper.clone(),
            routes: routes.clone(),
            topics: topics.clone(),
            domain_topics: domain_topics.clone(),
        });
        let liveness = LivenessMonitor::new(config.liveness.clone(), removal);

        let dispatcher = Arc::new(StatusDispatcher::new(
            naming.clone(),
            routes.clone(),
            topics.clone(),
            domain_topics,
            reaper,
        ));

        let codec = StatusCodec::new(
            naming
                .discovery
                .iter()
                .map(|discovery| (discovery.channel.clone(), discovery.module_type)),
        );
        let discovery_channels = naming
            .discovery
            .iter()
            .map(|discovery| ChannelRef::topic(discovery.channel.as_str()))
            .collect();

        let (sender, receiver) = mpsc::channel(config.dispatch_queue_size);
        let ingress = Arc::new(DiscoveryIngress::new(
            name,
            codec,
            liveness.clone(),
            sender,
        ));
        let listener: Arc<dyn DiscoveryListener> =
            Arc::new(DiscoveryChannelListener::new(ingress.clone()));

        Ok(Self {
            name: name.to_string(),
            broker,
            discovery_channels,
            listener,
            ingress,
            dispatcher,
            routes,
            topics,
            liveness,
            lifecycle: Mutex::new(RouterLifecycle {
                pending_commands: Some(receiver),
                worker: None,
                subscriptions: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes to every discovery channel and starts the dispatch worker.
    /// If any subscription fails, the ones already made are rolled back.
    pub async fn start(&self) -> Result<(), RouterError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(commands) = lifecycle.pending_commands.take() else {
            return Err(RouterError::AlreadyStarted);
        };

        let mut subscribed = Vec::with_capacity(self.discovery_channels.len());
        for channel in &self.discovery_channels {
            if let Err(source) = self.broker.subscribe(channel, self.listener.clone()).await {
                error!(
                    event = events::DISCOVERY_SUBSCRIBE_FAILED,
                    component = COMPONENT,
                    router = self.name.as_str(),
                    channel = %channel,
                    err = %source,
                    "unable to subscribe to discovery channel"
                );
                self.unsubscribe_all(&subscribed).await;
                lifecycle.pending_commands = Some(commands);
                error!(
                    event = events::ROUTER_START_FAILED,
                    component = COMPONENT,
                    router = self.name.as_str(),
                    "router start rolled back"
                );
                return Err(RouterError::Subscribe {
                    channel: channel.name.clone(),
                    source,
                });
            }
            debug!(
                event = events::DISCOVERY_SUBSCRIBE_OK,
                component = COMPONENT,
                router = self.name.as_str(),
                channel = %channel,
                "subscribed to discovery channel"
            );
            subscribed.push(channel.clone());
        }

        lifecycle.worker = Some(spawn_dispatch_worker(
            self.name.clone(),
            self.dispatcher.clone(),
            commands,
        ));
        lifecycle.subscriptions = subscribed;

        info!(
            event = events::ROUTER_START,
            component = COMPONENT,
            router = self.name.as_str(),
            discovery_channels = self.discovery_channels.len(),
            "router started"
        );
        Ok(())
    }

    /// Unsubscribes, stops the dispatch worker and cancels every liveness
    /// check. Queued statuses are dropped.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let subscriptions = std::mem::take(&mut lifecycle.subscriptions);
        self.unsubscribe_all(&subscriptions).await;
        if let Some(worker) = lifecycle.worker.take() {
            worker.abort();
        }
        drop(lifecycle);

        self.liveness.shutdown().await;
        info!(
            event = events::ROUTER_SHUTDOWN,
            component = COMPONENT,
            router = self.name.as_str(),
            "router stopped"
        );
    }

    async fn unsubscribe_all(&self, channels: &[ChannelRef]) {
        for channel in channels {
            if let Err(err) = self.broker.unsubscribe(channel, self.listener.clone()).await {
                warn!(
                    event = events::DISCOVERY_UNSUBSCRIBE_FAILED,
                    component = COMPONENT,
                    router = self.name.as_str(),
                    channel = %channel,
                    err = %err,
                    "unable to unsubscribe from discovery channel"
                );
            }
        }
    }

    /// Feeds one raw discovery message through the same path the subscribed
    /// listeners use.
    pub async fn handle_discovery_message(
        &self,
        channel: &str,
        message: RawMessage,
    ) -> Result<ReportOutcome, DecodeError> {
        self.ingress.handle(channel, &message).await
    }

    /// Waits until every status queued before this call has been applied.
    /// Returns immediately when the dispatch worker is not running.
    pub async fn flush_dispatch(&self) {
        if self.lifecycle.lock().await.worker.is_none() {
            return;
        }
        let (ack, done) = oneshot::channel();
        if self
            .ingress
            .dispatch_sender()
            .send(DispatchCommand::Flush(ack))
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }

    pub async fn installed_routes(&self) -> Vec<RouteRecord> {
        self.routes.routes().await
    }

    pub async fn installed_topics(&self) -> Vec<String> {
        self.topics.installed_topics().await
    }

    pub async fn tracked_status_keys(&self) -> Vec<StatusKey> {
        self.liveness.tracked_keys().await
    }

    pub async fn is_tracking(&self, key: &StatusKey) -> bool {
        self.liveness.is_tracking(key).await
    }

    pub async fn liveness_record(&self, key: &StatusKey) -> Option<LivenessRecord> {
        self.liveness.record(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicRouter, RouterError};
    use crate::broker::RawMessage;
    use crate::config::RouterConfig;
    use crate::status::codec::StatusCodec;
    use crate::status::module_status::{ModuleStatus, ModuleType, StatusKey};
    use crate::test_support::{RecordingAdmin, RecordingBroker};
    use std::sync::Arc;
    use std::time::Duration;

    fn router(admin: &RecordingAdmin) -> (DynamicRouter, Arc<RecordingBroker>) {
        let broker = Arc::new(RecordingBroker::default());
        let router = DynamicRouter::new(
            "unit",
            RouterConfig::default(),
            broker.clone(),
            Arc::new(admin.clone()),
        )
        .expect("default config is valid");
        (router, broker)
    }

    fn message(status: &ModuleStatus) -> RawMessage {
        StatusCodec::encode(status, 0).expect("encode should succeed")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = RouterConfig::default();
        config.dispatch_queue_size = 0;

        let result = DynamicRouter::new(
            "unit",
            config,
            Arc::new(RecordingBroker::default()),
            Arc::new(RecordingAdmin::default()),
        );

        assert!(matches!(result, Err(RouterError::Config(_))));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (router, _broker) = router(&RecordingAdmin::default());

        router.start().await.expect("first start");

        assert!(matches!(
            router.start().await,
            Err(RouterError::AlreadyStarted)
        ));
        router.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_gateway_is_forgotten_and_reinstalled_on_return() {
        let admin = RecordingAdmin::default();
        let (router, broker) = router(&admin);
        router.start().await.expect("start");
        let status = ModuleStatus::gateway("gw", "Gateway_Queue_abc_Inbox", "Gateway_Topic_abc");

        router
            .handle_discovery_message("Gateway_Discovery_Topic", message(&status))
            .await
            .expect("decode");
        router.flush_dispatch().await;
        assert_eq!(broker.install_count(), 2);

        tokio::time::sleep(Duration::from_secs(70)).await;
        assert!(router.installed_routes().await.is_empty());
        assert!(router.installed_topics().await.is_empty());
        assert!(!router.is_tracking(&StatusKey::from("Gateway_Queue_abc_Inbox")).await);

        router
            .handle_discovery_message("Gateway_Discovery_Topic", message(&status))
            .await
            .expect("decode");
        router.flush_dispatch().await;
        assert_eq!(broker.install_count(), 4);
        router.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn admin_outage_keeps_route_records() {
        let admin = RecordingAdmin::default();
        admin.fail_connect(true);
        let (router, broker) = router(&admin);
        router.start().await.expect("start");
        let status = ModuleStatus::heartbeat(ModuleType::Sensor, "s", "Sensor_Queue_s_Inbox");

        router
            .handle_discovery_message("Sensor_Discovery_Topic", message(&status))
            .await
            .expect("decode");
        router.flush_dispatch().await;
        tokio::time::sleep(Duration::from_secs(70)).await;

        assert_eq!(admin.connect_count(), 1);
        assert!(router.tracked_status_keys().await.is_empty());
        assert_eq!(router.installed_routes().await.len(), 1);
        assert_eq!(broker.install_count(), 1);
        router.shutdown().await;
    }
}
