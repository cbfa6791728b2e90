//! Idempotent installation of topic fan-out routes (topic -> monitor, logger sink).

use crate::broker::{Broker, BrokerAdmin, ChannelRef, RouteDefinition};
use crate::config::ChannelNaming;
use crate::control_plane::route_installer::{install_and_start, EnsureOutcome, RouteInstallError};
use crate::observability::{events, fields};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

const COMPONENT: &str = "topic_installer";

pub(crate) fn topic_route(naming: &ChannelNaming, topic: &str) -> RouteDefinition {
    RouteDefinition {
        route_id: topic.to_string(),
        source: ChannelRef::topic(topic),
        destinations: vec![
            ChannelRef::topic(naming.monitor_topic.as_str()),
            ChannelRef::queue(naming.logger_sink.as_str()),
        ],
    }
}

pub(crate) struct TopicRouteInstaller {
    broker: Arc<dyn Broker>,
    admin: Arc<dyn BrokerAdmin>,
    naming: ChannelNaming,
    // held across the broker call so check-install-record is atomic
    installed_topics: Mutex<HashSet<String>>,
}

impl TopicRouteInstaller {
    pub(crate) fn new(
        broker: Arc<dyn Broker>,
        admin: Arc<dyn BrokerAdmin>,
        naming: ChannelNaming,
    ) -> Self {
        Self {
            broker,
            admin,
            naming,
            installed_topics: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) async fn ensure_topic_route(
        &self,
        topic: &str,
    ) -> Result<EnsureOutcome, RouteInstallError> {
        let mut installed_topics = self.installed_topics.lock().await;
        if installed_topics.contains(topic) {
            debug!(
                event = events::ROUTE_INSTALL_SKIPPED,
                component = COMPONENT,
                topic,
                reason = fields::REASON_ALREADY_INSTALLED,
                "topic route already installed"
            );
            return Ok(EnsureOutcome::AlreadyInstalled);
        }

        let route = topic_route(&self.naming, topic);
        if let Err(err) =
            install_and_start(self.broker.as_ref(), self.admin.as_ref(), &route).await
        {
            error!(
                event = events::TOPIC_ROUTE_INSTALL_FAILED,
                component = COMPONENT,
                topic,
                err = %err,
                "unable to set up topic route; will retry on next report"
            );
            return Err(err);
        }

        installed_topics.insert(topic.to_string());
        info!(
            event = events::TOPIC_ROUTE_INSTALL_OK,
            component = COMPONENT,
            topic,
            destinations = %fields::format_destinations(&route.destinations),
            "topic route created"
        );
        Ok(EnsureOutcome::Installed)
    }

    pub(crate) async fn forget_topic(&self, topic: &str) -> bool {
        self.installed_topics.lock().await.remove(topic)
    }

    pub(crate) async fn installed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.installed_topics.lock().await.iter().cloned().collect();
        topics.sort();
        topics
    }
}
