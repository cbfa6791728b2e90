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

//! Dispatch worker that applies decoded statuses to the control plane.

use crate::config::ChannelNaming;
use crate::control_plane::domain_topics::DomainTopicTracker;
use crate::control_plane::route_installer::RouteInstaller;
use crate::control_plane::topic_installer::TopicRouteInstaller;
use crate::observability::{events, fields};
use crate::reaper::channel_reaper::ChannelReaper;
use crate::reaper::report::RemovalError;
use crate::status::module_status::{ModuleStatus, StatusKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const COMPONENT: &str = "dispatch_worker";

#[derive(Debug)]
pub(crate) enum DispatchCommand {
    Apply(ModuleStatus),
    /// Acknowledged once every command queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Applies one status: inbox route, topic routes, domain topic diff.
pub(crate) struct StatusDispatcher {
    naming: ChannelNaming,
    routes: Arc<RouteInstaller>,
    topics: Arc<TopicRouteInstaller>,
    domain_topics: Arc<DomainTopicTracker>,
    reaper: Arc<ChannelReaper>,
}

impl StatusDispatcher {
    pub(crate) fn new(
        naming: ChannelNaming,
        routes: Arc<RouteInstaller>,
        topics: Arc<TopicRouteInstaller>,
        domain_topics: Arc<DomainTopicTracker>,
        reaper: Arc<ChannelReaper>,
    ) -> Self {
        Self {
            naming,
            routes,
            topics,
            domain_topics,
            reaper,
        }
    }

    pub(crate) async fn apply(&self, status: &ModuleStatus) {
        // install failures are logged by the installers and retried on the next report
        let _ = self.routes.ensure_route(status).await;

        match &status.kind {
            StatusKind::Heartbeat => {}
            StatusKind::Gateway { topic } | StatusKind::TutorSession { topic } => {
                let _ = self.topics.ensure_topic_route(topic).await;
            }
            StatusKind::Domain {
                log_playback_topics,
            } => self.apply_domain_topics(status, log_playback_topics).await,
        }
    }

    async fn apply_domain_topics(&self, status: &ModuleStatus, reported: &BTreeSet<String>) {
        let key = status.status_key();
        let (current, ignored): (BTreeSet<String>, BTreeSet<String>) = reported
            .iter()
            .cloned()
            .partition(|topic| self.naming.is_domain_topic(topic));
        if !ignored.is_empty() {
            warn!(
                event = events::DOMAIN_TOPIC_IGNORED,
                component = COMPONENT,
                status_key = %key,
                topics = %fields::format_topics(&ignored),
                prefix = self.naming.domain_topic_prefix.as_str(),
                "ignoring log playback topics outside the domain topic naming"
            );
        }

        let diff = self.domain_topics.observe(&key, &current).await;
        if !diff.is_empty() {
            info!(
                event = events::DOMAIN_TOPICS_CHANGED,
                component = COMPONENT,
                status_key = %key,
                added = %fields::format_topics(&diff.added),
                removed = %fields::format_topics(&diff.removed),
                "log playback topics changed"
            );
        }

        // every current topic, so a previously failed install is retried
        for topic in &current {
            let _ = self.topics.ensure_topic_route(topic).await;
        }

        for topic in &diff.removed {
            // the reaper logs its own failures
            match self.reaper.remove_topic(topic).await {
                Ok(_) => {
                    self.topics.forget_topic(topic).await;
                }
                Err(RemovalError::AdminConnection { .. }) => {
                    // nothing was removed; the next report or the timeout retries it
                    self.domain_topics.retain_pending(&key, topic).await;
                    warn!(
                        event = events::DOMAIN_TOPIC_REMOVAL_DEFERRED,
                        component = COMPONENT,
                        status_key = %key,
                        topic = topic.as_str(),
                        "dropped log playback topic kept until the broker can be reached"
                    );
                }
            }
        }
    }
}

/// Spawns the worker loop. It runs until every sender is gone or the handle is
/// aborted.
pub(crate) fn spawn_dispatch_worker(
    router_name: String,
    dispatcher: Arc<StatusDispatcher>,
    mut commands: Receiver<DispatchCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            event = events::DISPATCH_WORKER_START,
            component = COMPONENT,
            router = router_name.as_str(),
            "dispatch worker started"
        );

        while let Some(command) = commands.recv().await {
            match command {
                DispatchCommand::Apply(status) => dispatcher.apply(&status).await,
                DispatchCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }

        info!(
            event = events::DISPATCH_WORKER_STOP,
            component = COMPONENT,
            router = router_name.as_str(),
            "dispatch queue closed; stopping worker"
        );
    })
}
