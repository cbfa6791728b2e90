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

//! Broker-side teardown of the routes and channels belonging to a module.

use crate::broker::{BrokerAdmin, BrokerError, ChannelKind, ChannelRef};
use crate::config::ChannelNaming;
use crate::observability::{events, fields};
use crate::reaper::admin_session::ScopedAdminSession;
use crate::reaper::report::{ItemRemovalError, RemovalError, RemovalItem, RemovalReport};
use crate::status::module_status::{ModuleStatus, StatusKind};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

const COMPONENT: &str = "channel_reaper";

/// Substring to search for, and the channel kind whose names are searched.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub(crate) struct RemovalTarget {
    pub(crate) needle: String,
    pub(crate) kind: ChannelKind,
}

impl RemovalTarget {
    fn new(needle: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            needle: needle.into(),
            kind,
        }
    }
}

/// Everything that has to go when `status` times out. `tracked_topics` are the
/// log-playback topics the router installed routes for on behalf of a domain
/// module.
pub(crate) fn removal_targets(
    naming: &ChannelNaming,
    status: &ModuleStatus,
    tracked_topics: &BTreeSet<String>,
) -> Vec<RemovalTarget> {
    let outbox = naming.outbox_for(&status.inbox_channel);
    let mut targets = Vec::new();
    match &status.kind {
        StatusKind::Heartbeat => {
            targets.push(RemovalTarget::new(outbox, ChannelKind::Queue));
        }
        StatusKind::Gateway { topic } => {
            targets.push(RemovalTarget::new(outbox, ChannelKind::Queue));
            targets.push(RemovalTarget::new(topic.as_str(), ChannelKind::Topic));
            // advisory topics embed the queue flavour of the gateway name
            targets.push(RemovalTarget::new(
                naming.gateway_queue_variant(topic),
                ChannelKind::Topic,
            ));
        }
        StatusKind::TutorSession { topic } => {
            // the tutor inbox outlives its sessions
            targets.push(RemovalTarget::new(
                naming.tutor_session_id(topic),
                ChannelKind::Topic,
            ));
        }
        StatusKind::Domain {
            log_playback_topics,
        } => {
            targets.push(RemovalTarget::new(outbox, ChannelKind::Queue));
            for topic in tracked_topics
                .union(log_playback_topics)
                .filter(|topic| naming.is_domain_topic(topic))
            {
                targets.push(RemovalTarget::new(topic.as_str(), ChannelKind::Topic));
            }
        }
    }

    let mut seen = HashSet::new();
    targets.retain(|target| !target.needle.is_empty() && seen.insert(target.clone()));
    targets
}

/// Removes broker routes and channels by substring match, one admin session per
/// call.
pub(crate) struct ChannelReaper {
    admin: Arc<dyn BrokerAdmin>,
    naming: ChannelNaming,
}

impl ChannelReaper {
    pub(crate) fn new(admin: Arc<dyn BrokerAdmin>, naming: ChannelNaming) -> Self {
        Self { admin, naming }
    }

    /// Tears down everything belonging to a module that went silent.
    pub(crate) async fn remove_module(
        &self,
        status: &ModuleStatus,
        tracked_topics: &BTreeSet<String>,
    ) -> Result<RemovalReport, RemovalError> {
        let targets = removal_targets(&self.naming, status, tracked_topics);
        let identity = status.to_string();
        self.remove_targets(&identity, &targets).await
    }

    /// Tears down a single log-playback topic dropped from a domain report.
    pub(crate) async fn remove_topic(&self, topic: &str) -> Result<RemovalReport, RemovalError> {
        let targets = [RemovalTarget::new(topic, ChannelKind::Topic)];
        self.remove_targets(&format!("topic {topic}"), &targets).await
    }

    async fn remove_targets(
        &self,
        identity: &str,
        targets: &[RemovalTarget],
    ) -> Result<RemovalReport, RemovalError> {
        let needles = targets
            .iter()
            .map(|target| target.needle.clone())
            .collect::<Vec<_>>();
        info!(
            event = events::REMOVAL_START,
            component = COMPONENT,
            target = identity,
            needles = %fields::format_topics(&needles),
            "removing broker routes and channels"
        );

        let session = match self.admin.connect().await {
            Ok(session) => ScopedAdminSession::new(session),
            Err(source) => {
                error!(
                    event = events::REMOVAL_ADMIN_CONNECT_FAILED,
                    component = COMPONENT,
                    target = identity,
                    err = %source,
                    "unable to open admin session; removal abandoned for this cycle"
                );
                return Err(RemovalError::AdminConnection {
                    target: identity.to_string(),
                    source,
                });
            }
        };

        let mut report = RemovalReport::default();
        let mut route_needles = HashSet::new();
        for target in targets {
            if route_needles.insert(target.needle.as_str()) {
                report.merge(Self::remove_routes(&session, &target.needle).await);
            }
            report.merge(Self::remove_channels(&session, target).await);
        }

        if report.is_complete() {
            info!(
                event = events::REMOVAL_OK,
                component = COMPONENT,
                target = identity,
                routes_removed = report.routes_removed.len(),
                channels_removed = report.channels_removed.len(),
                "removal finished"
            );
        } else {
            warn!(
                event = events::REMOVAL_PARTIAL,
                component = COMPONENT,
                target = identity,
                routes_removed = report.routes_removed.len(),
                channels_removed = report.channels_removed.len(),
                failures = report.failures.len(),
                "removal finished with failures; broker objects may be orphaned"
            );
        }
        Ok(report)
    }

    async fn remove_routes(session: &ScopedAdminSession, needle: &str) -> RemovalReport {
        let mut report = RemovalReport::default();
        let route_ids = match session.list_routes(needle).await {
            Ok(route_ids) => route_ids,
            Err(source) => {
                Self::record_failure(
                    &mut report,
                    RemovalItem::RouteListing(needle.to_string()),
                    source,
                );
                return report;
            }
        };

        for route_id in route_ids {
            if let Err(source) = session.stop_route(&route_id).await {
                Self::record_failure(&mut report, RemovalItem::RouteStop(route_id), source);
                continue;
            }
            match session.remove_route(&route_id).await {
                Ok(()) => {
                    info!(
                        event = events::REMOVAL_ROUTE_REMOVED,
                        component = COMPONENT,
                        route_id = route_id.as_str(),
                        needle,
                        "route removed"
                    );
                    report.routes_removed.push(route_id);
                }
                Err(source) => {
                    Self::record_failure(&mut report, RemovalItem::Route(route_id), source);
                }
            }
        }
        report
    }

    async fn remove_channels(
        session: &ScopedAdminSession,
        target: &RemovalTarget,
    ) -> RemovalReport {
        let mut report = RemovalReport::default();
        let names = match session.list_channels(target.kind, &target.needle).await {
            Ok(names) => names,
            Err(source) => {
                Self::record_failure(
                    &mut report,
                    RemovalItem::ChannelListing(target.kind, target.needle.clone()),
                    source,
                );
                return report;
            }
        };

        for name in names {
            let channel = ChannelRef {
                kind: target.kind,
                name,
            };
            match session.remove_channel(channel.kind, &channel.name).await {
                Ok(()) => {
                    info!(
                        event = events::REMOVAL_CHANNEL_REMOVED,
                        component = COMPONENT,
                        channel = %channel,
                        needle = target.needle.as_str(),
                        "channel removed"
                    );
                    report.channels_removed.push(channel);
                }
                Err(source) => {
                    Self::record_failure(&mut report, RemovalItem::Channel(channel), source);
                }
            }
        }
        report
    }

    fn record_failure(report: &mut RemovalReport, item: RemovalItem, source: BrokerError) {
        let failure = ItemRemovalError { item, source };
        warn!(
            event = events::REMOVAL_ITEM_FAILED,
            component = COMPONENT,
            err = %failure,
            "removal step failed; continuing with remaining items"
        );
        report.failures.push(failure);
    }
}
