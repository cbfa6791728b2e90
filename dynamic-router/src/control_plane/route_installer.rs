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

//! Idempotent installation of per-module inbox fan-out routes.

use crate::broker::{Broker, BrokerAdmin, BrokerError, ChannelRef, RouteDefinition};
use crate::config::ChannelNaming;
use crate::control_plane::route_table::{RouteRecord, RouteTable};
use crate::observability::{events, fields};
use crate::reaper::admin_session::ScopedAdminSession;
use crate::status::module_status::ModuleStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "route_installer";

/// Result of an `ensure` call that did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnsureOutcome {
    Installed,
    AlreadyInstalled,
}

/// Broker refused to create or start a route.
#[derive(Debug)]
pub enum RouteInstallError {
    InstallRejected { route_id: String, source: BrokerError },
    StartFailed { route_id: String, source: BrokerError },
}

impl RouteInstallError {
    pub fn route_id(&self) -> &str {
        match self {
            RouteInstallError::InstallRejected { route_id, .. }
            | RouteInstallError::StartFailed { route_id, .. } => route_id,
        }
    }
}

impl Display for RouteInstallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteInstallError::InstallRejected { route_id, source } => {
                write!(f, "failed to install route '{route_id}': {source}")
            }
            RouteInstallError::StartFailed { route_id, source } => {
                write!(f, "failed to start route '{route_id}': {source}")
            }
        }
    }
}

impl Error for RouteInstallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RouteInstallError::InstallRejected { source, .. }
            | RouteInstallError::StartFailed { source, .. } => Some(source),
        }
    }
}

/// Builds the fan-out route for one inbox: inbox -> outbox, logger sink, monitor.
pub(crate) fn inbox_route(naming: &ChannelNaming, inbox_channel: &str) -> RouteDefinition {
    RouteDefinition {
        route_id: inbox_channel.to_string(),
        source: ChannelRef::queue(inbox_channel),
        destinations: vec![
            ChannelRef::queue(naming.outbox_for(inbox_channel)),
            ChannelRef::queue(naming.logger_sink.as_str()),
            ChannelRef::topic(naming.monitor_topic.as_str()),
        ],
    }
}

/// Installs and starts `route`. A route that was installed but did not start
/// is removed again, so the broker holds no route the caller did not record.
pub(crate) async fn install_and_start(
    broker: &dyn Broker,
    admin: &dyn BrokerAdmin,
    route: &RouteDefinition,
) -> Result<(), RouteInstallError> {
    broker
        .install_route(route)
        .await
        .map_err(|source| RouteInstallError::InstallRejected {
            route_id: route.route_id.clone(),
            source,
        })?;

    let Err(source) = broker.start_route(&route.route_id).await else {
        return Ok(());
    };
    roll_back(admin, &route.route_id).await;
    Err(RouteInstallError::StartFailed {
        route_id: route.route_id.clone(),
        source,
    })
}

async fn roll_back(admin: &dyn BrokerAdmin, route_id: &str) {
    let removed = match admin.connect().await {
        Ok(session) => ScopedAdminSession::new(session).remove_route(route_id).await,
        Err(err) => Err(err),
    };

    match removed {
        Ok(()) => debug!(
            event = events::ROUTE_ROLLBACK_OK,
            component = COMPONENT,
            route_id,
            "removed route that failed to start"
        ),
        Err(err) => warn!(
            event = events::ROUTE_ROLLBACK_FAILED,
            component = COMPONENT,
            route_id,
            err = %err,
            "unable to remove route that failed to start; it is left stopped on the broker"
        ),
    }
}

/// Installs a route per inbox exactly once.
pub(crate) struct RouteInstaller {
    broker: Arc<dyn Broker>,
    admin: Arc<dyn BrokerAdmin>,
    naming: ChannelNaming,
    route_table: RouteTable,
    install_lock: Mutex<()>,
}

impl RouteInstaller {
    pub(crate) fn new(
        broker: Arc<dyn Broker>,
        admin: Arc<dyn BrokerAdmin>,
        naming: ChannelNaming,
    ) -> Self {
        Self {
            broker,
            admin,
            naming,
            route_table: RouteTable::new(),
            install_lock: Mutex::new(()),
        }
    }

    /// Makes sure the inbox route for `status` exists. A failed installation is
    /// logged and left unrecorded so that the next report retries it.
    pub(crate) async fn ensure_route(
        &self,
        status: &ModuleStatus,
    ) -> Result<EnsureOutcome, RouteInstallError> {
        let inbox = status.inbox_channel.as_str();

        // check, install and record form one critical section
        let _install_guard = self.install_lock.lock().await;

        if self.route_table.contains_route(inbox).await {
            debug!(
                event = events::ROUTE_INSTALL_SKIPPED,
                component = COMPONENT,
                route_id = inbox,
                reason = fields::REASON_ALREADY_INSTALLED,
                "inbox route already installed"
            );
            return Ok(EnsureOutcome::AlreadyInstalled);
        }

        let route = inbox_route(&self.naming, inbox);
        if let Err(err) =
            install_and_start(self.broker.as_ref(), self.admin.as_ref(), &route).await
        {
            error!(
                event = events::ROUTE_INSTALL_FAILED,
                component = COMPONENT,
                route_id = inbox,
                module_type = %status.module_type,
                module_name = status.module_name.as_str(),
                err = %err,
                "unable to set up inbox route; will retry on next report"
            );
            return Err(err);
        }

        let outbox = route
            .destinations
            .first()
            .map(|destination| destination.name.clone())
            .unwrap_or_default();
        self.route_table
            .insert_route(RouteRecord {
                inbox_channel: inbox.to_string(),
                outbox_channel: outbox,
                installed_at: Instant::now(),
            })
            .await;

        info!(
            event = events::ROUTE_INSTALL_OK,
            component = COMPONENT,
            route_id = inbox,
            module_type = %status.module_type,
            module_name = status.module_name.as_str(),
            destinations = %fields::format_destinations(&route.destinations),
            "inbox route created"
        );
        Ok(EnsureOutcome::Installed)
    }

    /// Drops the record for `inbox` so that a later report re-installs it.
    pub(crate) async fn forget_route(&self, inbox: &str) -> bool {
        let _install_guard = self.install_lock.lock().await;
        self.route_table.remove_route(inbox).await.is_some()
    }

    pub(crate) async fn routes(&self) -> Vec<RouteRecord> {
        self.route_table.routes().await
    }
}

#[cfg(test)]
mod tests {
    use super::{inbox_route, EnsureOutcome, RouteInstallError, RouteInstaller};
    use crate::broker::{BrokerError, ChannelRef};
    use crate::config::ChannelNaming;
    use crate::status::module_status::{ModuleStatus, ModuleType};
    use crate::test_support::{RecordingAdmin, RecordingBroker};
    use std::sync::Arc;

    fn new_installer(broker: &Arc<RecordingBroker>, admin: &RecordingAdmin) -> RouteInstaller {
        RouteInstaller::new(
            broker.clone(),
            Arc::new(admin.clone()),
            ChannelNaming::default(),
        )
    }

    #[test]
    fn inbox_route_fans_out_to_outbox_logger_and_monitor() {
        let route = inbox_route(&ChannelNaming::default(), "Gateway_Queue_abc_Inbox");

        assert_eq!(route.route_id, "Gateway_Queue_abc_Inbox");
        assert_eq!(route.source, ChannelRef::queue("Gateway_Queue_abc_Inbox"));
        assert_eq!(
            route.destinations,
            vec![
                ChannelRef::queue("Gateway_Queue_abc"),
                ChannelRef::queue("Logger_Queue"),
                ChannelRef::topic("Monitor_Topic"),
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_reports_install_exactly_one_route() {
        let broker = Arc::new(RecordingBroker::default());
        let installer = new_installer(&broker, &RecordingAdmin::default());
        let status = ModuleStatus::heartbeat(ModuleType::Sensor, "sensor", "Sensor_Queue_a_Inbox");

        assert_eq!(
            installer.ensure_route(&status).await.ok(),
            Some(EnsureOutcome::Installed)
        );
        for _ in 0..4 {
            assert_eq!(
                installer.ensure_route(&status).await.ok(),
                Some(EnsureOutcome::AlreadyInstalled)
            );
        }

        assert_eq!(broker.install_count(), 1);
        assert_eq!(broker.start_count(), 1);
        assert_eq!(installer.routes().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_reports_install_exactly_one_route() {
        let broker = Arc::new(RecordingBroker::default());
        let installer = Arc::new(new_installer(&broker, &RecordingAdmin::default()));
        let status = ModuleStatus::heartbeat(ModuleType::Ums, "ums", "UMS_Queue_Inbox");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let installer = installer.clone();
                let status = status.clone();
                tokio::spawn(async move { installer.ensure_route(&status).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.expect("task should not panic").is_ok());
        }

        assert_eq!(broker.install_count(), 1);
    }

    #[tokio::test]
    async fn failed_install_is_not_recorded_and_retried_later() {
        let broker = Arc::new(RecordingBroker::default());
        broker.fail_installs(true);
        let installer = new_installer(&broker, &RecordingAdmin::default());
        let status = ModuleStatus::heartbeat(ModuleType::Learner, "learner", "Learner_Queue_Inbox");

        let err = installer
            .ensure_route(&status)
            .await
            .expect_err("install should fail");
        assert!(matches!(err, RouteInstallError::InstallRejected { .. }));
        assert_eq!(err.route_id(), "Learner_Queue_Inbox");
        assert!(installer.routes().await.is_empty());

        broker.fail_installs(false);
        assert_eq!(
            installer.ensure_route(&status).await.ok(),
            Some(EnsureOutcome::Installed)
        );
        assert_eq!(broker.install_count(), 2);
    }

    #[tokio::test]
    async fn failed_start_is_rolled_back_and_not_recorded() {
        let broker = Arc::new(RecordingBroker::default());
        broker.fail_starts(true);
        // the admin view of the broker already holds the installed route
        let admin = RecordingAdmin::default().with_routes(&["LMS_Queue_Inbox"]);
        let installer = new_installer(&broker, &admin);
        let status = ModuleStatus::heartbeat(ModuleType::Lms, "lms", "LMS_Queue_Inbox");

        let err = installer
            .ensure_route(&status)
            .await
            .expect_err("start should fail");

        assert!(matches!(
            err,
            RouteInstallError::StartFailed {
                source: BrokerError::Rejected(_),
                ..
            }
        ));
        assert!(installer.routes().await.is_empty());
        assert!(admin.routes().is_empty());
        assert_eq!(admin.connect_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_admin_still_reports_the_start_failure() {
        let broker = Arc::new(RecordingBroker::default());
        broker.fail_starts(true);
        let admin = RecordingAdmin::default().with_routes(&["LMS_Queue_Inbox"]);
        admin.fail_connect(true);
        let installer = new_installer(&broker, &admin);
        let status = ModuleStatus::heartbeat(ModuleType::Lms, "lms", "LMS_Queue_Inbox");

        let err = installer
            .ensure_route(&status)
            .await
            .expect_err("start should fail");

        assert!(matches!(err, RouteInstallError::StartFailed { .. }));
        assert_eq!(admin.routes().len(), 1);
        assert!(installer.routes().await.is_empty());
    }

    #[tokio::test]
    async fn forgotten_route_is_installed_again() {
        let broker = Arc::new(RecordingBroker::default());
        let installer = new_installer(&broker, &RecordingAdmin::default());
        let status = ModuleStatus::heartbeat(ModuleType::Pedagogical, "ped", "Ped_Queue_Inbox");

        installer.ensure_route(&status).await.expect("first install");
        assert!(installer.forget_route("Ped_Queue_Inbox").await);
        assert!(!installer.forget_route("Ped_Queue_Inbox").await);
        installer.ensure_route(&status).await.expect("second install");

        assert_eq!(broker.install_count(), 2);
    }
}
