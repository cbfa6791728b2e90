//! Scoped ownership of an administrative session.

use crate::broker::{AdminSession, BrokerError, ChannelKind};
use crate::observability::events;
use async_trait::async_trait;
use std::ops::Deref;
use tokio::runtime::Handle;
use tracing::{debug, warn};

const COMPONENT: &str = "admin_session";

/// Owns an [`AdminSession`] for the length of one removal and closes it on
/// drop. Closing can block on the network, so it runs on a spawned task and
/// never on the caller's path.
pub(crate) struct ScopedAdminSession {
    session: Box<dyn AdminSession>,
}

impl ScopedAdminSession {
    pub(crate) fn new(session: Box<dyn AdminSession>) -> Self {
        Self { session }
    }
}

impl Deref for ScopedAdminSession {
    type Target = dyn AdminSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for ScopedAdminSession {
    fn drop(&mut self) {
        let session = std::mem::replace(&mut self.session, Box::new(ReleasedSession));

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = session.close().await {
                        warn!(
                            event = events::ADMIN_SESSION_CLOSE_FAILED,
                            component = COMPONENT,
                            err = %err,
                            "unable to close admin session"
                        );
                    }
                });
            }
            Err(_) => {
                debug!(
                    event = events::ADMIN_SESSION_CLOSE_NO_RUNTIME,
                    component = COMPONENT,
                    "no runtime available; admin session dropped without close"
                );
            }
        }
    }
}

/// Placeholder left behind once the real session has been handed to the closer.
struct ReleasedSession;

#[async_trait]
impl AdminSession for ReleasedSession {
    async fn list_routes(&self, _filter: &str) -> Result<Vec<String>, BrokerError> {
        Ok(Vec::new())
    }

    async fn stop_route(&self, route_id: &str) -> Result<(), BrokerError> {
        Err(BrokerError::NotFound(route_id.to_string()))
    }

    async fn remove_route(&self, route_id: &str) -> Result<(), BrokerError> {
        Err(BrokerError::NotFound(route_id.to_string()))
    }

    async fn list_channels(
        &self,
        _kind: ChannelKind,
        _filter: &str,
    ) -> Result<Vec<String>, BrokerError> {
        Ok(Vec::new())
    }

    async fn remove_channel(&self, _kind: ChannelKind, name: &str) -> Result<(), BrokerError> {
        Err(BrokerError::NotFound(name.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        Ok(())
    }
}
