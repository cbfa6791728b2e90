//! Discovery-channel listener: decode, record liveness, hand off to dispatch.
//!
//! Runs on the broker's delivery path, so it never waits on a broker call.

use crate::broker::{DiscoveryListener, RawMessage};
use crate::data_plane::dispatch_worker::DispatchCommand;
use crate::liveness::monitor::{LivenessMonitor, ReportOutcome};
use crate::observability::{events, fields};
use crate::status::codec::{DecodeError, StatusCodec};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{error::TrySendError, Sender};
use tracing::{debug, warn, Level};

const COMPONENT: &str = "discovery_listener";

pub(crate) struct DiscoveryIngress {
    router_name: String,
    codec: StatusCodec,
    liveness: LivenessMonitor,
    dispatch: Sender<DispatchCommand>,
}

impl DiscoveryIngress {
    pub(crate) fn new(
        router_name: &str,
        codec: StatusCodec,
        liveness: LivenessMonitor,
        dispatch: Sender<DispatchCommand>,
    ) -> Self {
        Self {
            router_name: router_name.to_string(),
            codec,
            liveness,
            dispatch,
        }
    }

    pub(crate) fn dispatch_sender(&self) -> &Sender<DispatchCommand> {
        &self.dispatch
    }

    /// Handles one discovery message. Undecodable input is logged and dropped.
    pub(crate) async fn handle(
        &self,
        channel: &str,
        message: &RawMessage,
    ) -> Result<ReportOutcome, DecodeError> {
        let decoded = match self.codec.decode(channel, message) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(
                    event = events::DISCOVERY_DROP_UNDECODABLE,
                    component = COMPONENT,
                    router = self.router_name.as_str(),
                    channel,
                    err = %err,
                    "dropping undecodable discovery message"
                );
                return Err(err);
            }
        };

        let status = decoded.status;
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::DISCOVERY_RECEIVE,
                component = COMPONENT,
                router = self.router_name.as_str(),
                channel,
                status_key = %status.status_key(),
                module_type = %status.module_type,
                module_name = status.module_name.as_str(),
                topic = %fields::format_broadcast_topic(&status),
                "received module status"
            );
        }

        let outcome = self
            .liveness
            .record_report(&status, decoded.sent_timestamp_ms)
            .await;

        let status_key = status.status_key();
        match self.dispatch.try_send(DispatchCommand::Apply(status)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    event = events::DISCOVERY_DISPATCH_QUEUE_FULL,
                    component = COMPONENT,
                    router = self.router_name.as_str(),
                    channel,
                    status_key = %status_key,
                    "dispatch queue full; route check deferred to next report"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    event = events::DISCOVERY_DISPATCH_QUEUE_CLOSED,
                    component = COMPONENT,
                    router = self.router_name.as_str(),
                    channel,
                    "dispatch worker stopped; status not dispatched"
                );
            }
        }

        Ok(outcome)
    }
}

/// Listener registered on every discovery channel.
#[derive(Clone)]
pub(crate) struct DiscoveryChannelListener {
    ingress: Arc<DiscoveryIngress>,
}

impl DiscoveryChannelListener {
    pub(crate) fn new(ingress: Arc<DiscoveryIngress>) -> Self {
        Self { ingress }
    }
}

#[async_trait]
impl DiscoveryListener for DiscoveryChannelListener {
    async fn on_receive(&self, channel: &str, message: RawMessage) {
        // failures are logged by the ingress; nothing propagates to the broker
        let _ = self.ingress.handle(channel, &message).await;
    }
}
