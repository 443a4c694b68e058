//! Broadcast fanout to every registered session.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, error, warn};

use super::registry::ConnectionRegistry;
use crate::models::envelope::OutboundMessage;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Agents whose queue accepted the message.
    pub delivered: Vec<String>,
    /// Agents whose send failed or timed out.
    pub failed: Vec<String>,
}

impl DeliveryReport {
    /// Whether every recipient accepted the message.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delivers one message to all registered sessions.
#[derive(Debug)]
pub struct BroadcastFanout {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
}

impl BroadcastFanout {
    /// Create a fanout over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Send `message` to every session registered at call time except
    /// `exclude`.
    ///
    /// Sends run concurrently and fail independently; failures are logged
    /// and reported, never propagated, and failed sessions stay registered.
    pub async fn broadcast(&self, message: &OutboundMessage, exclude: Option<&str>) -> DeliveryReport {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(err) => {
                error!(%err, "failed to serialize broadcast");
                return DeliveryReport::default();
            }
        };

        let recipients = self
            .registry
            .sessions()
            .into_iter()
            .filter(|session| Some(session.agent_id()) != exclude);

        let sends = recipients.map(|session| {
            let frame = frame.clone();
            let timeout = self.send_timeout;
            async move {
                let outcome = session.send(frame, timeout).await;
                (session.agent_id().to_owned(), outcome)
            }
        });

        let mut report = DeliveryReport::default();
        for (agent_id, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => report.delivered.push(agent_id),
                Err(err) => {
                    warn!(agent_id, %err, "broadcast delivery failed");
                    report.failed.push(agent_id);
                }
            }
        }
        report.delivered.sort();
        report.failed.sort();

        debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "broadcast complete"
        );
        report
    }
}
