//! Protocol dispatcher and session lifecycle glue.
//!
//! Classifies inbound frames and drives the router and fanout; also
//! registers sessions on connect and tears them down on close.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::fanout::{BroadcastFanout, DeliveryReport};
use super::registry::ConnectionRegistry;
use super::router::TaskRouter;
use super::session::Session;
use crate::models::envelope::{decode_frame, InboundFrame, OutboundMessage};
use crate::AppError;

/// Routes inbound agent frames to the hub components.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    router: Arc<TaskRouter>,
    fanout: Arc<BroadcastFanout>,
}

impl Dispatcher {
    /// Create a dispatcher over shared hub components.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        router: Arc<TaskRouter>,
        fanout: Arc<BroadcastFanout>,
    ) -> Self {
        Self {
            registry,
            router,
            fanout,
        }
    }

    /// Register a freshly accepted connection.
    ///
    /// A previous connection for the same agent id is closed.
    pub fn open_session(&self, session: Session) {
        let agent_id = session.agent_id().to_owned();
        if let Some(previous) = self.registry.register(&agent_id, session) {
            info!(
                agent_id,
                connection_id = %previous.connection_id(),
                "closing superseded connection"
            );
            previous.supersede();
        }
    }

    /// Tear down a connection after its read loop ended.
    pub fn close_session(&self, session: &Session, reason: &AppError) {
        let removed = self
            .registry
            .unregister_connection(session.agent_id(), session.connection_id());
        if removed {
            info!(agent_id = session.agent_id(), %reason, "agent disconnected");
        } else {
            debug!(agent_id = session.agent_id(), %reason, "superseded connection closed");
        }
    }

    /// Decode and handle one text frame from `agent_id`.
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub async fn handle_text(&self, agent_id: &str, text: &str) -> Option<DeliveryReport> {
        match decode_frame(text) {
            Ok(Some(frame)) => Some(self.handle_frame(agent_id, frame).await),
            Ok(None) => {
                debug!(agent_id, "ignoring frame with unhandled type");
                None
            }
            Err(err) => {
                warn!(agent_id, %err, "dropping malformed frame");
                None
            }
        }
    }

    /// Act on a decoded frame from `agent_id`.
    pub async fn handle_frame(&self, agent_id: &str, frame: InboundFrame) -> DeliveryReport {
        match frame {
            InboundFrame::TaskComplete { task_id } => {
                self.router.complete_task(agent_id, &task_id);
                info!(agent_id, task_id, "task completed");
                let update = OutboundMessage::task_completed(task_id, agent_id.to_owned());
                self.fanout.broadcast(&update, None).await
            }
            InboundFrame::TaskError { task_id, error } => {
                self.router.complete_task(agent_id, &task_id);
                warn!(agent_id, task_id, error, "task failed");
                let update = OutboundMessage::task_failed(task_id, agent_id.to_owned(), error);
                self.fanout.broadcast(&update, None).await
            }
            InboundFrame::ContextUpdate { context } => {
                debug!(agent_id, keys = context.len(), "context update");
                let update = OutboundMessage::context_update(context, agent_id.to_owned());
                // The source already holds the delta, so it is not echoed back.
                self.fanout.broadcast(&update, Some(agent_id)).await
            }
            InboundFrame::AgentStatus { status } => {
                self.registry.set_status(agent_id, &status);
                debug!(agent_id, status, "agent status");
                let update = OutboundMessage::agent_status(agent_id.to_owned(), status);
                self.fanout.broadcast(&update, None).await
            }
        }
    }
}
