//! Task router: identify, deliver and track tasks addressed to one agent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::registry::ConnectionRegistry;
use crate::models::envelope::TaskEnvelope;
use crate::models::task::TaskIdGenerator;
use crate::{AppError, Result};

/// Routes submitted tasks to their target sessions.
#[derive(Debug)]
pub struct TaskRouter {
    registry: Arc<ConnectionRegistry>,
    ids: TaskIdGenerator,
    send_timeout: Duration,
}

impl TaskRouter {
    /// Create a router over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self::with_ids(registry, TaskIdGenerator::new(), send_timeout)
    }

    /// Create a router with a specific id generator.
    #[must_use]
    pub fn with_ids(
        registry: Arc<ConnectionRegistry>,
        ids: TaskIdGenerator,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ids,
            send_timeout,
        }
    }

    /// Assign an id to `payload`, send it to `target_agent` and track it
    /// as pending.
    ///
    /// The id is tracked before the send so a completion that races the
    /// send still finds it; on a failed send it is forgotten again, including
    /// from the abandoned list if the agent disconnected meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownAgent` if `target_agent` is not registered,
    /// or `AppError::Delivery` if the send fails. Neither leaves the task
    /// pending.
    pub async fn create_task(&self, target_agent: &str, payload: Map<String, Value>) -> Result<String> {
        let session = self
            .registry
            .lookup(target_agent)
            .ok_or_else(|| AppError::UnknownAgent(target_agent.to_owned()))?;

        let task_id = self.ids.next_id();
        let envelope = TaskEnvelope::new(task_id.clone(), target_agent.to_owned(), payload);
        let frame = serde_json::to_string(&envelope)?;

        let tracked = self
            .registry
            .track_pending(target_agent, session.connection_id(), &task_id);

        if let Err(err) = session.send(frame, self.send_timeout).await {
            // The agent may have disconnected mid-send and abandoned the id.
            if tracked {
                self.registry.forget_task(target_agent, &task_id);
            }
            warn!(target_agent, task_id, %err, "task delivery failed");
            return Err(err);
        }

        if !tracked {
            // Session was replaced between lookup and tracking.
            return Err(AppError::Delivery(format!(
                "session for {target_agent} was replaced during routing"
            )));
        }

        info!(target_agent, task_id, "task routed");
        Ok(task_id)
    }

    /// Drop `task_id` from `agent_id`'s pending list.
    ///
    /// Unknown pairs are ignored; returns whether anything was removed.
    pub fn complete_task(&self, agent_id: &str, task_id: &str) -> bool {
        let removed = self.registry.remove_pending(agent_id, task_id);
        if !removed {
            debug!(agent_id, task_id, "completion for untracked task ignored");
        }
        removed
    }
}
