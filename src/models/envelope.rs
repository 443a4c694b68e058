//! Wire envelopes exchanged with agents.
//!
//! Inbound frames are decoded exactly once into the closed [`InboundFrame`]
//! enum. Outbound traffic is either a routed [`TaskEnvelope`] or one of the
//! broadcast [`OutboundMessage`] variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::TaskStatus;
use crate::{AppError, Result};

/// Frame types an agent may send to the hub.
const INBOUND_TYPES: [&str; 4] = ["task_complete", "task_error", "context_update", "agent_status"];

/// A decoded agent → hub frame.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// The sending agent finished a task.
    TaskComplete {
        /// Hub-assigned task identifier.
        task_id: String,
    },
    /// The sending agent failed a task.
    TaskError {
        /// Hub-assigned task identifier.
        task_id: String,
        /// Agent-supplied failure description.
        error: String,
    },
    /// Shared-context delta to fan out to the other agents.
    ContextUpdate {
        /// Opaque key/value delta.
        context: Map<String, Value>,
    },
    /// The sending agent reports a new status.
    AgentStatus {
        /// Free-form status string, e.g. `ready`.
        status: String,
    },
}

/// Decode one text frame received from an agent.
///
/// Returns `Ok(None)` when the frame carries no `type` or a type the hub
/// does not handle; such frames are dropped by the caller.
///
/// # Errors
///
/// Returns `AppError::MalformedMessage` if the text is not a JSON object,
/// or if a handled `type` is missing required fields.
pub fn decode_frame(text: &str) -> Result<Option<InboundFrame>> {
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        return Err(AppError::MalformedMessage("frame is not a JSON object".into()));
    };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some(kind) if INBOUND_TYPES.contains(&kind) => kind.to_owned(),
        _ => return Ok(None),
    };

    let frame = serde_json::from_value(value)
        .map_err(|err| AppError::MalformedMessage(format!("{kind}: {err}")))?;
    Ok(Some(frame))
}

/// A hub → agent broadcast message.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A task changed state.
    TaskUpdate {
        /// Task identifier.
        task_id: String,
        /// New task state.
        status: TaskStatus,
        /// Agent that reported the change.
        agent_id: String,
        /// Failure description for failed tasks.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Hub receive time.
        timestamp: DateTime<Utc>,
    },
    /// Relayed context delta.
    ContextUpdate {
        /// Opaque key/value delta, forwarded untouched.
        context: Map<String, Value>,
        /// Agent that produced the delta.
        source_agent: String,
        /// Hub receive time.
        timestamp: DateTime<Utc>,
    },
    /// Relayed agent status.
    AgentStatus {
        /// Reporting agent.
        agent_id: String,
        /// Reported status.
        status: String,
        /// Hub receive time.
        timestamp: DateTime<Utc>,
    },
}

impl OutboundMessage {
    /// Task completed by `agent_id`.
    #[must_use]
    pub fn task_completed(task_id: String, agent_id: String) -> Self {
        Self::TaskUpdate {
            task_id,
            status: TaskStatus::Completed,
            agent_id,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Task failed on `agent_id`.
    #[must_use]
    pub fn task_failed(task_id: String, agent_id: String, error: String) -> Self {
        Self::TaskUpdate {
            task_id,
            status: TaskStatus::Failed,
            agent_id,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Context delta produced by `source_agent`.
    #[must_use]
    pub fn context_update(context: Map<String, Value>, source_agent: String) -> Self {
        Self::ContextUpdate {
            context,
            source_agent,
            timestamp: Utc::now(),
        }
    }

    /// Status reported by `agent_id`.
    #[must_use]
    pub fn agent_status(agent_id: String, status: String) -> Self {
        Self::AgentStatus {
            agent_id,
            status,
            timestamp: Utc::now(),
        }
    }
}

/// A routed task as delivered to its target agent.
///
/// Serializes flat: `{"type":"task","task_id":..,"target_agent":..,<payload>}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskEnvelope {
    #[serde(rename = "type")]
    kind: &'static str,
    /// Hub-assigned task identifier.
    pub task_id: String,
    /// Agent the task is addressed to.
    pub target_agent: String,
    /// Opaque submitter payload.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl TaskEnvelope {
    /// Wrap a submitter payload.
    ///
    /// A submitter `type` field moves to `task_type`; `task_id` and
    /// `target_agent` keys are replaced by the hub's values.
    #[must_use]
    pub fn new(task_id: String, target_agent: String, mut payload: Map<String, Value>) -> Self {
        payload.remove("task_id");
        payload.remove("target_agent");
        if let Some(kind) = payload.remove("type") {
            payload.insert("task_type".into(), kind);
        }
        Self {
            kind: "task",
            task_id,
            target_agent,
            payload,
        }
    }
}
