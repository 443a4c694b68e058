//! Synchronous request/response surface: task submission and status.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{info_span, Instrument};

use crate::hub::{AppState, RegistrySnapshot};
use crate::{AppError, Result};

/// Successful task submission.
#[derive(Debug, Serialize)]
pub struct TaskAccepted {
    /// Always `success`.
    pub status: &'static str,
    /// Hub-assigned task identifier.
    pub task_id: String,
    /// Human-readable routing note.
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl AppError {
    /// HTTP status used when this error reaches a synchronous caller.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownAgent(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::ConnectionLost(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Handler for `GET /health`.
pub async fn health() -> &'static str {
    "ok"
}

/// Handler for `POST /api/tasks`.
///
/// The body is `{"target_agent": "...", ...payload}`; the content type
/// is not checked.
///
/// # Errors
///
/// `BadRequest` for a body that is not a JSON object or lacks
/// `target_agent`, `UnknownAgent` for an unregistered target, `Delivery`
/// for a failed send.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TaskAccepted>> {
    // Parsed by hand so every rejection carries the error body shape.
    let body: Value = serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("task body is not valid JSON: {err}")))?;
    let Value::Object(mut payload) = body else {
        return Err(AppError::BadRequest("task body must be a JSON object".into()));
    };
    let target_agent = match payload.remove("target_agent") {
        Some(Value::String(target)) if !target.is_empty() => target,
        _ => {
            return Err(AppError::BadRequest(
                "target_agent must be a non-empty string".into(),
            ))
        }
    };

    let task_id = state
        .router
        .create_task(&target_agent, payload)
        .instrument(info_span!("submit_task", target_agent = %target_agent))
        .await?;
    Ok(Json(TaskAccepted {
        status: "success",
        message: format!("Task routed to agent {target_agent}"),
        task_id,
    }))
}

/// Handler for `GET /api/agents`.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<RegistrySnapshot> {
    Json(state.registry.snapshot())
}
