//! HTTP listener hosting the agent WebSocket endpoint and the
//! synchronous API.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use super::{http, ws};
use crate::hub::AppState;
use crate::{AppError, Result};

/// Build the axum router with all hub routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    Router::new()
        .route("/ws/agent/{agent_id}", get(ws::agent_socket))
        .route("/api/tasks", post(http::create_task))
        .route("/api/agents", get(http::list_agents))
        .route("/health", get(http::health))
        .with_state(state)
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin, %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind `config.host:config.http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` for an invalid bind address or
/// `AppError::Io` if binding or serving fails.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = state.config.bind_addr()?;
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Io(format!("failed to bind {bind}: {err}")))?;
    serve_on(listener, state, ct).await
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// On shutdown every open agent connection is sent a close frame.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("listener has no local address: {err}")))?;
    let registry = Arc::clone(&state.registry);
    let router = build_router(state);

    info!(%local, "hub listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
            for session in registry.sessions() {
                session.close();
            }
        })
        .await
        .map_err(|err| AppError::Io(format!("server error: {err}")))?;

    info!("hub shut down");
    Ok(())
}
