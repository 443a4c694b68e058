//! Per-agent WebSocket endpoint.
//!
//! Each connection runs a writer task that drains the session's outbound
//! queue and pings on a fixed cadence, and a read loop that feeds text
//! frames to the dispatcher. Silence longer than the idle timeout is
//! treated as a lost connection.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::hub::{AppState, Session};
use crate::models::session::SessionPhase;
use crate::AppError;

/// Tracks one connection through its lifecycle phases.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    phase: SessionPhase,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Connecting,
        }
    }
}

impl ConnectionLifecycle {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Move to `next` if the transition is permitted.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if self.phase.can_transition_to(next) {
            trace!(from = ?self.phase, to = ?next, "connection phase");
            self.phase = next;
            true
        } else {
            warn!(from = ?self.phase, to = ?next, "rejected connection phase transition");
            false
        }
    }
}

/// `GET /ws/agent/{agent_id}` upgrade handler.
pub async fn agent_socket(
    ws: WebSocketUpgrade,
    Path(agent_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, agent_id, state))
}

async fn run_connection(socket: WebSocket, agent_id: String, state: Arc<AppState>) {
    let settings = state.config.session.clone();
    let (session, outbound_rx) = Session::new(&agent_id, settings.send_queue_capacity);
    let span = info_span!(
        "agent_conn",
        agent_id = %agent_id,
        connection_id = %session.connection_id()
    );

    async move {
        let mut lifecycle = ConnectionLifecycle::default();
        let closed = session.closed_token();

        if !lifecycle.advance(SessionPhase::Registered) {
            return;
        }
        state.dispatcher.open_session(session.clone());

        let (sink, stream) = socket.split();
        let writer = tokio::spawn(
            write_loop(sink, outbound_rx, session.clone(), settings.heartbeat_interval())
                .in_current_span(),
        );

        // A takeover can close the session before the read loop starts.
        let reason = if closed.is_cancelled() || !lifecycle.advance(SessionPhase::Active) {
            AppError::ConnectionLost("closed before becoming active".into())
        } else {
            read_loop(stream, &agent_id, &state, settings.idle_timeout(), &closed).await
        };
        let was_active = lifecycle.phase() == SessionPhase::Active;
        lifecycle.advance(SessionPhase::Closed);

        closed.cancel();
        if let Err(err) = writer.await {
            warn!(%err, "writer task ended abnormally");
        }
        state.dispatcher.close_session(&session, &reason);
        debug!(was_active, %reason, "connection finished");
    }
    .instrument(span)
    .await;
}

/// Read frames until the peer goes away; returns why the loop ended.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    agent_id: &str,
    state: &AppState,
    idle_timeout: Duration,
    closed: &CancellationToken,
) -> AppError {
    loop {
        let next = tokio::select! {
            () = closed.cancelled() => {
                return AppError::ConnectionLost("connection closed by hub".into());
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        match next {
            Err(_) => {
                warn!(
                    idle_seconds = idle_timeout.as_secs(),
                    "no frames within idle timeout"
                );
                return AppError::ConnectionLost("idle timeout".into());
            }
            Ok(None) => return AppError::ConnectionLost("peer closed the stream".into()),
            Ok(Some(Err(err))) => {
                return AppError::ConnectionLost(format!("read error: {err}"));
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                state.dispatcher.handle_text(agent_id, text.as_str()).await;
            }
            Ok(Some(Ok(Message::Close(frame)))) => {
                debug!(?frame, "close frame received");
                return AppError::ConnectionLost("peer sent close".into());
            }
            Ok(Some(Ok(Message::Binary(_)))) => {
                debug!("binary frame ignored");
            }
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {
                trace!("heartbeat");
            }
        }
    }
}

/// Drain the outbound queue to the socket and ping on `heartbeat`.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    session: Session,
    heartbeat: Duration,
) {
    let closed = session.closed_token();
    let mut ping_interval = tokio::time::interval(heartbeat);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            () = closed.cancelled() => {
                let frame = if session.is_superseded() {
                    CloseFrame {
                        code: close_code::POLICY,
                        reason: "superseded by a newer connection".into(),
                    }
                } else {
                    CloseFrame {
                        code: close_code::NORMAL,
                        reason: "hub closing connection".into(),
                    }
                };
                if let Err(err) = sink.send(Message::Close(Some(frame))).await {
                    debug!(%err, "close frame not delivered");
                }
                break;
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(err) = sink.send(Message::Text(frame.into())).await {
                    warn!(%err, "socket write failed");
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if let Err(err) = sink.send(Message::Ping(Vec::<u8>::new().into())).await {
                    warn!(%err, "ping failed");
                    break;
                }
                trace!("ping sent");
            }
        }
    }

    // Stops the read loop when the write side failed first.
    session.close();
}
