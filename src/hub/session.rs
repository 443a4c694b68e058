//! Hub-side handle for one agent connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{AppError, Result};

/// Cheaply cloneable handle to a live agent connection.
///
/// Frames pushed through [`send`](Self::send) land in a bounded queue that
/// the connection's writer task drains; nothing else writes to the socket.
#[derive(Debug, Clone)]
pub struct Session {
    agent_id: Arc<str>,
    connection_id: Uuid,
    tx: mpsc::Sender<String>,
    closed: CancellationToken,
    superseded: Arc<AtomicBool>,
}

impl Session {
    /// Create a session and the receiving end of its outbound queue.
    #[must_use]
    pub fn new(agent_id: &str, queue_capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let session = Self {
            agent_id: Arc::from(agent_id),
            connection_id: Uuid::new_v4(),
            tx,
            closed: CancellationToken::new(),
            superseded: Arc::new(AtomicBool::new(false)),
        };
        (session, rx)
    }

    /// Agent identity supplied by the connecting party.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Identifier unique to this connection.
    #[must_use]
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Token cancelled when the connection must shut down.
    #[must_use]
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Whether the connection is shutting down or gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// Close the connection because a newer one took over its agent id.
    pub fn supersede(&self) {
        self.superseded.store(true, Ordering::Release);
        self.closed.cancel();
    }

    /// Whether [`supersede`](Self::supersede) was called.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }

    /// Close the connection.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Queue a serialized frame, waiting at most `timeout` for room.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Delivery` if the connection is closed or the
    /// queue stays full for the whole timeout.
    pub async fn send(&self, frame: String, timeout: Duration) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(AppError::Delivery(format!(
                "connection for {} is closed",
                self.agent_id
            )));
        }

        match self.tx.send_timeout(frame, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(AppError::Delivery(format!(
                "send to {} timed out after {}ms",
                self.agent_id,
                timeout.as_millis()
            ))),
            Err(SendTimeoutError::Closed(_)) => Err(AppError::Delivery(format!(
                "connection for {} is closed",
                self.agent_id
            ))),
        }
    }
}
