//! Connection lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of one agent connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Upgrade accepted, not yet in the registry.
    Connecting,
    /// Registered under its agent id.
    Registered,
    /// Read loop running.
    Active,
    /// Torn down; terminal.
    Closed,
}

impl SessionPhase {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (SessionPhase::Connecting, SessionPhase::Registered)
                | (SessionPhase::Registered, SessionPhase::Active)
                | (
                    SessionPhase::Connecting | SessionPhase::Registered | SessionPhase::Active,
                    SessionPhase::Closed
                )
        )
    }

    /// Whether the phase is terminal.
    #[must_use]
    pub fn is_closed(self) -> bool {
        self == SessionPhase::Closed
    }
}
