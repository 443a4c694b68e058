//! Task identity and status.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Reported state of a routed task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Agent reported `task_complete`.
    Completed,
    /// Agent reported `task_error`.
    Failed,
}

/// Generates task identifiers unique for the lifetime of the process.
///
/// Ids have the form `task_<epoch>_<n>`, where `epoch` is the process
/// start in unix milliseconds and `n` is a counter starting at 1.
#[derive(Debug)]
pub struct TaskIdGenerator {
    epoch: i64,
    next: AtomicU64,
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::with_epoch(Utc::now().timestamp_millis())
    }
}

impl TaskIdGenerator {
    /// Generator seeded with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with a fixed epoch.
    #[must_use]
    pub fn with_epoch(epoch: i64) -> Self {
        Self {
            epoch,
            next: AtomicU64::new(1),
        }
    }

    /// Produce the next identifier.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("task_{}_{n}", self.epoch)
    }
}
