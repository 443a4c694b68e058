//! Connection registry: live agents and their pending tasks.
//!
//! A single `std::sync::Mutex` guards the map. No lock is held across an
//! await point; callers clone [`Session`] handles out before sending.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::session::Session;

#[derive(Debug)]
struct AgentEntry {
    session: Session,
    pending: Vec<String>,
    status: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    agents: HashMap<String, AgentEntry>,
    abandoned: HashMap<String, Vec<String>>,
}

/// Point-in-time view returned by the status surface.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Registered agent ids.
    pub agents: Vec<String>,
    /// Pending task ids per registered agent.
    pub tasks: BTreeMap<String, Vec<String>>,
    /// Last reported status per registered agent.
    pub statuses: BTreeMap<String, String>,
    /// Pending task ids left behind by agents that disconnected.
    pub abandoned: BTreeMap<String, Vec<String>>,
}

/// Authoritative map of live agents.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the session for `agent_id` with an empty pending list.
    ///
    /// Returns the superseded session, if any. Closing it is the caller's
    /// decision.
    pub fn register(&self, agent_id: &str, session: Session) -> Option<Session> {
        let mut inner = self.lock();
        inner.abandoned.remove(agent_id);
        let previous = inner.agents.insert(
            agent_id.to_owned(),
            AgentEntry {
                session,
                pending: Vec::new(),
                status: None,
            },
        );
        drop(inner);

        match previous {
            Some(entry) => {
                info!(
                    agent_id,
                    dropped_pending = entry.pending.len(),
                    "agent re-registered; previous session replaced"
                );
                Some(entry.session)
            }
            None => {
                info!(agent_id, "agent registered");
                None
            }
        }
    }

    /// Remove `agent_id` regardless of which connection owns it.
    ///
    /// Its pending tasks are kept as abandoned. No-op if absent.
    pub fn unregister(&self, agent_id: &str) -> Option<Session> {
        let mut inner = self.lock();
        let entry = inner.agents.remove(agent_id)?;
        Self::abandon(&mut inner, agent_id, entry.pending);
        drop(inner);
        info!(agent_id, "agent unregistered");
        Some(entry.session)
    }

    /// Remove `agent_id` only while it is still owned by `connection_id`.
    ///
    /// A superseded connection tearing down must not evict its successor.
    pub fn unregister_connection(&self, agent_id: &str, connection_id: Uuid) -> bool {
        let mut inner = self.lock();
        let owned = inner
            .agents
            .get(agent_id)
            .is_some_and(|entry| entry.session.connection_id() == connection_id);
        if !owned {
            debug!(agent_id, %connection_id, "stale connection; registry entry left in place");
            return false;
        }
        if let Some(entry) = inner.agents.remove(agent_id) {
            Self::abandon(&mut inner, agent_id, entry.pending);
        }
        drop(inner);
        info!(agent_id, %connection_id, "agent unregistered");
        true
    }

    fn abandon(inner: &mut RegistryInner, agent_id: &str, pending: Vec<String>) {
        if pending.is_empty() {
            return;
        }
        info!(agent_id, count = pending.len(), "pending tasks abandoned");
        inner
            .abandoned
            .entry(agent_id.to_owned())
            .or_default()
            .extend(pending);
    }

    /// Session currently registered for `agent_id`.
    #[must_use]
    pub fn lookup(&self, agent_id: &str) -> Option<Session> {
        self.lock()
            .agents
            .get(agent_id)
            .map(|entry| entry.session.clone())
    }

    /// Ids of all registered agents.
    #[must_use]
    pub fn list_agents(&self) -> BTreeSet<String> {
        self.lock().agents.keys().cloned().collect()
    }

    /// Pending task ids for `agent_id`, oldest first; empty if unknown.
    #[must_use]
    pub fn list_pending(&self, agent_id: &str) -> Vec<String> {
        self.lock()
            .agents
            .get(agent_id)
            .map(|entry| entry.pending.clone())
            .unwrap_or_default()
    }

    /// Clones of every registered session.
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        self.lock()
            .agents
            .values()
            .map(|entry| entry.session.clone())
            .collect()
    }

    /// Append `task_id` to the pending list of `agent_id`, provided the
    /// entry still belongs to `connection_id`.
    pub fn track_pending(&self, agent_id: &str, connection_id: Uuid, task_id: &str) -> bool {
        let mut inner = self.lock();
        match inner.agents.get_mut(agent_id) {
            Some(entry) if entry.session.connection_id() == connection_id => {
                entry.pending.push(task_id.to_owned());
                true
            }
            _ => false,
        }
    }

    /// Remove `task_id` from the pending list of `agent_id`.
    ///
    /// Returns whether the id was present.
    pub fn remove_pending(&self, agent_id: &str, task_id: &str) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.agents.get_mut(agent_id) else {
            return false;
        };
        match entry.pending.iter().position(|id| id == task_id) {
            Some(index) => {
                entry.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every trace of `task_id` for `agent_id`, pending or abandoned.
    ///
    /// Used when a routed task turns out never to have been delivered.
    /// Returns whether anything was removed.
    pub fn forget_task(&self, agent_id: &str, task_id: &str) -> bool {
        let mut inner = self.lock();
        if let Some(entry) = inner.agents.get_mut(agent_id) {
            if let Some(index) = entry.pending.iter().position(|id| id == task_id) {
                entry.pending.remove(index);
                return true;
            }
        }
        let Some(abandoned) = inner.abandoned.get_mut(agent_id) else {
            return false;
        };
        let Some(index) = abandoned.iter().position(|id| id == task_id) else {
            return false;
        };
        abandoned.remove(index);
        if abandoned.is_empty() {
            inner.abandoned.remove(agent_id);
        }
        true
    }

    /// Record the last status reported by `agent_id`.
    pub fn set_status(&self, agent_id: &str, status: &str) {
        if let Some(entry) = self.lock().agents.get_mut(agent_id) {
            entry.status = Some(status.to_owned());
        }
    }

    /// Consistent snapshot of agents, pending, statuses and abandoned tasks.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.lock();
        let mut snapshot = RegistrySnapshot::default();
        for (agent_id, entry) in &inner.agents {
            snapshot.agents.push(agent_id.clone());
            snapshot
                .tasks
                .insert(agent_id.clone(), entry.pending.clone());
            if let Some(status) = &entry.status {
                snapshot.statuses.insert(agent_id.clone(), status.clone());
            }
        }
        snapshot.agents.sort();
        snapshot.abandoned = inner
            .abandoned
            .iter()
            .map(|(agent_id, tasks)| (agent_id.clone(), tasks.clone()))
            .collect();
        snapshot
    }
}
