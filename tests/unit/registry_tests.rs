//! Connection registry bookkeeping.

use std::sync::Arc;

use agent_hub::hub::{ConnectionRegistry, Session};

fn session(agent_id: &str) -> Session {
    let (session, _rx) = Session::new(agent_id, 8);
    session
}

#[test]
fn lookup_returns_most_recent_registration() {
    let registry = ConnectionRegistry::new();
    let first = session("a");
    let second = session("a");

    assert!(registry.register("a", first.clone()).is_none());
    let replaced = registry.register("a", second.clone()).expect("previous session");

    assert_eq!(replaced.connection_id(), first.connection_id());
    let current = registry.lookup("a").expect("registered");
    assert_eq!(current.connection_id(), second.connection_id());
}

#[test]
fn lookup_after_unregister_is_not_found() {
    let registry = ConnectionRegistry::new();
    registry.register("a", session("a"));

    assert!(registry.unregister("a").is_some());
    assert!(registry.lookup("a").is_none());
}

#[test]
fn unregister_unknown_is_noop() {
    let registry = ConnectionRegistry::new();
    assert!(registry.unregister("ghost").is_none());
    assert!(registry.list_agents().is_empty());
}

#[test]
fn lookup_unknown_is_not_found() {
    let registry = ConnectionRegistry::new();
    assert!(registry.lookup("nobody").is_none());
}

#[test]
fn list_agents_is_a_snapshot_of_keys() {
    let registry = ConnectionRegistry::new();
    registry.register("b", session("b"));
    registry.register("a", session("a"));

    let agents: Vec<String> = registry.list_agents().into_iter().collect();
    assert_eq!(agents, vec!["a", "b"]);
}

#[test]
fn list_pending_unknown_agent_is_empty() {
    let registry = ConnectionRegistry::new();
    assert!(registry.list_pending("nobody").is_empty());
}

#[test]
fn pending_preserves_insertion_order() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());

    assert!(registry.track_pending("a", a.connection_id(), "t1"));
    assert!(registry.track_pending("a", a.connection_id(), "t2"));
    assert!(registry.track_pending("a", a.connection_id(), "t3"));

    assert!(registry.remove_pending("a", "t2"));
    assert_eq!(registry.list_pending("a"), vec!["t1", "t3"]);
}

#[test]
fn remove_pending_absent_is_noop() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());
    registry.track_pending("a", a.connection_id(), "t1");

    assert!(!registry.remove_pending("a", "t9"));
    assert!(!registry.remove_pending("ghost", "t1"));
    assert_eq!(registry.list_pending("a"), vec!["t1"]);
}

#[test]
fn track_pending_rejects_stale_connection() {
    let registry = ConnectionRegistry::new();
    let old = session("a");
    registry.register("a", old.clone());
    registry.register("a", session("a"));

    assert!(!registry.track_pending("a", old.connection_id(), "t1"));
    assert!(registry.list_pending("a").is_empty());
}

#[test]
fn reregister_starts_with_empty_pending() {
    let registry = ConnectionRegistry::new();
    let old = session("a");
    registry.register("a", old.clone());
    registry.track_pending("a", old.connection_id(), "t1");

    registry.register("a", session("a"));

    assert!(registry.list_pending("a").is_empty());
}

#[test]
fn unregister_connection_ignores_superseded_connection() {
    let registry = ConnectionRegistry::new();
    let old = session("a");
    let new = session("a");
    registry.register("a", old.clone());
    registry.register("a", new.clone());

    assert!(!registry.unregister_connection("a", old.connection_id()));
    assert_eq!(
        registry.lookup("a").map(|s| s.connection_id()),
        Some(new.connection_id())
    );

    assert!(registry.unregister_connection("a", new.connection_id()));
    assert!(registry.lookup("a").is_none());
}

#[test]
fn unregister_moves_pending_to_abandoned() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());
    registry.track_pending("a", a.connection_id(), "t1");
    registry.track_pending("a", a.connection_id(), "t2");

    registry.unregister_connection("a", a.connection_id());

    let snapshot = registry.snapshot();
    assert!(snapshot.agents.is_empty());
    assert!(snapshot.tasks.is_empty());
    assert_eq!(
        snapshot.abandoned.get("a").cloned(),
        Some(vec!["t1".to_owned(), "t2".to_owned()])
    );
}

#[test]
fn fresh_register_clears_abandoned() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());
    registry.track_pending("a", a.connection_id(), "t1");
    registry.unregister("a");

    registry.register("a", session("a"));

    assert!(registry.snapshot().abandoned.is_empty());
}

#[test]
fn forget_task_clears_pending_or_abandoned() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());
    registry.track_pending("a", a.connection_id(), "t1");
    registry.track_pending("a", a.connection_id(), "t2");

    assert!(registry.forget_task("a", "t1"));
    assert_eq!(registry.list_pending("a"), vec!["t2".to_owned()]);

    registry.unregister("a");
    assert!(registry.forget_task("a", "t2"));
    assert!(
        registry.snapshot().abandoned.is_empty(),
        "emptied abandoned list is dropped"
    );
    assert!(!registry.forget_task("a", "t2"));
}

#[test]
fn snapshot_reports_tasks_and_statuses() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    let b = session("b");
    registry.register("a", a.clone());
    registry.register("b", b.clone());
    registry.track_pending("b", b.connection_id(), "t1");
    registry.set_status("a", "ready");
    registry.set_status("ghost", "ignored");

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.agents, vec!["a", "b"]);
    assert_eq!(snapshot.tasks.get("a").cloned(), Some(Vec::new()));
    assert_eq!(snapshot.tasks.get("b").cloned(), Some(vec!["t1".to_owned()]));
    assert_eq!(snapshot.statuses.get("a").map(String::as_str), Some("ready"));
    assert!(!snapshot.statuses.contains_key("b"));
    assert!(!snapshot.statuses.contains_key("ghost"));
}

#[test]
fn snapshot_serializes_status_surface_shape() {
    let registry = ConnectionRegistry::new();
    let a = session("a");
    registry.register("a", a.clone());
    registry.track_pending("a", a.connection_id(), "t1");

    let value = serde_json::to_value(registry.snapshot()).expect("serialize");
    assert_eq!(value["agents"], serde_json::json!(["a"]));
    assert_eq!(value["tasks"], serde_json::json!({"a": ["t1"]}));
}

#[test]
fn concurrent_register_unregister_keeps_registry_consistent() {
    let registry = Arc::new(ConnectionRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let agent_id = format!("agent-{worker}");
                for _ in 0..200 {
                    let (session, _rx) = Session::new(&agent_id, 1);
                    registry.register(&agent_id, session.clone());
                    let _ = registry.sessions();
                    registry.unregister_connection(&agent_id, session.connection_id());
                }
                let (session, _rx) = Session::new(&agent_id, 1);
                registry.register(&agent_id, session);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread");
    }

    assert_eq!(registry.list_agents().len(), 8);
    assert_eq!(registry.sessions().len(), 8);
}
