// End-to-end audit path: route writes against the MemoryStore flow through
// the lifecycle dispatcher and land as route_logs entries.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use route_approval_api::audit::AuditLogEngine;
use route_approval_api::store::document::Document;
use route_approval_api::store::lifecycle::{
    self, EventKind, LifecycleHub, LifecycleListener, RouteEvent,
};
use route_approval_api::store::memory::MemoryStore;
use route_approval_api::store::{DocumentStore, ROUTES, USERS};

use common::{settle_logs, wait_for_logs};

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

/// MemoryStore with the audit engine listening, no HTTP layer.
fn audited_store() -> Arc<MemoryStore> {
    let (hub, events) = LifecycleHub::channel();
    let store = Arc::new(MemoryStore::new(hub));
    let engine = Arc::new(AuditLogEngine::new(store.clone() as Arc<dyn DocumentStore>));
    lifecycle::spawn_dispatcher(events, vec![engine as Arc<dyn LifecycleListener>]);
    store
}

#[tokio::test]
async fn creating_a_route_appends_a_created_entry() {
    let store = audited_store();

    store
        .set_merge(
            ROUTES,
            "r1",
            doc(json!({
                "routeKey": "KL-0123456789",
                "hub": "H1",
                "fromCode": "KYV",
                "updatedByUid": "u1",
                "updatedByEmail": "u1@example.com",
            })),
        )
        .await
        .unwrap();

    let logs = wait_for_logs(&store, 1).await;
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry["type"], "created");
    assert_eq!(entry["routeId"], "r1");
    assert_eq!(entry["routeKey"], "KL-0123456789");
    assert_eq!(entry["hub"], "H1");
    assert_eq!(entry["fromCode"], "KYV");
    // Untouched tracked fields are projected as blanks
    assert_eq!(entry["toCode"], "");
    assert_eq!(entry["actor"]["updatedByUid"], "u1");
    assert_eq!(entry["actor"]["updatedByEmail"], "u1@example.com");
    assert!(entry.get("changes").is_none());
}

#[tokio::test]
async fn updated_at_only_write_is_not_logged() {
    let store = audited_store();

    store
        .set_merge(ROUTES, "r1", doc(json!({ "hub": "H1", "updatedAt": "2026-01-01T00:00:00Z" })))
        .await
        .unwrap();
    wait_for_logs(&store, 1).await;

    store
        .set_merge(ROUTES, "r1", doc(json!({ "updatedAt": "2026-02-01T00:00:00Z" })))
        .await
        .unwrap();

    let logs = settle_logs(&store).await;
    assert_eq!(logs.len(), 1, "timestamp churn must not produce entries");
}

#[tokio::test]
async fn field_change_is_logged_with_old_and_new_values() {
    let store = audited_store();

    store
        .set_merge(
            ROUTES,
            "r1",
            doc(json!({ "routeKey": "AB-0000000001", "hub": "H1", "updatedByUid": "u1" })),
        )
        .await
        .unwrap();
    wait_for_logs(&store, 1).await;

    store
        .set_merge(ROUTES, "r1", doc(json!({ "hub": "H2", "updatedByUid": "u2" })))
        .await
        .unwrap();

    let logs = wait_for_logs(&store, 2).await;
    let entry = logs
        .iter()
        .find(|e| e["type"] == "updated")
        .expect("updated entry");

    assert_eq!(entry["routeKey"], "AB-0000000001");
    assert_eq!(entry["actor"]["updatedByUid"], "u2");

    let changes = entry["changes"].as_array().unwrap();
    let hub_change = changes.iter().find(|c| c["field"] == "hub").expect("hub change");
    assert_eq!(hub_change["was"], "H1");
    assert_eq!(hub_change["now"], "H2");
}

#[tokio::test]
async fn approval_status_change_is_logged_under_the_status_field() {
    let store = audited_store();

    store
        .set_merge(ROUTES, "r1", doc(json!({ "approval": { "status": "pending" } })))
        .await
        .unwrap();
    wait_for_logs(&store, 1).await;

    store
        .set_merge(ROUTES, "r1", doc(json!({ "approval": { "status": "approved" } })))
        .await
        .unwrap();

    let logs = wait_for_logs(&store, 2).await;
    let entry = logs
        .iter()
        .find(|e| e["type"] == "updated")
        .expect("updated entry");
    let changes = entry["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field"], "status");
    assert_eq!(changes[0]["was"], "pending");
    assert_eq!(changes[0]["now"], "approved");
}

#[tokio::test]
async fn deleting_a_route_appends_a_deleted_entry() {
    let store = audited_store();

    store
        .set_merge(
            ROUTES,
            "r1",
            doc(json!({ "routeKey": "CD-1234567890", "updatedByUid": "u1" })),
        )
        .await
        .unwrap();
    wait_for_logs(&store, 1).await;

    store.delete(ROUTES, "r1").await.unwrap();

    let logs = wait_for_logs(&store, 2).await;
    let entry = logs
        .iter()
        .find(|e| e["type"] == "deleted")
        .expect("deleted entry");
    assert_eq!(entry["routeId"], "r1");
    assert_eq!(entry["routeKey"], "CD-1234567890");
    assert_eq!(entry["actor"]["updatedByUid"], "u1");
    assert!(entry.get("changes").is_none());
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<(String, EventKind)>>,
}

#[async_trait]
impl LifecycleListener for RecordingListener {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn on_route_event(&self, event: &RouteEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push((event.route_id.clone(), event.kind));
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_are_observed_created_before_updated() {
    let (hub, events) = LifecycleHub::channel();
    let store = Arc::new(MemoryStore::new(hub));
    let listener = Arc::new(RecordingListener::default());
    lifecycle::spawn_dispatcher(events, vec![listener.clone() as Arc<dyn LifecycleListener>]);

    // Two racing merges per fresh document: one commits as created, the
    // other as updated, and the channel must preserve that order.
    let docs = 200;
    let mut handles = Vec::new();
    for i in 0..docs {
        for hub_name in ["H1", "H2"] {
            let store = store.clone();
            let id = format!("r{i}");
            let patch = doc(json!({ "hub": hub_name }));
            handles.push(tokio::spawn(async move {
                store.set_merge(ROUTES, &id, patch).await.unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for _ in 0..200 {
        if listener.events.lock().unwrap().len() == docs * 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let observed = listener.events.lock().unwrap();
    assert_eq!(observed.len(), docs * 2);

    let mut created: HashSet<&str> = HashSet::new();
    for (id, kind) in observed.iter() {
        match kind {
            EventKind::Created => {
                assert!(created.insert(id), "duplicate created for {id}");
            }
            EventKind::Updated => {
                assert!(created.contains(id.as_str()), "updated before created for {id}");
            }
            EventKind::Deleted => panic!("unexpected deleted event for {id}"),
        }
    }
    assert_eq!(created.len(), docs);
}

#[tokio::test]
async fn writes_to_other_collections_are_ignored() {
    let store = audited_store();

    store
        .set_merge(USERS, "u1", doc(json!({ "role": "admin" })))
        .await
        .unwrap();
    store.delete(USERS, "u1").await.unwrap();

    assert!(settle_logs(&store).await.is_empty());
}
