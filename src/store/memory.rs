// In-memory DocumentStore used by tests and local development. Emits the
// same lifecycle events as the Postgres store so the audit path is exercised
// identically.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::document::{self, Document};
use crate::store::lifecycle::{LifecycleHub, RouteEvent};
use crate::store::{BatchOp, DocumentStore, StoreError, WriteBatch, ROUTES};

pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    hub: LifecycleHub,
}

impl MemoryStore {
    pub fn new(hub: LifecycleHub) -> Self {
        Self { collections: RwLock::new(HashMap::new()), hub }
    }

    fn route_event_for_set(id: &str, before: Option<Document>, after: Document) -> RouteEvent {
        match before {
            None => RouteEvent::created(id, after),
            Some(before) => RouteEvent::updated(id, before, after),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let before = docs.get(id).cloned();
        let mut merged = before.clone().unwrap_or_default();
        document::deep_merge(&mut merged, &fields);
        docs.insert(id.to_string(), merged.clone());

        // Emit before releasing the lock so channel order matches commit
        // order for a given document. The send never blocks.
        if collection == ROUTES {
            self.hub.emit(Self::route_event_for_set(id, before, merged));
        }
        Ok(())
    }

    async fn delete_field(
        &self,
        collection: &str,
        id: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else { return Ok(()) };
        let Some(doc) = docs.get_mut(id) else { return Ok(()) };
        let before = doc.clone();
        if !document::remove_path(doc, path) {
            return Ok(());
        }
        let after = doc.clone();

        if collection == ROUTES {
            self.hub.emit(RouteEvent::updated(id, before, after));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections.get_mut(collection).and_then(|docs| docs.remove(id));

        if let (ROUTES, Some(before)) = (collection, removed) {
            self.hub.emit(RouteEvent::deleted(id, before));
        }
        Ok(())
    }

    async fn add_new(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields.clone());

        if collection == ROUTES {
            self.hub.emit(RouteEvent::created(&id, fields));
        }
        Ok(id)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // Single write lock makes the whole batch atomic.
        let mut collections = self.collections.write().await;
        let mut events = Vec::new();

        for op in batch.ops {
            match op {
                BatchOp::Set { collection, id, fields } => {
                    let docs = collections.entry(collection.clone()).or_default();
                    let before = docs.get(&id).cloned();
                    let mut merged = before.clone().unwrap_or_default();
                    document::deep_merge(&mut merged, &fields);
                    docs.insert(id.clone(), merged.clone());
                    if collection == ROUTES {
                        events.push(Self::route_event_for_set(&id, before, merged));
                    }
                }
                BatchOp::Delete { collection, id } => {
                    let removed = collections.get_mut(&collection).and_then(|docs| docs.remove(&id));
                    if let (true, Some(before)) = (collection == ROUTES, removed) {
                        events.push(RouteEvent::deleted(&id, before));
                    }
                }
                BatchOp::Add { collection, fields } => {
                    let id = Uuid::new_v4().to_string();
                    collections
                        .entry(collection.clone())
                        .or_default()
                        .insert(id.clone(), fields.clone());
                    if collection == ROUTES {
                        events.push(RouteEvent::created(&id, fields));
                    }
                }
            }
        }
        for event in events {
            self.hub.emit(event);
        }
        Ok(())
    }
}
