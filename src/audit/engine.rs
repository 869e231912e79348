// Audit Log Engine: turns route lifecycle events into immutable log entries.
//
// The engine owns no route state. It works only on the snapshots carried by
// the event, so it is safe under concurrent delivery and tolerates the route
// being deleted mid-processing. Redelivered events recompute the same diff;
// duplicate rows are possible and accepted.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::audit::diff::diff;
use crate::audit::fields::{project, Actor};
use crate::store::document::{str_field, Document};
use crate::store::lifecycle::{EventKind, LifecycleListener, RouteEvent};
use crate::store::{DocumentStore, ROUTE_LOGS};

pub struct AuditLogEngine {
    store: Arc<dyn DocumentStore>,
}

impl AuditLogEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Build the log entry for one event. Returns None when nothing should
    /// be written, which is the case for no-op updates.
    pub fn entry_for(event: &RouteEvent) -> Option<Document> {
        let empty = Document::new();
        let before = event.before.as_ref().unwrap_or(&empty);
        let after = event.after.as_ref().unwrap_or(&empty);

        let mut entry = Map::new();
        entry.insert("routeId".into(), Value::String(event.route_id.clone()));
        entry.insert("type".into(), Value::String(event.kind.as_str().into()));
        entry.insert("ts".into(), Value::String(Utc::now().to_rfc3339()));

        match event.kind {
            EventKind::Created => {
                for (field, value) in project(after) {
                    entry.insert(field, value);
                }
                entry.insert("actor".into(), Actor::from_doc(after).to_value());
            }
            EventKind::Updated => {
                let changes = diff(&project(before), &project(after));
                if changes.is_empty() {
                    return None;
                }
                entry.insert("routeKey".into(), Value::String(route_key(after, before)));
                entry.insert(
                    "changes".into(),
                    Value::Array(changes.iter().map(|c| c.to_value()).collect()),
                );
                entry.insert("actor".into(), Actor::from_doc(after).to_value());
            }
            EventKind::Deleted => {
                // The document no longer exists; only the before snapshot
                // is trustworthy.
                entry.insert("routeKey".into(), Value::String(route_key(before, &empty)));
                entry.insert("actor".into(), Actor::from_doc(before).to_value());
            }
        }

        Some(entry)
    }
}

fn route_key(primary: &Document, fallback: &Document) -> String {
    let key = str_field(primary, "routeKey");
    if key.is_empty() {
        str_field(fallback, "routeKey").to_string()
    } else {
        key.to_string()
    }
}

#[async_trait]
impl LifecycleListener for AuditLogEngine {
    fn name(&self) -> &'static str {
        "audit_log_engine"
    }

    async fn on_route_event(&self, event: &RouteEvent) -> anyhow::Result<()> {
        let Some(entry) = Self::entry_for(event) else {
            tracing::debug!(route_id = %event.route_id, "no-op update, skipping log entry");
            return Ok(());
        };

        let id = self.store.add_new(ROUTE_LOGS, entry).await?;
        tracing::debug!(
            route_id = %event.route_id,
            kind = event.kind.as_str(),
            log_id = %id,
            "route log entry appended"
        );
        Ok(())
    }
}
