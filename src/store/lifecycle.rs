// Document lifecycle notifications.
//
// Every committed write to the routes collection produces one RouteEvent
// carrying the before/after snapshots. Events are pushed onto an unbounded
// channel and consumed by a single dispatcher task; the originating request
// never waits on listeners. The memory store emits while still holding its
// write lock, so a document's transitions arrive in commit order; the
// Postgres store emits after the transaction commits, and two writers racing
// on one document can be observed out of order. Listeners therefore act only
// on the snapshots carried by the event. Listener failures are logged and
// dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::store::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        }
    }
}

/// One lifecycle transition of a route document.
///
/// `before` is absent on created, `after` is absent on deleted. Listeners
/// operate only on these snapshots and must never re-read the live document.
#[derive(Debug, Clone)]
pub struct RouteEvent {
    pub kind: EventKind,
    pub route_id: String,
    pub before: Option<Document>,
    pub after: Option<Document>,
}

impl RouteEvent {
    pub fn created(route_id: impl Into<String>, after: Document) -> Self {
        Self { kind: EventKind::Created, route_id: route_id.into(), before: None, after: Some(after) }
    }

    pub fn updated(route_id: impl Into<String>, before: Document, after: Document) -> Self {
        Self {
            kind: EventKind::Updated,
            route_id: route_id.into(),
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(route_id: impl Into<String>, before: Document) -> Self {
        Self { kind: EventKind::Deleted, route_id: route_id.into(), before: Some(before), after: None }
    }
}

/// A subscriber to route lifecycle events.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    /// Listener name for logging and debugging
    fn name(&self) -> &'static str;

    async fn on_route_event(&self, event: &RouteEvent) -> anyhow::Result<()>;
}

/// Sending half handed to store implementations.
#[derive(Clone)]
pub struct LifecycleHub {
    tx: mpsc::UnboundedSender<RouteEvent>,
}

impl LifecycleHub {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RouteEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget emission. A closed channel only means the process is
    /// shutting down; the write that triggered the event has already
    /// committed, so there is nothing to fail.
    pub fn emit(&self, event: RouteEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("lifecycle channel closed, dropping route event");
        }
    }
}

/// Consume events sequentially, invoking each listener in registration order.
pub fn spawn_dispatcher(
    mut rx: mpsc::UnboundedReceiver<RouteEvent>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            for listener in &listeners {
                if let Err(err) = listener.on_route_event(&event).await {
                    // Audit/notification failures are invisible to the
                    // request that caused the write.
                    tracing::error!(
                        listener = listener.name(),
                        route_id = %event.route_id,
                        kind = event.kind.as_str(),
                        "lifecycle listener failed: {err:#}"
                    );
                }
            }
        }
        tracing::debug!("lifecycle dispatcher stopped");
    })
}
