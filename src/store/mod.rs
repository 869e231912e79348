pub mod document;
pub mod lifecycle;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

pub use document::Document;

/// Collection names used by this service.
pub const ROUTES: &str = "routes";
pub const USERS: &str = "users";
pub const ROLES: &str = "roles";
pub const ROUTE_LOGS: &str = "route_logs";
pub const AUDIT: &str = "audit";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Set { collection: String, id: String, fields: Document },
    Delete { collection: String, id: String },
    Add { collection: String, fields: Document },
}

/// Atomic multi-document write: all operations commit together or none do.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    pub(crate) ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, collection: &str, id: &str, fields: Document) -> Self {
        self.ops.push(BatchOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(mut self, collection: &str, id: &str) -> Self {
        self.ops.push(BatchOp::Delete { collection: collection.to_string(), id: id.to_string() });
        self
    }

    pub fn add(mut self, collection: &str, fields: Document) -> Self {
        self.ops.push(BatchOp::Add { collection: collection.to_string(), fields });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Schemaless per-document storage.
///
/// Writes to the routes collection additionally emit a lifecycle event after
/// commit (see `lifecycle`); the caller never observes or waits on listeners.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Deep-merge `fields` into the document, creating it if absent.
    async fn set_merge(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    /// Remove a single (possibly nested, dot-separated) field.
    async fn delete_field(&self, collection: &str, id: &str, path: &str)
        -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Insert with an auto-generated id; returns the new id.
    async fn add_new(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// List all documents of a collection as (id, document) pairs.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
