// Postgres-backed DocumentStore. One row per document in a single JSONB
// table; merge writes are read-modify-write under FOR UPDATE so concurrent
// mergers serialize per document.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::store::document::{self, Document};
use crate::store::lifecycle::{LifecycleHub, RouteEvent};
use crate::store::{BatchOp, DocumentStore, StoreError, WriteBatch, ROUTES};

const SELECT_FOR_UPDATE: &str =
    "SELECT doc FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE";
const UPSERT: &str = "INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3) \
     ON CONFLICT (collection, id) DO UPDATE SET doc = EXCLUDED.doc";
const DELETE: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING doc";

pub struct PgStore {
    pool: PgPool,
    hub: LifecycleHub,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig, hub: LifecycleHub) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool, hub })
    }

    pub fn new(pool: PgPool, hub: LifecycleHub) -> Self {
        Self { pool, hub }
    }

    /// Create the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (\
                collection TEXT NOT NULL,\
                id TEXT NOT NULL,\
                doc JSONB NOT NULL,\
                PRIMARY KEY (collection, id)\
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_locked(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(SELECT_FOR_UPDATE)
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.and_then(|r| r.try_get::<Value, _>("doc").ok()).and_then(value_to_doc))
    }

    async fn upsert(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
        id: &str,
        doc: &Document,
    ) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(doc.clone()))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Apply one batch op inside the transaction, returning a lifecycle event
    /// to emit after commit when the op touched the routes collection.
    async fn apply_op(
        tx: &mut Transaction<'_, Postgres>,
        op: BatchOp,
    ) -> Result<Option<RouteEvent>, StoreError> {
        match op {
            BatchOp::Set { collection, id, fields } => {
                let before = Self::fetch_locked(tx, &collection, &id).await?;
                let mut merged = before.clone().unwrap_or_default();
                document::deep_merge(&mut merged, &fields);
                Self::upsert(tx, &collection, &id, &merged).await?;

                Ok((collection == ROUTES).then(|| match before {
                    None => RouteEvent::created(&id, merged),
                    Some(before) => RouteEvent::updated(&id, before, merged),
                }))
            }
            BatchOp::Delete { collection, id } => {
                let row = sqlx::query(DELETE)
                    .bind(&collection)
                    .bind(&id)
                    .fetch_optional(&mut **tx)
                    .await?;
                let before =
                    row.and_then(|r| r.try_get::<Value, _>("doc").ok()).and_then(value_to_doc);

                Ok(match (collection.as_str(), before) {
                    (ROUTES, Some(before)) => Some(RouteEvent::deleted(&id, before)),
                    _ => None,
                })
            }
            BatchOp::Add { collection, fields } => {
                let id = Uuid::new_v4().to_string();
                Self::upsert(tx, &collection, &id, &fields).await?;
                Ok((collection == ROUTES).then(|| RouteEvent::created(&id, fields)))
            }
        }
    }

    async fn run_batch(&self, ops: Vec<BatchOp>) -> Result<Vec<RouteEvent>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut events = Vec::new();
        for op in ops {
            if let Some(event) = Self::apply_op(&mut tx, op).await? {
                events.push(event);
            }
        }
        tx.commit().await?;
        Ok(events)
    }
}

fn value_to_doc(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| r.try_get::<Value, _>("doc").ok()).and_then(value_to_doc))
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let events = self
            .run_batch(vec![BatchOp::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            }])
            .await?;
        for event in events {
            self.hub.emit(event);
        }
        Ok(())
    }

    async fn delete_field(
        &self,
        collection: &str,
        id: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(before) = Self::fetch_locked(&mut tx, collection, id).await? else {
            return Ok(());
        };
        let mut after = before.clone();
        if !document::remove_path(&mut after, path) {
            return Ok(());
        }
        Self::upsert(&mut tx, collection, id, &after).await?;
        tx.commit().await?;

        if collection == ROUTES {
            self.hub.emit(RouteEvent::updated(id, before, after));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let events = self
            .run_batch(vec![BatchOp::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            }])
            .await?;
        for event in events {
            self.hub.emit(event);
        }
        Ok(())
    }

    async fn add_new(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;
        Self::upsert(&mut tx, collection, &id, &fields).await?;
        tx.commit().await?;

        if collection == ROUTES {
            self.hub.emit(RouteEvent::created(&id, fields));
        }
        Ok(id)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let rows = sqlx::query("SELECT id, doc FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let id: String = r.try_get("id").ok()?;
                let doc = r.try_get::<Value, _>("doc").ok().and_then(value_to_doc)?;
                Some((id, doc))
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let events = self.run_batch(batch.ops).await?;
        for event in events {
            self.hub.emit(event);
        }
        Ok(())
    }
}
