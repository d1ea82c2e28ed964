//! Postgres-backed document store.
//!
//! One table per registered collection, `(id TEXT PRIMARY KEY, doc JSONB)`.
//! Equality filters map to JSONB containment, field merges to the `||`
//! operator. Table names come from the registry, never from caller input.

use super::{is_valid_field, Document, Filter, FindOptions, SortOrder};
use crate::error::{Result, StoreError};
use crate::schema::EntityKind;
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info};

const POOL_SIZE: usize = 10;

pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Connect, ping, and make sure every registered collection has a table.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url)?;

        let client = pool.get().await.map_err(|e| StoreError::ConnectionFailed {
            cause: e.to_string(),
        })?;

        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                cause: format!("Ping failed: {}", e),
            })?;

        for kind in EntityKind::ALL {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
                kind.collection()
            );
            client.batch_execute(&sql).await?;
        }

        info!("Connected to Postgres document store");

        Ok(Self { pool })
    }

    async fn client(&self) -> Result<deadpool_postgres::Client> {
        self.pool.get().await.map_err(|e| StoreError::ConnectionFailed {
            cause: e.to_string(),
        })
    }

    pub async fn find(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let mut sql = format!("SELECT doc FROM {} WHERE doc @> $1", kind.collection());

        if let Some((field, order)) = &options.sort {
            if !is_valid_field(field) {
                return Err(StoreError::Validation {
                    collection: kind.collection().to_string(),
                    message: format!("invalid sort field '{}'", field),
                });
            }
            sql.push_str(&order_clause(field, *order));
        }
        if let Some(skip) = options.skip {
            sql.push_str(&format!(" OFFSET {}", skip));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        debug!("find on {}: {}", kind.collection(), sql);

        let client = self.client().await?;
        let rows = client
            .query(&sql, &[&Value::Object(filter.clone())])
            .await?;

        rows.iter().map(|row| into_document(row.get(0))).collect()
    }

    pub async fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Document>> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", kind.collection());

        let client = self.client().await?;
        let row = client.query_opt(&sql, &[&id]).await?;

        row.map(|row| into_document(row.get(0))).transpose()
    }

    pub async fn insert(&self, kind: EntityKind, doc: Document) -> Result<Document> {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Internal("document has no id".to_string()))?
            .to_string();

        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", kind.collection());

        let client = self.client().await?;
        client
            .execute(&sql, &[&id, &Value::Object(doc.clone())])
            .await?;

        Ok(doc)
    }

    pub async fn update_by_id(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &Document,
    ) -> Result<Option<Document>> {
        let sql = format!(
            "UPDATE {} SET doc = doc || $2 WHERE id = $1 RETURNING doc",
            kind.collection()
        );

        let client = self.client().await?;
        let row = client
            .query_opt(&sql, &[&id, &Value::Object(patch.clone())])
            .await?;

        row.map(|row| into_document(row.get(0))).transpose()
    }

    pub async fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        patch: &Document,
    ) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET doc = doc || $2 WHERE doc @> $1",
            kind.collection()
        );

        let client = self.client().await?;
        let modified = client
            .execute(
                &sql,
                &[&Value::Object(filter.clone()), &Value::Object(patch.clone())],
            )
            .await?;

        Ok(modified)
    }

    pub async fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.collection());

        let client = self.client().await?;
        let deleted = client.execute(&sql, &[&id]).await?;

        Ok(deleted > 0)
    }

    pub async fn delete_many(&self, kind: EntityKind, filter: &Filter) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE doc @> $1", kind.collection());

        let client = self.client().await?;
        let deleted = client
            .execute(&sql, &[&Value::Object(filter.clone())])
            .await?;

        Ok(deleted)
    }
}

fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Internal(format!(
            "expected a JSON object in doc column, got {}",
            other
        ))),
    }
}

/// `->` keeps the jsonb value, so ordering is type-aware: numbers compare
/// numerically, matching the in-memory backend. `->>` would compare the text
/// rendering instead.
fn order_clause(field: &str, order: SortOrder) -> String {
    format!(" ORDER BY doc->'{}' {}", field, order.as_sql())
}

fn create_pool(database_url: &str) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: POOL_SIZE,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| StoreError::Internal(format!("Failed to create pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_compares_jsonb_values() {
        assert_eq!(order_clause("price", SortOrder::Asc), " ORDER BY doc->'price' ASC");
        assert_eq!(
            order_clause("viewCount", SortOrder::Desc),
            " ORDER BY doc->'viewCount' DESC"
        );
    }
}
