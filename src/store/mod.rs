//! Storage backends.
//!
//! Documents are self-describing JSON objects addressed by collection and id.
//! Two backends share one dispatch surface: the Postgres backend (one JSONB
//! table per collection) and the in-memory backend used as the development
//! fallback and the test substrate.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::schema::EntityKind;

/// A stored record: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Equality-only filter: a document matches when every listed field holds the
/// listed value. Empty filter matches all documents.
pub type Filter = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query modifiers for find operations.
///
/// `sort`, `limit`, and `skip` are applied by the backend; `select` and
/// `populate` are applied by the accessor after the fetch.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    /// Projection: keep only these fields (plus `id`).
    pub select: Option<Vec<String>>,
    /// Reference fields to expand into the referenced document.
    pub populate: Vec<String>,
}

impl FindOptions {
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn select(mut self, fields: Vec<String>) -> Self {
        self.select = Some(fields);
        self
    }

    pub fn populate(mut self, field: impl Into<String>) -> Self {
        self.populate.push(field.into());
        self
    }
}

/// Backend dispatch. Enum rather than a trait object so backend methods stay
/// plain async fns.
pub enum Store {
    Memory(MemoryStore),
    Postgres(PostgresStore),
}

impl Store {
    pub fn in_memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Store::Memory(_))
    }

    pub async fn find(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        match self {
            Store::Memory(store) => Ok(store.find(kind, filter, options)),
            Store::Postgres(store) => store.find(kind, filter, options).await,
        }
    }

    pub async fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Document>> {
        match self {
            Store::Memory(store) => Ok(store.find_by_id(kind, id)),
            Store::Postgres(store) => store.find_by_id(kind, id).await,
        }
    }

    pub async fn insert(&self, kind: EntityKind, doc: Document) -> Result<Document> {
        match self {
            Store::Memory(store) => Ok(store.insert(kind, doc)),
            Store::Postgres(store) => store.insert(kind, doc).await,
        }
    }

    pub async fn update_by_id(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &Document,
    ) -> Result<Option<Document>> {
        match self {
            Store::Memory(store) => Ok(store.update_by_id(kind, id, patch)),
            Store::Postgres(store) => store.update_by_id(kind, id, patch).await,
        }
    }

    pub async fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        patch: &Document,
    ) -> Result<u64> {
        match self {
            Store::Memory(store) => Ok(store.update_many(kind, filter, patch)),
            Store::Postgres(store) => store.update_many(kind, filter, patch).await,
        }
    }

    pub async fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => Ok(store.delete_by_id(kind, id)),
            Store::Postgres(store) => store.delete_by_id(kind, id).await,
        }
    }

    pub async fn delete_many(&self, kind: EntityKind, filter: &Filter) -> Result<u64> {
        match self {
            Store::Memory(store) => Ok(store.delete_many(kind, filter)),
            Store::Postgres(store) => store.delete_many(kind, filter).await,
        }
    }
}

// Pool handles are not Debug, so name the variant by hand.
impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Memory(_) => f.write_str("Store::Memory"),
            Store::Postgres(_) => f.write_str("Store::Postgres"),
        }
    }
}

pub(crate) fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(field, value)| doc.get(field) == Some(value))
}

/// Check if a string is a valid field identifier (alphanumeric + underscore)
pub(crate) fn is_valid_field(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;

    #[test]
    fn test_store_debug_names_variant() {
        let store = Store::in_memory();
        assert_eq!(format!("{:?}", store), "Store::Memory");
    }

    #[test]
    fn test_store_dispatches_to_memory_backend() {
        let store = Store::in_memory();
        let docs = tokio_test::block_on(store.find(
            EntityKind::User,
            &Filter::new(),
            &FindOptions::default(),
        ))
        .unwrap();
        assert!(docs.is_empty());
    }
}
