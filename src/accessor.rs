//! Generic Collection Accessor
//!
//! Name-indexed CRUD against any registered schema. Collection names resolve
//! through the registry; unknown names fail with `SchemaNotFound` on every
//! operation. Inserts assign an id and creation/update stamps, every write
//! refreshes `updatedAt`.

use crate::error::{Result, StoreError};
use crate::schema::{self, EntityKind, FieldType};
use crate::store::{Document, Filter, FindOptions, Store};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct Collections {
    store: Arc<Store>,
}

impl Collections {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    fn kind(&self, collection: &str) -> Result<EntityKind> {
        EntityKind::resolve(collection).ok_or_else(|| StoreError::SchemaNotFound {
            name: collection.to_string(),
        })
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let kind = self.kind(collection)?;
        let mut docs = self.store.find(kind, filter, &options).await?;

        for field in &options.populate {
            self.populate(kind, &mut docs, field).await?;
        }

        if let Some(fields) = &options.select {
            for doc in &mut docs {
                project(doc, fields);
            }
        }

        Ok(docs)
    }

    pub async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let docs = self
            .find(collection, filter, FindOptions::default().limit(1))
            .await?;
        Ok(docs.into_iter().next())
    }

    pub async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let kind = self.kind(collection)?;
        self.store.find_by_id(kind, id).await
    }

    /// Validate, stamp, and store a new document. Returns the stored document
    /// with its generated id and timestamps.
    pub async fn insert_one(&self, collection: &str, doc: Document) -> Result<Document> {
        let kind = self.kind(collection)?;
        let mut doc = schema::prepare_insert(kind, doc)?;

        self.check_unique(kind, &doc).await?;

        let now = serde_json::to_value(Utc::now())?;
        doc.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        doc.insert("createdAt".to_string(), now.clone());
        doc.insert("updatedAt".to_string(), now);

        debug!("inserting into {}", kind.collection());
        self.store.insert(kind, doc).await
    }

    pub async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let mut stored = Vec::with_capacity(docs.len());
        for doc in docs {
            stored.push(self.insert_one(collection, doc).await?);
        }
        Ok(stored)
    }

    /// Field-level merge on the identified document. Returns the updated
    /// document, or None if no document has that id.
    pub async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>> {
        let kind = self.kind(collection)?;
        let patch = self.stamped_patch(kind, patch)?;
        if patch_touches_unique(kind, &patch) {
            self.check_unique_on_update(kind, &patch, &[id.to_string()])
                .await?;
        }
        self.store.update_by_id(kind, id, &patch).await
    }

    /// Field-level merge on every matching document. Returns the modified count.
    pub async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> Result<u64> {
        let kind = self.kind(collection)?;
        let patch = self.stamped_patch(kind, patch)?;
        if patch_touches_unique(kind, &patch) {
            let matched = self.store.find(kind, filter, &FindOptions::default()).await?;
            if matched.len() > 1 {
                return Err(StoreError::Validation {
                    collection: kind.collection().to_string(),
                    message: "update would assign one unique value to multiple documents"
                        .to_string(),
                });
            }
            let ids: Vec<String> = matched
                .iter()
                .filter_map(|doc| doc.get("id").and_then(Value::as_str).map(str::to_string))
                .collect();
            self.check_unique_on_update(kind, &patch, &ids).await?;
        }
        self.store.update_many(kind, filter, &patch).await
    }

    pub async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let kind = self.kind(collection)?;
        self.store.delete_by_id(kind, id).await
    }

    pub async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let kind = self.kind(collection)?;
        self.store.delete_many(kind, filter).await
    }

    fn stamped_patch(&self, kind: EntityKind, mut patch: Document) -> Result<Document> {
        schema::validate_patch(kind, &patch)?;
        patch.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);
        Ok(patch)
    }

    async fn check_unique(&self, kind: EntityKind, doc: &Document) -> Result<()> {
        for field in kind.descriptor().fields.iter().filter(|f| f.unique) {
            let value = match doc.get(field.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };

            let mut filter = Filter::new();
            filter.insert(field.name.to_string(), value.clone());

            if self.find_one(kind.collection(), &filter).await?.is_some() {
                return Err(StoreError::Validation {
                    collection: kind.collection().to_string(),
                    message: format!("value for unique field '{}' is already taken", field.name),
                });
            }
        }
        Ok(())
    }

    /// Uniqueness holds across updates too: a patch may not take a unique
    /// value already held by a document outside `exclude`.
    async fn check_unique_on_update(
        &self,
        kind: EntityKind,
        patch: &Document,
        exclude: &[String],
    ) -> Result<()> {
        for field in kind.descriptor().fields.iter().filter(|f| f.unique) {
            let value = match patch.get(field.name) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };

            let mut filter = Filter::new();
            filter.insert(field.name.to_string(), value.clone());

            if let Some(existing) = self.find_one(kind.collection(), &filter).await? {
                let holder = existing.get("id").and_then(Value::as_str).unwrap_or_default();
                if !exclude.iter().any(|id| id == holder) {
                    return Err(StoreError::Validation {
                        collection: kind.collection().to_string(),
                        message: format!(
                            "value for unique field '{}' is already taken",
                            field.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace a reference field with the referenced document. Values that do
    /// not resolve are left as-is.
    async fn populate(
        &self,
        kind: EntityKind,
        docs: &mut [Document],
        field: &str,
    ) -> Result<()> {
        let spec = match kind.descriptor().field(field) {
            Some(spec) if spec.ty == FieldType::Reference => spec,
            _ => return Ok(()),
        };
        let target = match spec.reference {
            Some(target) => target,
            None => return Ok(()),
        };

        for doc in docs.iter_mut() {
            let id = match doc.get(field).and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => continue,
            };

            if let Some(referenced) = self.store.find_by_id(target, &id).await? {
                doc.insert(field.to_string(), Value::Object(referenced));
            }
        }

        Ok(())
    }
}

fn patch_touches_unique(kind: EntityKind, patch: &Document) -> bool {
    kind.descriptor()
        .fields
        .iter()
        .any(|f| f.unique && patch.contains_key(f.name))
}

fn project(doc: &mut Document, fields: &[String]) {
    doc.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collections() -> Collections {
        Collections::new(Arc::new(Store::in_memory()))
    }

    fn doc(value: serde_json::Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn insert_user(c: &Collections, username: &str) -> Document {
        c.insert_one(
            "users",
            doc(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "hash"
            })),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_collection_fails_everywhere() {
        let c = collections();
        let empty = Filter::new();

        assert!(matches!(
            c.find("sessions", &empty, FindOptions::default()).await,
            Err(StoreError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            c.insert_one("sessions", Document::new()).await,
            Err(StoreError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            c.update_many("sessions", &empty, Document::new()).await,
            Err(StoreError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            c.delete_many("sessions", &empty).await,
            Err(StoreError::SchemaNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_stamps_and_defaults() {
        let c = collections();
        let stored = insert_user(&c, "ada").await;

        assert!(stored["id"].as_str().is_some());
        assert_eq!(stored["role"], json!("user"));
        assert!(stored["createdAt"].as_str().is_some());
        assert_eq!(stored["createdAt"], stored["updatedAt"]);
    }

    #[tokio::test]
    async fn test_unique_username_enforced() {
        let c = collections();
        insert_user(&c, "ada").await;

        let err = c
            .insert_one(
                "users",
                doc(json!({
                    "username": "ada",
                    "email": "other@example.com",
                    "password": "hash"
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_update_cannot_take_existing_username() {
        let c = collections();
        insert_user(&c, "ada").await;
        let grace = insert_user(&c, "grace").await;
        let grace_id = grace["id"].as_str().unwrap();

        let err = c
            .update_by_id("users", grace_id, doc(json!({"username": "ada"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));

        let mut filter = Filter::new();
        filter.insert("username".into(), json!("grace"));
        let err = c
            .update_many("users", &filter, doc(json!({"username": "ada"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));

        // the taken name still belongs to exactly one document
        let mut filter = Filter::new();
        filter.insert("username".into(), json!("ada"));
        let holders = c.find("users", &filter, FindOptions::default()).await.unwrap();
        assert_eq!(holders.len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeping_own_unique_value_is_allowed() {
        let c = collections();
        let grace = insert_user(&c, "grace").await;
        let grace_id = grace["id"].as_str().unwrap();

        let updated = c
            .update_by_id(
                "users",
                grace_id,
                doc(json!({"username": "grace", "bio": "engineer"})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["bio"], json!("engineer"));
    }

    #[tokio::test]
    async fn test_update_many_rejects_unique_value_fanout() {
        let c = collections();
        insert_user(&c, "ada").await;
        insert_user(&c, "grace").await;

        // empty filter matches both, which would leave them sharing one email
        let err = c
            .update_many(
                "users",
                &Filter::new(),
                doc(json!({"email": "shared@example.com"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_insert_many_and_id_lookup() {
        let c = collections();

        let stored = c
            .insert_many(
                "products",
                vec![
                    doc(json!({"name": "candles", "description": "beeswax", "price": 900, "category": "home"})),
                    doc(json!({"name": "incense", "description": "sandalwood", "price": 450, "category": "home"})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);

        let id = stored[0]["id"].as_str().unwrap();
        let found = c.find_by_id("products", id).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("candles"));

        assert!(c.delete_by_id("products", id).await.unwrap());
        assert!(c.find_by_id("products", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let c = collections();
        let stored = insert_user(&c, "ada").await;
        let id = stored["id"].as_str().unwrap();

        let updated = c
            .update_by_id("users", id, doc(json!({"bio": "mathematician"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["bio"], json!("mathematician"));
        assert_eq!(updated["username"], json!("ada"));
        assert_ne!(updated["updatedAt"], updated["createdAt"]);
    }

    #[tokio::test]
    async fn test_projection_keeps_id() {
        let c = collections();
        insert_user(&c, "ada").await;

        let found = c
            .find(
                "users",
                &Filter::new(),
                FindOptions::default().select(vec!["username".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert!(found[0].contains_key("id"));
        assert!(found[0].contains_key("username"));
        assert!(!found[0].contains_key("email"));
    }

    #[tokio::test]
    async fn test_populate_expands_reference() {
        let c = collections();
        let client = insert_user(&c, "client").await;
        let reader = insert_user(&c, "reader").await;

        c.insert_one(
            "readings",
            doc(json!({
                "clientId": client["id"],
                "readerId": reader["id"],
                "type": "chat"
            })),
        )
        .await
        .unwrap();

        let found = c
            .find(
                "readings",
                &Filter::new(),
                FindOptions::default().populate("readerId"),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        let expanded = found[0]["readerId"].as_object().unwrap();
        assert_eq!(expanded["username"], json!("reader"));
        // untouched reference stays a plain id
        assert!(found[0]["clientId"].is_string());
    }

    #[tokio::test]
    async fn test_populate_unresolvable_ref_left_as_is() {
        let c = collections();
        let client = insert_user(&c, "client").await;
        let reading = c
            .insert_one(
                "readings",
                doc(json!({
                    "clientId": client["id"],
                    "readerId": "no-such-user",
                    "type": "chat"
                })),
            )
            .await
            .unwrap();
        assert!(reading["id"].as_str().is_some());

        let found = c
            .find(
                "readings",
                &Filter::new(),
                FindOptions::default().populate("readerId"),
            )
            .await
            .unwrap();

        assert_eq!(found[0]["readerId"], json!("no-such-user"));
    }
}
