//! Ephemeral in-memory store.
//!
//! Holds every collection as a vector of documents inside a `DashMap`. Mutating
//! operations lock only the collection they touch. Semantics mirror the
//! Postgres backend so callers cannot tell the two apart.

use super::{is_valid_field, matches_filter, Document, Filter, FindOptions, SortOrder};
use crate::schema::EntityKind;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;

pub struct MemoryStore {
    collections: DashMap<&'static str, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let collections = DashMap::new();
        for kind in EntityKind::ALL {
            collections.insert(kind.collection(), Vec::new());
        }
        Self { collections }
    }

    pub fn find(&self, kind: EntityKind, filter: &Filter, options: &FindOptions) -> Vec<Document> {
        let docs = match self.collections.get(kind.collection()) {
            Some(entry) => entry,
            None => return Vec::new(),
        };

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect();

        if let Some((field, order)) = &options.sort {
            if is_valid_field(field) {
                matched.sort_by(|a, b| {
                    let ord = compare_values(a.get(field), b.get(field));
                    match order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    }
                });
            }
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let matched: Vec<Document> = matched.into_iter().skip(skip).collect();

        match options.limit {
            Some(limit) => matched.into_iter().take(limit as usize).collect(),
            None => matched,
        }
    }

    pub fn find_by_id(&self, kind: EntityKind, id: &str) -> Option<Document> {
        self.collections
            .get(kind.collection())?
            .iter()
            .find(|doc| doc_id(doc) == Some(id))
            .cloned()
    }

    pub fn insert(&self, kind: EntityKind, doc: Document) -> Document {
        let mut entry = self
            .collections
            .entry(kind.collection())
            .or_default();
        entry.push(doc.clone());
        doc
    }

    pub fn update_by_id(&self, kind: EntityKind, id: &str, patch: &Document) -> Option<Document> {
        let mut entry = self.collections.get_mut(kind.collection())?;
        let doc = entry.iter_mut().find(|doc| doc_id(doc) == Some(id))?;
        merge(doc, patch);
        Some(doc.clone())
    }

    pub fn update_many(&self, kind: EntityKind, filter: &Filter, patch: &Document) -> u64 {
        let mut entry = match self.collections.get_mut(kind.collection()) {
            Some(entry) => entry,
            None => return 0,
        };

        let mut modified = 0;
        for doc in entry.iter_mut() {
            if matches_filter(doc, filter) {
                merge(doc, patch);
                modified += 1;
            }
        }
        modified
    }

    pub fn delete_by_id(&self, kind: EntityKind, id: &str) -> bool {
        let mut entry = match self.collections.get_mut(kind.collection()) {
            Some(entry) => entry,
            None => return false,
        };

        let before = entry.len();
        entry.retain(|doc| doc_id(doc) != Some(id));
        entry.len() < before
    }

    pub fn delete_many(&self, kind: EntityKind, filter: &Filter) -> u64 {
        let mut entry = match self.collections.get_mut(kind.collection()) {
            Some(entry) => entry,
            None => return 0,
        };

        let before = entry.len();
        entry.retain(|doc| !matches_filter(doc, filter));
        (before - entry.len()) as u64
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// Field-level merge: patch values overwrite, everything else survives.
fn merge(doc: &mut Document, patch: &Document) {
    for (field, value) in patch {
        doc.insert(field.clone(), value.clone());
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // missing fields sort first, like NULLS FIRST
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            EntityKind::Product,
            doc(json!({"id": "p1", "name": "candles", "price": 900, "category": "home"})),
        );
        store.insert(
            EntityKind::Product,
            doc(json!({"id": "p2", "name": "tarot deck", "price": 2499, "category": "cards"})),
        );
        store.insert(
            EntityKind::Product,
            doc(json!({"id": "p3", "name": "crystal", "price": 1200, "category": "home"})),
        );
        store
    }

    #[test]
    fn test_filter_and_sort() {
        let store = seeded();

        let mut filter = Filter::new();
        filter.insert("category".into(), json!("home"));

        let options = FindOptions::default().sort("price", SortOrder::Desc);
        let found = store.find(EntityKind::Product, &filter, &options);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["id"], json!("p3"));
        assert_eq!(found[1]["id"], json!("p1"));
    }

    #[test]
    fn test_skip_and_limit() {
        let store = seeded();

        let options = FindOptions::default()
            .sort("price", SortOrder::Asc)
            .skip(1)
            .limit(1);
        let found = store.find(EntityKind::Product, &Filter::new(), &options);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], json!("p3"));
    }

    #[test]
    fn test_update_merges_fields() {
        let store = seeded();

        let patch = doc(json!({"price": 999}));
        let updated = store
            .update_by_id(EntityKind::Product, "p1", &patch)
            .unwrap();

        assert_eq!(updated["price"], json!(999));
        assert_eq!(updated["name"], json!("candles"));
    }

    #[test]
    fn test_delete_many() {
        let store = seeded();

        let mut filter = Filter::new();
        filter.insert("category".into(), json!("home"));

        assert_eq!(store.delete_many(EntityKind::Product, &filter), 2);
        let left = store.find(EntityKind::Product, &Filter::new(), &FindOptions::default());
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["id"], json!("p2"));
    }

    #[test]
    fn test_delete_by_id() {
        let store = seeded();
        assert!(store.delete_by_id(EntityKind::Product, "p2"));
        assert!(!store.delete_by_id(EntityKind::Product, "p2"));
    }
}
