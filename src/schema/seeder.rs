//! Fixture seeder for the ephemeral development store.
//!
//! Populates baseline rows (an admin, a reader, a client, a product, a
//! livestream) so the application is usable without a real database. A
//! collection that already has rows is skipped.

use super::types::{LivestreamStatus, Product, Role, User};
use super::EntityKind;
use crate::accessor::Collections;
use crate::error::{Result, StoreError};
use crate::store::{Document, Filter, FindOptions};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

pub struct FixtureSeeder;

impl FixtureSeeder {
    pub fn new() -> Self {
        Self
    }

    pub async fn seed(&self, collections: &Collections) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        if !self.is_empty(collections, EntityKind::User).await? {
            debug!("users collection already populated, skipping all fixtures");
            summary.skipped = 5;
            return Ok(summary);
        }

        let admin = User {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "$2b$10$fixture.admin.hash".into(),
            full_name: Some("Administrator".into()),
            role: Some(Role::Admin),
            is_verified: Some(true),
            ..Default::default()
        };
        collections.insert_one("users", to_document(&admin)?).await?;
        summary.inserted += 1;

        let reader = User {
            username: "mystic_miranda".into(),
            email: "miranda@example.com".into(),
            password: "$2b$10$fixture.reader.hash".into(),
            full_name: Some("Miranda Vale".into()),
            role: Some(Role::Reader),
            bio: Some("Tarot and clairvoyant readings, 15 years of practice.".into()),
            is_verified: Some(true),
            ..Default::default()
        };
        let reader = collections.insert_one("users", to_document(&reader)?).await?;
        let reader_id = doc_id(&reader)?;
        summary.inserted += 1;

        let client = User {
            username: "seeker_sam".into(),
            email: "sam@example.com".into(),
            password: "$2b$10$fixture.client.hash".into(),
            role: Some(Role::Client),
            ..Default::default()
        };
        collections.insert_one("users", to_document(&client)?).await?;
        summary.inserted += 1;

        let product = Product {
            id: None,
            name: "Celestial Tarot Deck".into(),
            description: "78-card deck with guidebook".into(),
            price: 2499,
            image_url: None,
            category: "cards".into(),
            inventory: Some(15),
            is_featured: Some(true),
            seller_id: Some(reader_id.clone()),
            created_at: None,
            updated_at: None,
        };
        collections
            .insert_one("products", to_document(&product)?)
            .await?;
        summary.inserted += 1;

        let livestream = super::types::Livestream {
            id: None,
            host_id: reader_id,
            title: "Full Moon Group Reading".into(),
            description: Some("Open questions, first come first served.".into()),
            status: Some(LivestreamStatus::Scheduled),
            scheduled_at: None,
            started_at: None,
            ended_at: None,
            thumbnail_url: None,
            view_count: Some(0),
            room_id: None,
            created_at: None,
            updated_at: None,
        };
        collections
            .insert_one("livestreams", to_document(&livestream)?)
            .await?;
        summary.inserted += 1;

        info!("Seeded {} fixture documents", summary.inserted);
        Ok(summary)
    }

    async fn is_empty(&self, collections: &Collections, kind: EntityKind) -> Result<bool> {
        let existing = collections
            .find(kind.collection(), &Filter::new(), FindOptions::default().limit(1))
            .await?;
        Ok(existing.is_empty())
    }
}

impl Default for FixtureSeeder {
    fn default() -> Self {
        Self::new()
    }
}

fn to_document<T: serde::Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Internal(format!(
            "fixture did not serialize to an object: {}",
            other
        ))),
    }
}

fn doc_id(doc: &Document) -> Result<String> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Internal("stored fixture has no id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_populates_baseline_rows() {
        let collections = Collections::new(Arc::new(Store::in_memory()));
        let summary = FixtureSeeder::new().seed(&collections).await.unwrap();

        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.skipped, 0);

        let users = collections
            .find("users", &Filter::new(), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(users.len(), 3);

        let products = collections
            .find("products", &Filter::new(), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["price"], json!(2499));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let collections = Collections::new(Arc::new(Store::in_memory()));
        let seeder = FixtureSeeder::new();

        seeder.seed(&collections).await.unwrap();
        let second = seeder.seed(&collections).await.unwrap();

        assert_eq!(second.inserted, 0);
        assert!(second.skipped > 0);

        let users = collections
            .find("users", &Filter::new(), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(users.len(), 3);
    }
}
