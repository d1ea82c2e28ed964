//! Connection Manager
//!
//! Owns the process-wide store handle. `connect` is idempotent: repeated calls
//! before `close` hand back the same handle. Production retries the real store
//! once after a fixed delay and then propagates the failure; development falls
//! back to the ephemeral in-memory store and seeds fixture rows.

use crate::accessor::Collections;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::schema::FixtureSeeder;
use crate::store::{PostgresStore, Store};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct ConnectionManager {
    config: Config,
    store: RwLock<Option<Arc<Store>>>,
}

impl ConnectionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: RwLock::new(None),
        }
    }

    /// Obtain the store handle, establishing the connection on first use.
    pub async fn connect(&self) -> Result<Arc<Store>> {
        if let Some(store) = self.store.read().await.as_ref() {
            return Ok(store.clone());
        }

        let mut guard = self.store.write().await;
        // Another caller may have connected while we waited for the lock
        if let Some(store) = guard.as_ref() {
            return Ok(store.clone());
        }

        let store = self.establish().await?;
        *guard = Some(store.clone());
        Ok(store)
    }

    /// Drop the current handle. The next `connect` re-establishes.
    pub async fn close(&self) {
        let mut guard = self.store.write().await;
        if guard.take().is_some() {
            info!("Store connection closed");
        }
    }

    /// Accessor bound to the managed store.
    pub async fn collections(&self) -> Result<Collections> {
        Ok(Collections::new(self.connect().await?))
    }

    async fn establish(&self) -> Result<Arc<Store>> {
        let url = match &self.config.database_url {
            Some(url) => url.clone(),
            None if self.config.is_production() => {
                return Err(StoreError::ConnectionFailed {
                    cause: "DATABASE_URL is not set; a connection string is required in production"
                        .to_string(),
                });
            }
            None => {
                warn!("No DATABASE_URL configured, using ephemeral in-memory store");
                return self.fallback().await;
            }
        };

        match PostgresStore::connect(&url).await {
            Ok(store) => Ok(Arc::new(Store::Postgres(store))),
            Err(err) if self.config.is_production() => {
                warn!(
                    "Store connection failed ({}), retrying once in {:?}",
                    err, self.config.retry_delay
                );
                sleep(self.config.retry_delay).await;

                let store = PostgresStore::connect(&url).await?;
                Ok(Arc::new(Store::Postgres(store)))
            }
            Err(err) => {
                warn!(
                    "Store connection failed ({}), falling back to in-memory store",
                    err
                );
                self.fallback().await
            }
        }
    }

    async fn fallback(&self) -> Result<Arc<Store>> {
        let store = Arc::new(Store::in_memory());

        let summary = FixtureSeeder::new()
            .seed(&Collections::new(store.clone()))
            .await?;
        info!(
            "In-memory store ready ({} fixture documents seeded)",
            summary.inserted
        );

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Filter, FindOptions};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("docbridge=debug")
            .try_init();
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        init_tracing();
        let manager = ConnectionManager::new(Config::default());

        let first = manager.connect().await.unwrap();
        let second = manager.connect().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_development_fallback_seeds_fixtures() {
        init_tracing();
        let manager = ConnectionManager::new(Config::default());

        let collections = manager.collections().await.unwrap();
        let users = collections
            .find("users", &Filter::new(), FindOptions::default())
            .await
            .unwrap();
        assert!(!users.is_empty());
    }

    #[tokio::test]
    async fn test_close_drops_handle() {
        init_tracing();
        let manager = ConnectionManager::new(Config::default());

        let first = manager.connect().await.unwrap();
        manager.close().await;
        let second = manager.connect().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_production_without_url_propagates() {
        init_tracing();
        let config = Config {
            environment: crate::config::Environment::Production,
            ..Config::default()
        };
        let manager = ConnectionManager::new(config);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectionFailed { .. }));
    }
}
