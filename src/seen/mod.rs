//! Seen store: remembers which items were already handled.
//!
//! Entries expire after a retention window. Three backends exist:
//! an in-process map ([`MemoryStore`]), a SQLite table ([`SqliteStore`])
//! and Redis keys with native TTL ([`RedisStore`], feature `redis`).

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
#[cfg(not(all(feature = "sqlite", feature = "redis")))]
use crate::MonitorError;
use crate::Result;

/// A seen id and when it was first recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub id: String,
    pub first_seen_at: DateTime<Utc>,
}

/// Dedup cache with expiry.
///
/// An expired entry is never reported as present.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Whether an unexpired entry exists for `id`.
    async fn contains(&self, id: &str) -> Result<bool>;

    /// Insert `id`, or refresh its expiry if already present.
    async fn record(&self, id: &str) -> Result<()>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Build the store selected by configuration.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn SeenStore>> {
    let retention = config.retention();
    let store: Arc<dyn SeenStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(retention)),
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.path, retention).await?),
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => {
            return Err(MonitorError::Config(
                "store.backend = \"sqlite\" requires the `sqlite` feature".to_string(),
            ));
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.url, retention).await?),
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => {
            return Err(MonitorError::Config(
                "store.backend = \"redis\" requires the `redis` feature".to_string(),
            ));
        }
    };

    info!(
        "Seen store: {} (retention {}s)",
        store.backend_name(),
        retention.as_secs()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_memory_store() {
        let store = build_store(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(!store.contains("appleswap/a").await.unwrap());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_build_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: dir.path().join("seen.db").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let store = build_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }
}
