//! SQLite-backed seen store.
//!
//! Survives restarts. Each row carries its own expiry timestamp; expired rows
//! are ignored on lookup and deleted on every `record`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{SeenEntry, SeenStore};
use crate::{MonitorError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS seen_items (
    key           TEXT PRIMARY KEY,
    first_seen_at INTEGER NOT NULL,
    expires_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_seen_items_expires_at ON seen_items(expires_at);
"#;

/// Seen store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    retention: Duration,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &str, retention: Duration) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        info!("Opened seen store database at {}", path);
        Self::with_pool(pool, retention).await
    }

    /// Create a store in an in-memory database.
    pub async fn in_memory(retention: Duration) -> Result<Self> {
        // One connection, otherwise every connection gets its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool, retention).await
    }

    async fn with_pool(pool: SqlitePool, retention: Duration) -> Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool, retention })
    }

    /// Retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Look up an unexpired entry.
    pub async fn entry(&self, id: &str) -> Result<Option<SeenEntry>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT first_seen_at FROM seen_items WHERE key = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(millis,)| {
            let first_seen_at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                MonitorError::Store(format!("invalid timestamp for {id}: {millis}"))
            })?;
            Ok(SeenEntry {
                id: id.to_string(),
                first_seen_at,
            })
        })
        .transpose()
    }

    /// Number of rows, including expired ones not yet deleted.
    pub async fn len(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub(crate) async fn contains_at(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM seen_items WHERE key = ? AND expires_at > ?)",
        )
        .bind(id)
        .bind(now.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    pub(crate) async fn record_at(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let now_ms = now.timestamp_millis();
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_ms.saturating_add(retention_ms);

        let mut tx = self.pool.begin().await?;

        // A row that expired but was not yet deleted starts over
        sqlx::query(
            r#"
            INSERT INTO seen_items (key, first_seen_at, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                first_seen_at = CASE
                    WHEN seen_items.expires_at > ? THEN seen_items.first_seen_at
                    ELSE excluded.first_seen_at
                END,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(id)
        .bind(now_ms)
        .bind(expires_at)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        let purged = sqlx::query("DELETE FROM seen_items WHERE expires_at <= ?")
            .bind(now_ms)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if purged > 0 {
            debug!("Purged {} expired seen entries", purged);
        }
        Ok(())
    }
}

#[async_trait]
impl SeenStore for SqliteStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        self.contains_at(id, Utc::now()).await
    }

    async fn record(&self, id: &str) -> Result<()> {
        self.record_at(id, Utc::now()).await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn test_record_then_contains() {
        let store = SqliteStore::in_memory(DAY).await.unwrap();
        assert!(!store.contains("appleswap/a").await.unwrap());
        store.record("appleswap/a").await.unwrap();
        assert!(store.contains("appleswap/a").await.unwrap());
        assert!(!store.contains("appleswap/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_twice_keeps_first_seen() {
        let store = SqliteStore::in_memory(DAY).await.unwrap();
        let t0 = Utc::now();
        store.record_at("appleswap/a", t0).await.unwrap();
        store
            .record_at("appleswap/a", t0 + TimeDelta::minutes(5))
            .await
            .unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let entry = store.entry("appleswap/a").await.unwrap().unwrap();
        assert_eq!(entry.first_seen_at.timestamp_millis(), t0.timestamp_millis());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let store = SqliteStore::in_memory(DAY).await.unwrap();
        let t0 = Utc::now();
        store.record_at("appleswap/a", t0).await.unwrap();

        let almost = t0 + TimeDelta::hours(24) - TimeDelta::seconds(1);
        assert!(store.contains_at("appleswap/a", almost).await.unwrap());

        let expired = t0 + TimeDelta::hours(24);
        assert!(!store.contains_at("appleswap/a", expired).await.unwrap());
    }

    #[tokio::test]
    async fn test_huge_retention_does_not_wrap() {
        let store = SqliteStore::in_memory(Duration::from_secs(u64::MAX / 1000))
            .await
            .unwrap();
        store.record("appleswap/a").await.unwrap();
        assert!(store.contains("appleswap/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_purges_expired_rows() {
        let store = SqliteStore::in_memory(DAY).await.unwrap();
        let t0 = Utc::now();
        store.record_at("appleswap/a", t0).await.unwrap();
        store.record_at("appleswap/b", t0).await.unwrap();

        store
            .record_at("appleswap/c", t0 + TimeDelta::hours(25))
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("seen.db");
        let path = path.to_string_lossy().into_owned();

        let store = SqliteStore::open(&path, DAY).await.unwrap();
        store.record("appleswap/a").await.unwrap();
        assert!(Path::new(&path).exists());
    }
}
