//! Redis-backed seen store.
//!
//! Each id is a key with a TTL equal to the retention window, so Redis
//! expires entries on its own. The value is the first-seen time in
//! milliseconds.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;

use super::{SeenEntry, SeenStore};
use crate::{MonitorError, Result};

const KEY_PREFIX: &str = "swapmon:seen:";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Seen store on a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisStore {
    /// Connect to the server at `url`.
    pub async fn connect(url: &str, retention: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| MonitorError::Store("timed out connecting to Redis".to_string()))??;

        info!("Connected to Redis seen store");
        Ok(Self {
            conn,
            // Redis rejects a zero expiry
            ttl_secs: retention.as_secs().max(1),
        })
    }

    /// Look up an unexpired entry.
    pub async fn entry(&self, id: &str) -> Result<Option<SeenEntry>> {
        let mut conn = self.conn.clone();
        let millis: Option<i64> = conn.get(redis_key(id)).await?;
        Ok(millis
            .and_then(DateTime::from_timestamp_millis)
            .map(|first_seen_at| SeenEntry {
                id: id.to_string(),
                first_seen_at,
            }))
    }
}

#[async_trait]
impl SeenStore for RedisStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(redis_key(id)).await?;
        Ok(exists)
    }

    async fn record(&self, id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = redis_key(id);

        // Refreshing keeps the first-seen value
        let existing: Option<i64> = conn.get(&key).await?;
        let first_seen = existing.unwrap_or_else(|| Utc::now().timestamp_millis());

        let _: () = conn.set_ex(&key, first_seen, self.ttl_secs).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn redis_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}
