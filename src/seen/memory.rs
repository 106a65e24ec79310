//! In-process seen store.
//!
//! Entries live in a map keyed by id. A queue ordered by record time acts as
//! the expiry index, so a sweep only touches entries that actually expired.
//! Refreshing an id pushes a new queue entry; the old one is recognized as
//! stale by its sequence number and dropped when it reaches the front.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{SeenEntry, SeenStore};
use crate::Result;

#[derive(Debug)]
struct Slot {
    first_seen_at: DateTime<Utc>,
    recorded_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    expiry: VecDeque<(Instant, u64, String)>,
    next_seq: u64,
}

impl Inner {
    /// Drop every entry older than `retention`.
    fn sweep(&mut self, now: Instant, retention: Duration) -> usize {
        let mut evicted = 0;
        while let Some((recorded_at, _, _)) = self.expiry.front() {
            if now.saturating_duration_since(*recorded_at) < retention {
                break;
            }
            let Some((_, seq, id)) = self.expiry.pop_front() else {
                break;
            };
            if self.entries.get(&id).is_some_and(|slot| slot.seq == seq) {
                self.entries.remove(&id);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Seen store held in memory. Lost on restart.
#[derive(Debug)]
pub struct MemoryStore {
    retention: Duration,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Number of entries held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up an unexpired entry.
    pub async fn entry(&self, id: &str) -> Option<SeenEntry> {
        let inner = self.inner.lock().await;
        let slot = inner.entries.get(id)?;
        if self.is_expired(slot, Instant::now()) {
            return None;
        }
        Some(SeenEntry {
            id: id.to_string(),
            first_seen_at: slot.first_seen_at,
        })
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        now.saturating_duration_since(slot.recorded_at) >= self.retention
    }
}

#[async_trait]
impl SeenStore for MemoryStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        Ok(inner
            .entries
            .get(id)
            .is_some_and(|slot| !self.is_expired(slot, now)))
    }

    async fn record(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        let evicted = inner.sweep(now, self.retention);
        if evicted > 0 {
            debug!("Evicted {} expired entries", evicted);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        let first_seen_at = inner
            .entries
            .get(id)
            .map(|slot| slot.first_seen_at)
            .unwrap_or_else(Utc::now);
        inner.entries.insert(
            id.to_string(),
            Slot {
                first_seen_at,
                recorded_at: now,
                seq,
            },
        );
        inner.expiry.push_back((now, seq, id.to_string()));

        debug!("Seen cache size: {}", inner.entries.len());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
