//! Test helpers for integration tests.
//!
//! Provides a scripted feed source, a recording notifier and a failing
//! seen store.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use swap_monitor::{
    FeedSource, Item, MatchRule, MatchScope, MemoryStore, MonitorError, Notifier, PollLoop,
    PollSettings, Result, SeenStore,
};

/// Feed source replaying a fixed script of fetch results.
///
/// Once the script is exhausted every fetch returns the last successful
/// batch again, or an empty feed when there was none.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Item>>>>,
    last: Mutex<Vec<Item>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Item>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Times at which `fetch` was called.
    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, _feed: &str, limit: usize) -> Result<Vec<Item>> {
        self.calls.lock().unwrap().push(Instant::now());

        let next = self.script.lock().unwrap().pop_front();
        let items = match next {
            Some(Ok(items)) => {
                *self.last.lock().unwrap() = items.clone();
                items
            }
            Some(Err(e)) => return Err(e),
            None => self.last.lock().unwrap().clone(),
        };
        Ok(items.into_iter().take(limit).collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Notifier that keeps every message it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Messages sent so far, as (subject, body).
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

/// Seen store whose backend is unreachable for the first `failures` lookups.
pub struct FailingStore {
    remaining: Mutex<usize>,
    inner: MemoryStore,
}

impl FailingStore {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining: Mutex::new(failures),
            inner: MemoryStore::new(std::time::Duration::from_secs(3600)),
        }
    }
}

#[async_trait]
impl SeenStore for FailingStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MonitorError::Store("connection refused".to_string()));
            }
        }
        self.inner.contains(id).await
    }

    async fn record(&self, id: &str) -> Result<()> {
        self.inner.record(id).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// The two-item feed used by most scenarios.
pub fn swap_items() -> Vec<Item> {
    vec![
        Item::new(
            "appleswap",
            "a",
            "Selling iPad Air",
            "https://www.reddit.com/r/appleswap/comments/a/",
        ),
        Item::new(
            "appleswap",
            "b",
            "WTS iPhone",
            "https://www.reddit.com/r/appleswap/comments/b/",
        ),
    ]
}

/// A transient fetch failure.
pub fn timeout_error() -> MonitorError {
    MonitorError::feed_transient("appleswap", "request timed out")
}

/// Poll loop over one feed with the default rule and timing.
pub fn poll_loop(
    source: Arc<ScriptedSource>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
) -> PollLoop {
    PollLoop::new(
        source,
        MatchRule::new(["ipad", "ipad pro"], MatchScope::Title),
        store,
        notifier,
        PollSettings::new(["appleswap"]),
    )
}
