//! Poll loop runner.
//!
//! One sequential loop. Each cycle polls every feed in order; any error
//! aborts the cycle and the loop retries after the short retry delay.

use std::future::Future;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::{render_body, CycleReport, LoopSummary, PollSettings, PollState};
use crate::feed::FeedSource;
use crate::notify::Notifier;
use crate::rule::MatchRule;
use crate::seen::SeenStore;
use crate::{MonitorError, Result};

/// Periodic feed poller.
pub struct PollLoop {
    source: Arc<dyn FeedSource>,
    rule: MatchRule,
    store: Arc<dyn SeenStore>,
    notifier: Arc<dyn Notifier>,
    settings: PollSettings,
}

impl PollLoop {
    /// Create a poll loop from its collaborators.
    pub fn new(
        source: Arc<dyn FeedSource>,
        rule: MatchRule,
        store: Arc<dyn SeenStore>,
        notifier: Arc<dyn Notifier>,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            rule,
            store,
            notifier,
            settings,
        }
    }

    /// Loop settings.
    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Run until `shutdown` completes.
    ///
    /// Shutdown is observed while sleeping; a cycle in progress is finished
    /// first.
    pub async fn run_until<F>(&self, shutdown: F) -> LoopSummary
    where
        F: Future<Output = ()>,
    {
        info!(
            "Poll loop started: source {}, {} feed(s), interval {}s, retry {}s, store {}, channel {}",
            self.source.name(),
            self.settings.feeds.len(),
            self.settings.interval.as_secs(),
            self.settings.retry_delay.as_secs(),
            self.store.backend_name(),
            self.notifier.channel_name()
        );

        tokio::pin!(shutdown);
        let mut summary = LoopSummary::default();

        loop {
            summary.cycles += 1;
            let (state, delay) = match self.run_cycle().await {
                Ok(report) => {
                    if report.notified > 0 {
                        info!(
                            "Cycle {} done: {} notification(s) sent",
                            summary.cycles, report.notified
                        );
                    } else {
                        debug!("Cycle {} done: {:?}", summary.cycles, report);
                    }
                    let delay = self.settings.interval;
                    (PollState::Sleeping(delay), delay)
                }
                Err(e) => {
                    summary.failures += 1;
                    log_cycle_error(&e);
                    let delay = self.settings.retry_delay;
                    (PollState::Backoff(delay), delay)
                }
            };

            debug!(state = %state, "Waiting for next cycle");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut shutdown => {
                    info!(
                        "Poll loop stopped after {} cycle(s), {} failed",
                        summary.cycles, summary.failures
                    );
                    return summary;
                }
            }
        }
    }

    /// Poll every feed once.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        for feed in &self.settings.feeds {
            self.poll_feed(feed, &mut report).await?;
            report.feeds += 1;
        }
        debug!(state = %PollState::Idle, "Cycle complete");
        Ok(report)
    }

    async fn poll_feed(&self, feed: &str, report: &mut CycleReport) -> Result<()> {
        debug!(state = %PollState::Fetching(feed.to_string()), "Polling feed");
        let items = self.source.fetch(feed, self.settings.limit).await?;
        report.fetched += items.len();

        debug!(state = %PollState::Filtering(feed.to_string()), "Fetched {} item(s)", items.len());

        for item in items {
            let key = item.dedup_key();

            if !self.rule.matches(&item.title) {
                if self.settings.record_irrelevant && !self.store.contains(&key).await? {
                    self.store.record(&key).await?;
                }
                continue;
            }
            report.matched += 1;

            if self.store.contains(&key).await? {
                report.already_seen += 1;
                continue;
            }

            debug!(state = %PollState::Notifying(key.clone()), "New match: {}", item.title);
            let subject = self.settings.render_subject(&item);
            self.notifier.send(&subject, &render_body(&item)).await?;
            report.notified += 1;

            debug!(state = %PollState::Recording(key.clone()), "Marking as seen");
            self.store.record(&key).await?;
        }

        Ok(())
    }
}

fn log_cycle_error(e: &MonitorError) {
    if e.is_auth() {
        error!(
            "Poll cycle failed: {}. Check the credentials in the environment or .env file",
            e
        );
    } else if e.is_transient() {
        warn!("Poll cycle failed: {}", e);
    } else {
        error!("Poll cycle failed: {}", e);
    }
}
