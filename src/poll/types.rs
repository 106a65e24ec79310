//! Types shared by the poll loop.

use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::feed::Item;

/// Poll loop phase, used in log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching(String),
    Filtering(String),
    Notifying(String),
    Recording(String),
    Sleeping(Duration),
    Backoff(Duration),
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Idle => write!(f, "idle"),
            PollState::Fetching(feed) => write!(f, "fetching({feed})"),
            PollState::Filtering(feed) => write!(f, "filtering({feed})"),
            PollState::Notifying(key) => write!(f, "notifying({key})"),
            PollState::Recording(key) => write!(f, "recording({key})"),
            PollState::Sleeping(d) => write!(f, "sleeping({}s)", d.as_secs()),
            PollState::Backoff(d) => write!(f, "backoff({}s)", d.as_secs()),
        }
    }
}

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Feed names, polled in order.
    pub feeds: Vec<String>,
    /// Items requested per feed.
    pub limit: usize,
    /// Delay between successful cycles.
    pub interval: Duration,
    /// Delay after a failed cycle.
    pub retry_delay: Duration,
    /// Subject template; `{feed}` and `{title}` are substituted.
    pub subject: String,
    /// Also record ids that did not match the rule.
    pub record_irrelevant: bool,
}

impl PollSettings {
    /// Settings for the given feeds with default timing.
    pub fn new<I, S>(feeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = crate::config::PollConfig::default();
        Self {
            feeds: feeds.into_iter().map(Into::into).collect(),
            limit: defaults.limit,
            interval: defaults.interval(),
            retry_delay: defaults.retry_delay(),
            subject: defaults.subject,
            record_irrelevant: defaults.record_irrelevant,
        }
    }

    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            feeds: config.feeds.iter().map(|f| f.name.clone()).collect(),
            limit: config.poll.limit,
            interval: config.poll.interval(),
            retry_delay: config.poll.retry_delay(),
            subject: config.poll.subject.clone(),
            record_irrelevant: config.poll.record_irrelevant,
        }
    }

    /// Render the subject line for an item.
    pub fn render_subject(&self, item: &Item) -> String {
        self.subject
            .replace("{feed}", &item.feed)
            .replace("{title}", &item.title)
    }
}

/// Render the notification body for an item.
pub fn render_body(item: &Item) -> String {
    format!("Title: {}\nURL: {}", item.title, item.url)
}

/// Counters for one successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Feeds polled.
    pub feeds: usize,
    /// Items fetched across all feeds.
    pub fetched: usize,
    /// Items accepted by the match rule.
    pub matched: usize,
    /// Notifications sent.
    pub notified: usize,
    /// Matching items skipped because they were already seen.
    pub already_seen: usize,
}

/// Outcome of [`super::PollLoop::run_until`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Cycles attempted.
    pub cycles: u64,
    /// Cycles that failed.
    pub failures: u64,
}
