//! Swap Monitor - listing feed poller.
//!
//! Polls listing feeds (Reddit subreddits or RSS/Atom URLs), filters titles
//! by keyword, and sends one notification per newly seen matching item.

pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notify;
pub mod poll;
pub mod rule;
pub mod seen;

pub use config::Config;
pub use error::{MonitorError, Result};
pub use feed::{build_source, FeedSource, Item, RedditSource, RssSource};
pub use notify::{build_notifier, EmailNotifier, LogNotifier, Notifier};
pub use poll::{CycleReport, LoopSummary, PollLoop, PollSettings};
pub use rule::{MatchRule, MatchScope};
pub use seen::{build_store, MemoryStore, SeenEntry, SeenStore};

#[cfg(feature = "sqlite")]
pub use seen::SqliteStore;

#[cfg(feature = "redis")]
pub use seen::RedisStore;

