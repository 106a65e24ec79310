//! Feed sources for Swap Monitor.
//!
//! A [`FeedSource`] returns the most recent items of a named feed. Two
//! implementations exist: [`RedditSource`] (listing API with OAuth client
//! credentials) and [`RssSource`] (RSS/Atom URLs).

pub mod reddit;
pub mod rss;
pub mod types;

pub use reddit::RedditSource;
pub use rss::{validate_url, RssSource};
pub use types::Item;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::{Config, SourceConfig, SourceKind};
use crate::{MonitorError, Result};

/// A source of recent items.
///
/// Implementations must bound every request with a timeout and report
/// failures as [`MonitorError::Feed`] (with `retryable` set) or
/// [`MonitorError::FeedAuth`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch up to `limit` most recent items of `feed`, newest first.
    async fn fetch(&self, feed: &str, limit: usize) -> Result<Vec<Item>>;

    /// Human-readable source name.
    fn name(&self) -> &str;
}

/// Build the feed source selected by configuration.
pub fn build_source(config: &Config) -> Result<Arc<dyn FeedSource>> {
    let source: Arc<dyn FeedSource> = match config.source.kind {
        SourceKind::Reddit => Arc::new(RedditSource::new(&config.source)?),
        SourceKind::Rss => Arc::new(RssSource::new(&config.source, &config.feeds)?),
    };
    Ok(source)
}

/// Build the HTTP client shared by the feed sources.
pub(crate) fn build_client(config: &SourceConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| MonitorError::Config(format!("failed to create HTTP client: {e}")))
}

/// Map a non-success HTTP status to a feed error.
pub(crate) fn status_error(feed: &str, status: StatusCode) -> MonitorError {
    if status == StatusCode::NOT_FOUND {
        return MonitorError::feed_permanent(feed, "feed not found (HTTP 404)");
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        return MonitorError::feed_transient(feed, format!("HTTP error: {status}"));
    }
    MonitorError::feed_permanent(feed, format!("HTTP error: {status}"))
}

/// Map a transport-level reqwest error to a feed error.
pub(crate) fn transport_error(feed: &str, e: reqwest::Error) -> MonitorError {
    if e.is_timeout() {
        MonitorError::feed_transient(feed, format!("request timed out: {e}"))
    } else if e.is_decode() {
        MonitorError::feed_permanent(feed, format!("failed to decode response: {e}"))
    } else {
        MonitorError::feed_transient(feed, format!("request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_not_found_is_permanent() {
        let err = status_error("gone", StatusCode::NOT_FOUND);
        assert!(!err.is_transient());
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_status_error_server_errors_are_transient() {
        assert!(status_error("f", StatusCode::BAD_GATEWAY).is_transient());
        assert!(status_error("f", StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(status_error("f", StatusCode::TOO_MANY_REQUESTS).is_transient());
    }

    #[test]
    fn test_status_error_client_errors_are_permanent() {
        assert!(!status_error("f", StatusCode::FORBIDDEN).is_transient());
        assert!(!status_error("f", StatusCode::BAD_REQUEST).is_transient());
    }

    #[test]
    fn test_build_source_rss() {
        let mut config = Config::default();
        config.source.kind = SourceKind::Rss;
        for feed in &mut config.feeds {
            feed.url = Some(format!("https://www.reddit.com/r/{}/new/.rss", feed.name));
        }
        let source = build_source(&config).unwrap();
        assert_eq!(source.name(), "rss");
    }

    #[test]
    fn test_build_source_reddit_without_credentials() {
        assert!(build_source(&Config::default()).is_err());
    }

    #[test]
    fn test_build_client_default_config() {
        assert!(build_client(&SourceConfig::default()).is_ok());
    }
}
