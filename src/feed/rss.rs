//! RSS/Atom feed source.
//!
//! Each configured feed name maps to a URL. Responses are size-limited and
//! parsed with `feed-rs`, so both RSS 2.0 and Atom are accepted (Reddit
//! serves Atom at `/r/<name>/new/.rss`).

use std::collections::HashMap;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::{FeedConfig, SourceConfig};
use crate::feed::{build_client, status_error, transport_error, FeedSource, Item};
use crate::{MonitorError, Result};

/// Feed source reading RSS or Atom documents.
pub struct RssSource {
    client: Client,
    urls: HashMap<String, String>,
    max_feed_size: u64,
}

impl RssSource {
    /// Create a source for the given feeds.
    ///
    /// Every feed must carry a valid http(s) URL.
    pub fn new(config: &SourceConfig, feeds: &[FeedConfig]) -> Result<Self> {
        let mut urls = HashMap::new();
        for feed in feeds {
            let url = feed.url.as_deref().ok_or_else(|| {
                MonitorError::Config(format!("feed '{}' has no url", feed.name))
            })?;
            validate_url(url)?;
            urls.insert(feed.name.clone(), url.to_string());
        }

        Ok(Self {
            client: build_client(config)?,
            urls,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    fn check_size(&self, feed: &str, size: u64) -> Result<()> {
        if size > self.max_feed_size {
            return Err(MonitorError::feed_permanent(
                feed,
                format!(
                    "feed too large: {} bytes (max {} bytes)",
                    size, self.max_feed_size
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for RssSource {
    async fn fetch(&self, feed: &str, limit: usize) -> Result<Vec<Item>> {
        let url = self
            .urls
            .get(feed)
            .ok_or_else(|| MonitorError::feed_permanent(feed, "no url configured"))?;

        debug!("Fetching feed {} from {}", feed, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(feed, e))?;

        if !response.status().is_success() {
            return Err(status_error(feed, response.status()));
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(feed, content_length)?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(feed, e))?;
        self.check_size(feed, bytes.len() as u64)?;

        let mut items = parse_feed(feed, &bytes)?;
        items.truncate(limit);
        Ok(items)
    }

    fn name(&self) -> &str {
        "rss"
    }
}

/// Validate a feed URL.
///
/// Only http and https URLs with a host are accepted.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| MonitorError::Config(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(MonitorError::Config(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(MonitorError::Config("URL has no host".to_string()));
    }

    Ok(())
}

/// Parse feed bytes into items, in document order.
pub(crate) fn parse_feed(feed: &str, bytes: &[u8]) -> Result<Vec<Item>> {
    let parsed = parser::parse(bytes)
        .map_err(|e| MonitorError::feed_permanent(feed, format!("failed to parse feed: {e}")))?;

    let items = parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            // Prefer the entry id, fall back to the link
            let id = if entry.id.trim().is_empty() {
                link.clone()?
            } else {
                entry.id
            };
            let title = entry
                .title
                .map(|t| normalize_whitespace(&t.content))
                .unwrap_or_default();

            Some(Item::new(feed, id, title, link.unwrap_or_default()))
        })
        .collect();

    Ok(items)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Swap Feed</title>
    <item>
      <title>[H] iPad Pro [W] PayPal</title>
      <link>https://example.com/1</link>
      <guid>post-1</guid>
    </item>
    <item>
      <title>WTS   iPhone
        12</title>
      <link>https://example.com/2</link>
      <guid>post-2</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>r/appleswap</title>
  <id>https://www.reddit.com/r/appleswap/new/.rss</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>t3_abc123</id>
    <title>Selling iPad Air</title>
    <link href="https://www.reddit.com/r/appleswap/comments/abc123/"/>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items_in_order() {
        let items = parse_feed("swap", RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "post-1");
        assert_eq!(items[0].title, "[H] iPad Pro [W] PayPal");
        assert_eq!(items[0].url, "https://example.com/1");
        assert_eq!(items[0].feed, "swap");
        assert_eq!(items[1].title, "WTS iPhone 12");
    }

    #[test]
    fn test_parse_atom_entry() {
        let items = parse_feed("appleswap", ATOM.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "t3_abc123");
        assert_eq!(items[0].title, "Selling iPad Air");
        assert_eq!(
            items[0].url,
            "https://www.reddit.com/r/appleswap/comments/abc123/"
        );
    }

    #[test]
    fn test_parse_invalid_feed() {
        let err = parse_feed("swap", b"not a feed").unwrap_err();
        assert!(matches!(err, MonitorError::Feed { retryable: false, .. }));
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://www.reddit.com/r/appleswap/new/.rss").is_ok());
        assert!(validate_url("http://example.com/feed.xml").is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let err = validate_url("ftp://example.com/feed.xml").unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_validate_url_garbage() {
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_new_requires_urls() {
        let feeds = vec![FeedConfig::named("appleswap")];
        let result = RssSource::new(&SourceConfig::default(), &feeds);
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_unknown_feed() {
        let feeds = vec![FeedConfig {
            name: "appleswap".to_string(),
            url: Some("https://example.com/feed.xml".to_string()),
        }];
        let source = RssSource::new(&SourceConfig::default(), &feeds).unwrap();
        let err = source.fetch("other", 10).await.unwrap_err();
        assert!(matches!(err, MonitorError::Feed { retryable: false, .. }));
    }
}
