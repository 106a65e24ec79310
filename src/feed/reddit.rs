//! Reddit listing source.
//!
//! Uses application-only OAuth (client credentials grant). The bearer token
//! is cached and refreshed shortly before it expires, or after the listing
//! endpoint rejects it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::feed::{build_client, status_error, transport_error, FeedSource, Item};
use crate::{MonitorError, Result};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const WEB_BASE: &str = "https://www.reddit.com";

/// Refresh the token this long before Reddit expires it.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Reddit app-only tokens last a day; longer lifetimes are not trusted.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Reddit caps listing pages at 100 items.
const MAX_LISTING_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Feed source backed by the Reddit API.
///
/// Feed names are subreddit names.
pub struct RedditSource {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditSource {
    /// Create a source from configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(MonitorError::Config(
                "Reddit client id and secret are required".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(config)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, requesting a new one when needed.
    async fn access_token(&self, feed: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token(feed).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self, feed: &str) -> Result<CachedToken> {
        debug!("Requesting Reddit access token");

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| transport_error(feed, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MonitorError::FeedAuth(format!(
                "Reddit rejected client credentials (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(status_error(feed, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(feed, e))?;
        let token = parse_token(&body, Instant::now())?;
        info!("Obtained Reddit access token");
        Ok(token)
    }

    async fn clear_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl FeedSource for RedditSource {
    async fn fetch(&self, feed: &str, limit: usize) -> Result<Vec<Item>> {
        let token = self.access_token(feed).await?;
        let url = format!(
            "{}/r/{}/new?limit={}",
            API_BASE,
            feed,
            limit.min(MAX_LISTING_LIMIT)
        );

        debug!("Fetching r/{} (limit {})", feed, limit);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(feed, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; the next cycle requests a new one
            self.clear_token().await;
            return Err(MonitorError::feed_transient(
                feed,
                "access token rejected (HTTP 401)",
            ));
        }
        if status == StatusCode::FORBIDDEN {
            return Err(MonitorError::feed_permanent(
                feed,
                "subreddit is private or banned (HTTP 403)",
            ));
        }
        if !status.is_success() {
            return Err(status_error(feed, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(feed, e))?;

        let mut items = parse_listing(feed, &body)?;
        items.truncate(limit);
        Ok(items)
    }

    fn name(&self) -> &str {
        "reddit"
    }
}

/// Parse an access token response received at `now`.
fn parse_token(body: &[u8], now: Instant) -> Result<CachedToken> {
    let response: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| MonitorError::FeedAuth(format!("malformed token response: {e}")))?;

    if let Some(error) = response.error {
        return Err(MonitorError::FeedAuth(format!(
            "token request refused: {error}"
        )));
    }

    let value = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MonitorError::FeedAuth("token response has no access_token".to_string()))?;

    let lifetime =
        Duration::from_secs(response.expires_in.unwrap_or(3600)).min(MAX_TOKEN_LIFETIME);
    Ok(CachedToken {
        value,
        refresh_at: now + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
    })
}

/// Parse a subreddit listing into items, newest first.
pub(crate) fn parse_listing(feed: &str, body: &[u8]) -> Result<Vec<Item>> {
    let listing: Listing = serde_json::from_slice(body)
        .map_err(|e| MonitorError::feed_permanent(feed, format!("malformed listing: {e}")))?;

    let items = listing
        .data
        .children
        .into_iter()
        .map(|child| {
            let post = child.data;
            let url = match post.url {
                Some(url) if !url.is_empty() => url,
                _ => format!("{}{}", WEB_BASE, post.permalink),
            };
            Item::new(feed, post.id, post.title, url)
        })
        .collect();

    Ok(items)
}
