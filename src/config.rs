//! Configuration module for Swap Monitor.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::rule::MatchScope;
use crate::{MonitorError, Result};

/// Environment variable holding the Reddit OAuth client ID.
pub const ENV_REDDIT_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
/// Environment variable holding the Reddit OAuth client secret.
pub const ENV_REDDIT_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
/// Environment variable holding the sender address.
pub const ENV_EMAIL_FROM: &str = "EMAIL_FROM";
/// Environment variable holding the recipient address(es), comma separated.
pub const ENV_EMAIL_TO: &str = "EMAIL_TO";
/// Environment variable holding the SMTP username.
pub const ENV_EMAIL_USERNAME: &str = "EMAIL_USERNAME";
/// Environment variable holding the SMTP password.
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
/// Environment variable holding the Redis connection URL.
pub const ENV_REDIS_URL: &str = "REDIS_URL";

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file. Console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Poll loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Delay between successful cycles in seconds.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Delay after a failed cycle in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Number of most recent items fetched per feed.
    #[serde(default = "default_poll_limit")]
    pub limit: usize,
    /// Record irrelevant items too, so they are not re-evaluated.
    #[serde(default)]
    pub record_irrelevant: bool,
    /// Subject template. `{feed}` and `{title}` are substituted.
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_poll_interval() -> u64 {
    300 // 5 minutes
}

fn default_retry_delay() -> u64 {
    60
}

fn default_poll_limit() -> usize {
    10
}

fn default_subject() -> String {
    "New iPad Listing Alert".to_string()
}

impl PollConfig {
    /// Delay between successful cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Delay after a failed cycle.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            retry_delay_secs: default_retry_delay(),
            limit: default_poll_limit(),
            record_irrelevant: false,
            subject: default_subject(),
        }
    }
}

/// A polled feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    /// Feed name (the subreddit for Reddit sources).
    pub name: String,
    /// Feed URL, required for RSS sources.
    #[serde(default)]
    pub url: Option<String>,
}

impl FeedConfig {
    /// Create a feed with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::named("appleswap"),
        FeedConfig::named("hardwareswap"),
    ]
}

/// Match rule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Keywords searched for (case-insensitive).
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Part of the title that is searched.
    #[serde(default)]
    pub scope: MatchScope,
}

fn default_keywords() -> Vec<String> {
    vec!["ipad".to_string(), "ipad pro".to_string()]
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            scope: MatchScope::default(),
        }
    }
}

/// Kind of feed source.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Reddit listing API.
    #[default]
    Reddit,
    /// RSS or Atom feed URLs.
    Rss,
}

/// Feed source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source kind.
    #[serde(default)]
    pub kind: SourceKind,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Reddit OAuth client ID.
    #[serde(default)]
    pub client_id: String,
    /// Reddit OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_user_agent() -> String {
    "SwapMonitor/1.0".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            user_agent: default_user_agent(),
            client_id: String::new(),
            client_secret: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// Notification channel.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    /// SMTP email.
    #[default]
    Email,
    /// Log line only (dry run).
    Log,
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Delivery channel.
    #[serde(default)]
    pub channel: NotifyChannel,
    /// SMTP server hostname.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP server port. 465 uses implicit TLS.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Use STARTTLS on ports other than 465.
    #[serde(default = "default_smtp_tls")]
    pub tls: bool,
    /// SMTP timeout in seconds.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,
    /// SMTP username.
    #[serde(default)]
    pub username: String,
    /// SMTP password.
    #[serde(default)]
    pub password: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_smtp_tls() -> bool {
    true
}

fn default_smtp_timeout() -> u64 {
    30
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: NotifyChannel::default(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            tls: default_smtp_tls(),
            timeout_secs: default_smtp_timeout(),
            from: String::new(),
            to: vec![],
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Seen store backend.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map, lost on restart.
    #[default]
    Memory,
    /// SQLite file.
    Sqlite,
    /// Redis with native key expiry.
    Redis,
}

impl StoreBackend {
    /// Whether entries survive a restart.
    pub fn is_persistent(self) -> bool {
        !matches!(self, StoreBackend::Memory)
    }
}

/// Seen store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Retention window in seconds. Defaults depend on the backend.
    #[serde(default)]
    pub retention_secs: Option<u64>,
    /// SQLite database path.
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Redis connection URL.
    #[serde(default)]
    pub url: String,
}

fn default_store_path() -> String {
    "data/seen.db".to_string()
}

/// Default retention for the in-memory store (60 minutes).
pub const DEFAULT_MEMORY_RETENTION_SECS: u64 = 60 * 60;

/// Default retention for persistent stores (24 hours).
pub const DEFAULT_PERSISTENT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Longest accepted retention window (one year).
pub const MAX_RETENTION_SECS: u64 = 365 * 24 * 60 * 60;

impl StoreConfig {
    /// Effective retention window.
    pub fn retention(&self) -> Duration {
        let secs = self.retention_secs.unwrap_or(if self.backend.is_persistent() {
            DEFAULT_PERSISTENT_RETENTION_SECS
        } else {
            DEFAULT_MEMORY_RETENTION_SECS
        });
        Duration::from_secs(secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            retention_secs: None,
            path: default_store_path(),
            url: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Poll loop configuration.
    #[serde(default)]
    pub poll: PollConfig,
    /// Polled feeds.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
    /// Match rule.
    #[serde(default)]
    pub rule: RuleConfig,
    /// Feed source.
    #[serde(default)]
    pub source: SourceConfig,
    /// Notification channel.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Seen store.
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            poll: PollConfig::default(),
            feeds: default_feeds(),
            rule: RuleConfig::default(),
            source: SourceConfig::default(),
            notify: NotifyConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MonitorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration with environment overrides, or `None` when the file
    /// does not exist.
    ///
    /// Any other failure, including a file that does not parse, is an error.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        match Self::load_with_env(path) {
            Ok(config) => Ok(Some(config)),
            Err(MonitorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MonitorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Credentials are expected to come from the environment (or a `.env`
    /// file) rather than from `config.toml`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using the given lookup function.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_REDDIT_CLIENT_ID) {
            self.source.client_id = v;
        }
        if let Some(v) = get(ENV_REDDIT_CLIENT_SECRET) {
            self.source.client_secret = v;
        }
        if let Some(v) = get(ENV_EMAIL_FROM) {
            self.notify.from = v;
        }
        if let Some(v) = get(ENV_EMAIL_TO) {
            self.notify.to = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get(ENV_EMAIL_USERNAME) {
            self.notify.username = v;
        }
        if let Some(v) = get(ENV_EMAIL_PASSWORD) {
            self.notify.password = v;
        }
        if let Some(v) = get(ENV_REDIS_URL) {
            self.store.url = v;
        }
    }

    /// List every configuration problem.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.poll.interval_secs == 0 {
            problems.push("poll.interval_secs must be > 0".to_string());
        }
        if self.poll.retry_delay_secs == 0 {
            problems.push("poll.retry_delay_secs must be > 0".to_string());
        }
        if self.poll.limit == 0 {
            problems.push("poll.limit must be > 0".to_string());
        }
        if self.feeds.is_empty() {
            problems.push("no feeds configured".to_string());
        }
        if self.rule.keywords.iter().all(|k| k.trim().is_empty()) {
            problems.push("rule.keywords has no usable keyword".to_string());
        }

        match self.source.kind {
            SourceKind::Reddit => {
                if self.source.client_id.is_empty() {
                    problems.push(format!("missing {ENV_REDDIT_CLIENT_ID}"));
                }
                if self.source.client_secret.is_empty() {
                    problems.push(format!("missing {ENV_REDDIT_CLIENT_SECRET}"));
                }
            }
            SourceKind::Rss => {
                for feed in self.feeds.iter().filter(|f| f.url.is_none()) {
                    problems.push(format!("feed '{}' has no url", feed.name));
                }
            }
        }

        if self.notify.channel == NotifyChannel::Email {
            if self.notify.from.is_empty() {
                problems.push(format!("missing {ENV_EMAIL_FROM}"));
            }
            if self.notify.to.is_empty() {
                problems.push(format!("missing {ENV_EMAIL_TO}"));
            }
            if self.notify.username.is_empty() {
                problems.push(format!("missing {ENV_EMAIL_USERNAME}"));
            }
            if self.notify.password.is_empty() {
                problems.push(format!("missing {ENV_EMAIL_PASSWORD}"));
            }
        }

        if self.store.backend == StoreBackend::Redis && self.store.url.is_empty() {
            problems.push(format!("store.backend is redis but {ENV_REDIS_URL} is not set"));
        }
        match self.store.retention_secs {
            Some(0) => problems.push("store.retention_secs must be > 0".to_string()),
            Some(secs) if secs > MAX_RETENTION_SECS => problems.push(format!(
                "store.retention_secs must be <= {MAX_RETENTION_SECS}"
            )),
            _ => {}
        }

        problems
    }

    /// Validate the configuration.
    ///
    /// Returns a `Config` error listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Config(problems.join("; ")))
        }
    }
}

/// Mask a secret for logging, keeping only the first three characters.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(3).collect();
    format!("{prefix}{}", "*".repeat(10))
}
