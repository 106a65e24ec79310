//! Error types for Swap Monitor.

use thiserror::Error;

/// Common error type for Swap Monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration error (missing or invalid value).
    ///
    /// Detected at startup and fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feed fetch or parse error.
    #[error("feed error ({feed}): {message}")]
    Feed {
        /// Feed that failed.
        feed: String,
        /// Failure description.
        message: String,
        /// Whether a later attempt may succeed (timeouts, 5xx, rate limits).
        retryable: bool,
    },

    /// Feed credentials were rejected.
    #[error("feed authentication failed: {0}")]
    FeedAuth(String),

    /// Notification delivery failed.
    #[error("notification failed: {0}")]
    Notify(String),

    /// Notification credentials were rejected.
    #[error("notification authentication failed: {0}")]
    NotifyAuth(String),

    /// Seen store backend error.
    #[error("seen store error: {0}")]
    Store(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    Validation(String),
}

impl MonitorError {
    /// Create a retryable feed error.
    pub fn feed_transient(feed: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Feed {
            feed: feed.into(),
            message: message.to_string(),
            retryable: true,
        }
    }

    /// Create a non-retryable feed error.
    pub fn feed_permanent(feed: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Feed {
            feed: feed.into(),
            message: message.to_string(),
            retryable: false,
        }
    }

    /// Whether the failure is expected to clear up on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Feed { retryable, .. } => *retryable,
            Self::Io(_) | Self::Notify(_) | Self::Store(_) => true,
            _ => false,
        }
    }

    /// Whether credentials were rejected by a collaborator.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::FeedAuth(_) | Self::NotifyAuth(_))
    }

    /// Whether the process cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for MonitorError {
    fn from(e: sqlx::Error) -> Self {
        MonitorError::Store(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for MonitorError {
    fn from(e: redis::RedisError) -> Self {
        MonitorError::Store(e.to_string())
    }
}

/// Result type alias for Swap Monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
