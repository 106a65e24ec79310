//! Notification channels.

pub mod email;
pub mod log;

pub use email::EmailNotifier;
pub use log::LogNotifier;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{NotifyChannel, NotifyConfig};
use crate::Result;

/// Delivers a notification for a relevant item.
///
/// Implementations bound delivery with a timeout and report rejected
/// credentials as [`crate::MonitorError::NotifyAuth`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    async fn send(&self, subject: &str, body: &str) -> Result<()>;

    /// Channel name, e.g. `"email"`.
    fn channel_name(&self) -> &str;
}

/// Build the notifier selected by configuration.
pub fn build_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.channel {
        NotifyChannel::Email => Arc::new(EmailNotifier::from_config(config)?),
        NotifyChannel::Log => Arc::new(LogNotifier),
    };
    Ok(notifier)
}
