//! Notifier that only writes to the log. Useful for dry runs.

use async_trait::async_trait;
use tracing::info;

use super::Notifier;
use crate::Result;

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        info!(channel = "log", subject = %subject, "{}", body.replace('\n', " | "));
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_always_succeeds() {
        let notifier = LogNotifier;
        notifier
            .send("New iPad Listing Alert", "Title: iPad\nURL: https://example.com")
            .await
            .unwrap();
    }
}
