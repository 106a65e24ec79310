//! SMTP email notifier via `lettre`.
//!
//! Port 465 uses implicit TLS; other ports use STARTTLS, or plain SMTP when
//! `tls = false`.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::Notifier;
use crate::config::NotifyConfig;
use crate::{MonitorError, Result};

/// Sends notifications as plain-text emails.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build a notifier from configuration.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                MonitorError::Config(format!("invalid sender '{}': {e}", config.from))
            })?;

        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse().map_err(|e: lettre::address::AddressError| {
                    MonitorError::Config(format!("invalid recipient '{addr}': {e}"))
                })
            })
            .collect::<Result<Vec<Mailbox>>>()?;

        if to.is_empty() {
            return Err(MonitorError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let host = config.smtp_host.as_str();
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MonitorError::Config(format!("SMTP setup failed: {e}")))?
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MonitorError::Config(format!("SMTP setup failed: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let mut message = Message::builder().from(self.from.clone());
        for recipient in &self.to {
            message = message.to(recipient.clone());
        }

        let email = message
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MonitorError::Notify(format!("failed to build email: {e}")))?;

        self.transport.send(email).await.map_err(|e| {
            let code = e.status().map(|c| c.to_string());
            if code.as_deref().is_some_and(is_auth_code) {
                MonitorError::NotifyAuth(e.to_string())
            } else {
                MonitorError::Notify(e.to_string())
            }
        })?;

        info!(
            channel = "email",
            subject = %subject,
            recipients = self.to.len(),
            "notification delivered"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

/// SMTP reply codes meaning the credentials were refused.
fn is_auth_code(code: &str) -> bool {
    matches!(code, "530" | "534" | "535")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotifyConfig {
        NotifyConfig {
            from: "monitor@example.com".to_string(),
            to: vec!["me@example.com".to_string(), "you@example.com".to_string()],
            username: "monitor@example.com".to_string(),
            password: "app-password".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_auth_codes() {
        assert!(is_auth_code("535"));
        assert!(is_auth_code("534"));
        assert!(is_auth_code("530"));
        assert!(!is_auth_code("421"));
        assert!(!is_auth_code("550"));
    }

    #[test]
    fn test_from_config_implicit_tls() {
        let notifier = EmailNotifier::from_config(&config()).unwrap();
        assert_eq!(notifier.to.len(), 2);
        assert_eq!(notifier.from.email.to_string(), "monitor@example.com");
    }

    #[test]
    fn test_from_config_starttls_and_plain() {
        let mut cfg = config();
        cfg.smtp_port = 587;
        assert!(EmailNotifier::from_config(&cfg).is_ok());

        cfg.tls = false;
        cfg.smtp_port = 25;
        assert!(EmailNotifier::from_config(&cfg).is_ok());
    }

    #[test]
    fn test_from_config_invalid_sender() {
        let mut cfg = config();
        cfg.from = "not-an-email".to_string();
        let err = EmailNotifier::from_config(&cfg).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_from_config_requires_recipient() {
        let mut cfg = config();
        cfg.to.clear();
        assert!(EmailNotifier::from_config(&cfg).is_err());
    }
}
