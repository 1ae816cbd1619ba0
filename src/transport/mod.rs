//! Transport trait, the SMTP/SendGrid dispatcher and the boolean delivery boundary.
//!
//! # Why `async_trait`?
//!
//! The bulk sender and the HTTP service hold an `Arc<dyn Transport>` so the real
//! [`Dispatcher`] can be swapped for a [`LocalTransport`] in tests. Native async
//! traits are not object-safe, so `#[async_trait]` boxes the futures. The cost is
//! one allocation per send, which network latency dwarfs.
//!
//! ## Available transports
//!
//! | Type | Feature Flag | Description |
//! |------|-------------|-------------|
//! | [`Dispatcher`] | `smtp`, `sendgrid` | Routes on the server's variant |
//! | [`SmtpSender`] | `smtp` | SMTP via lettre |
//! | [`SendGridSender`] | `sendgrid` | SendGrid v3 API |
//! | [`LocalTransport`] | `local` | In-memory capture for tests |

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::MailError;
use crate::message::OutgoingMessage;
use crate::server::{OutboundServer, ServerKind};

#[cfg(feature = "smtp")]
mod smtp;
#[cfg(feature = "smtp")]
pub use smtp::SmtpSender;

#[cfg(feature = "sendgrid")]
mod sendgrid;
#[cfg(feature = "sendgrid")]
pub use sendgrid::SendGridSender;

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "local")]
pub use local::{LocalTransport, SentMessage};

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// Message ID assigned by the provider (generated when the provider gives none)
    pub message_id: String,
    pub provider: &'static str,
}

impl DeliveryReceipt {
    pub fn new(provider: &'static str, message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            provider,
        }
    }
}

/// Sends one message through one outbound server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single message. Exactly one outbound call, no retries.
    ///
    /// Missing server fields must fail with [`MailError::Configuration`]
    /// before any network activity.
    async fn send(
        &self,
        server: &OutboundServer,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        server: &OutboundServer,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError> {
        (**self).send(server, message).await
    }
}

/// Send through `transport` and reduce the outcome to success/failure.
///
/// Errors are logged here and never propagate; the bulk sender only ever sees the
/// boolean.
pub async fn deliver<T: Transport + ?Sized>(
    transport: &T,
    server: &OutboundServer,
    message: &OutgoingMessage,
) -> bool {
    let provider = server.provider_name();

    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let result = transport.send(server, message).await;

    #[cfg(feature = "metrics")]
    {
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("bulkmail_messages_total", "provider" => provider, "status" => status)
            .increment(1);
        metrics::histogram!("bulkmail_delivery_duration_seconds", "provider" => provider)
            .record(start.elapsed().as_secs_f64());
    }

    match result {
        Ok(receipt) => {
            tracing::debug!(
                provider,
                to = %message.to,
                message_id = %receipt.message_id,
                "Email delivered"
            );
            true
        }
        Err(e) => {
            tracing::error!(provider, to = %message.to, error = %e, "Failed to send email");
            false
        }
    }
}

/// The production transport: routes each send to SMTP or SendGrid by server variant.
pub struct Dispatcher {
    #[cfg(feature = "smtp")]
    smtp: SmtpSender,
    #[cfg(feature = "sendgrid")]
    sendgrid: SendGridSender,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "smtp")]
            smtp: SmtpSender::new(),
            #[cfg(feature = "sendgrid")]
            sendgrid: SendGridSender::new(),
        }
    }

    /// Build from runtime configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        #[cfg(not(any(feature = "smtp", feature = "sendgrid")))]
        let _ = config;

        Self {
            #[cfg(feature = "smtp")]
            smtp: SmtpSender::new().timeout(config.smtp_timeout),
            #[cfg(feature = "sendgrid")]
            sendgrid: SendGridSender::new().base_url(config.sendgrid_base_url.clone()),
        }
    }

    /// Replace the SMTP sender.
    #[cfg(feature = "smtp")]
    pub fn with_smtp(mut self, smtp: SmtpSender) -> Self {
        self.smtp = smtp;
        self
    }

    /// Replace the SendGrid sender (e.g., to point at a mock server).
    #[cfg(feature = "sendgrid")]
    pub fn with_sendgrid(mut self, sendgrid: SendGridSender) -> Self {
        self.sendgrid = sendgrid;
        self
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for Dispatcher {
    async fn send(
        &self,
        server: &OutboundServer,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError> {
        match &server.kind {
            #[cfg(feature = "smtp")]
            ServerKind::Smtp(settings) => self.smtp.send(settings, message).await,
            #[cfg(not(feature = "smtp"))]
            ServerKind::Smtp(_) => Err(MailError::Configuration(
                "SMTP server selected but 'smtp' feature is not enabled. \
                Add `features = [\"smtp\"]` to Cargo.toml"
                    .into(),
            )),

            #[cfg(feature = "sendgrid")]
            ServerKind::SendGrid(settings) => self.sendgrid.send(settings, message).await,
            #[cfg(not(feature = "sendgrid"))]
            ServerKind::SendGrid(_) => Err(MailError::Configuration(
                "SendGrid server selected but 'sendgrid' feature is not enabled. \
                Add `features = [\"sendgrid\"]` to Cargo.toml"
                    .into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{SendGridSettings, SmtpSettings};

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "me@example.com".into(),
            sender_name: "Me".into(),
            to: "you@example.com".into(),
            subject: "Hi".into(),
            content: "<p>Hi</p>".into(),
        }
    }

    #[cfg(feature = "sendgrid")]
    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let server = OutboundServer {
            id: "sg".into(),
            kind: ServerKind::SendGrid(SendGridSettings { api_key: None }),
            status: Default::default(),
        };
        let err = Dispatcher::new().send(&server, &message()).await.unwrap_err();
        assert_eq!(err.to_string(), "SendGrid API key is required");
    }

    #[cfg(feature = "smtp")]
    #[tokio::test]
    async fn test_missing_host_fails_before_network() {
        let server = OutboundServer::smtp(SmtpSettings::default());
        let err = Dispatcher::new().send(&server, &message()).await.unwrap_err();
        assert_eq!(err.to_string(), "SMTP host and port are required");
    }

    #[tokio::test]
    async fn test_deliver_converts_errors_to_false() {
        let server = OutboundServer::smtp(SmtpSettings::default());
        assert!(!deliver(&Dispatcher::new(), &server, &message()).await);
    }
}
