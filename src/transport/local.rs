//! In-memory transport for development and testing.
//!
//! # Testing Usage
//!
//! ```rust,ignore
//! use bulkmail::transport::LocalTransport;
//! use bulkmail::testing::*;
//!
//! #[tokio::test]
//! async fn sends_to_everyone() {
//!     let transport = LocalTransport::shared();
//!     let sender = BulkSender::new(transport.clone()).throttle(Throttle::none());
//!
//!     sender.run(&server, &request).await?;
//!
//!     assert_sent_count(&transport, 2);
//!     assert_sent_to(&transport, "a@example.com");
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{DeliveryReceipt, Transport};
use crate::error::MailError;
use crate::message::OutgoingMessage;
use crate::server::OutboundServer;

/// A message captured by [`LocalTransport`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Unique identifier for this message.
    pub id: String,
    /// Id of the server it was "sent" through.
    pub server_id: String,
    pub provider: &'static str,
    pub message: OutgoingMessage,
    pub sent_at: DateTime<Utc>,
}

/// Transport that stores messages in memory instead of sending them.
///
/// Server configuration is still validated, so a misconfigured server fails the
/// same way it would with the real dispatcher.
#[derive(Debug, Default)]
pub struct LocalTransport {
    sent: RwLock<Vec<SentMessage>>,
    attempts: AtomicUsize,
    /// If set, every send fails with this message.
    fail_with: RwLock<Option<String>>,
    /// Recipients whose sends fail.
    failing_recipients: RwLock<HashSet<String>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create wrapped in an Arc for sharing with a [`BulkSender`](crate::BulkSender).
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // =========================================================================
    // Failure Simulation (for testing)
    // =========================================================================

    /// Make every send fail with `message`.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Make sends to `recipient` fail.
    pub fn fail_recipient(&self, recipient: impl Into<String>) {
        self.failing_recipients.write().insert(recipient.into());
    }

    /// Clear all failure simulation.
    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
        self.failing_recipients.write().clear();
    }

    // =========================================================================
    // Message Access (for testing assertions)
    // =========================================================================

    /// Successfully "sent" messages, oldest first.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.read().clone()
    }

    /// The most recently sent message.
    pub fn last_message(&self) -> Option<SentMessage> {
        self.sent.read().last().cloned()
    }

    pub fn message_count(&self) -> usize {
        self.sent.read().len()
    }

    /// Number of `send` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Remove and return all captured messages.
    pub fn flush(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.write())
    }

    pub fn clear(&self) {
        self.sent.write().clear();
        self.attempts.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(
        &self,
        server: &OutboundServer,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError> {
        server.validate()?;
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(ref error) = *self.fail_with.read() {
            return Err(MailError::SendError(error.clone()));
        }
        if self.failing_recipients.read().contains(&message.to) {
            return Err(MailError::provider(
                server.provider_name(),
                format!("rejected recipient {}", message.to),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.sent.write().push(SentMessage {
            id: id.clone(),
            server_id: server.id.clone(),
            provider: server.provider_name(),
            message: message.clone(),
            sent_at: Utc::now(),
        });

        tracing::debug!(message_id = %id, to = %message.to, "Email stored locally");

        Ok(DeliveryReceipt::new(server.provider_name(), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::SmtpSettings;

    fn message(to: &str) -> OutgoingMessage {
        OutgoingMessage {
            from: "me@example.com".into(),
            sender_name: "Me".into(),
            to: to.into(),
            subject: "Hi".into(),
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn test_records_and_fails() {
        let transport = LocalTransport::new();
        let server = OutboundServer::smtp(SmtpSettings::new("h", "25"));

        transport.fail_recipient("bad@example.com");
        assert!(transport.send(&server, &message("ok@example.com")).await.is_ok());
        assert!(transport.send(&server, &message("bad@example.com")).await.is_err());

        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.message_count(), 1);
        assert_eq!(transport.last_message().unwrap().server_id, server.id);

        transport.set_failure("down");
        assert!(transport.send(&server, &message("ok@example.com")).await.is_err());
        transport.clear_failure();
        assert!(transport.send(&server, &message("bad@example.com")).await.is_ok());

        assert_eq!(transport.flush().len(), 2);
        assert_eq!(transport.message_count(), 0);
    }

    #[tokio::test]
    async fn test_validates_server() {
        let transport = LocalTransport::new();
        let server = OutboundServer::smtp(SmtpSettings::default());

        let err = transport.send(&server, &message("a@example.com")).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(transport.attempts(), 0);
    }
}
