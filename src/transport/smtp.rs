//! SMTP transport using lettre.
//!
//! A connection is built per send from the server's settings: port 465 uses
//! implicit TLS, other ports upgrade with STARTTLS when the server offers it,
//! and root servers skip authentication.

use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::DeliveryReceipt;
use crate::error::MailError;
use crate::message::OutgoingMessage;
use crate::server::SmtpSettings;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS mode for an SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Upgrade with STARTTLS if the server advertises it.
    Opportunistic,
    /// Implicit TLS - connect with TLS from start (port 465)
    Implicit,
}

impl TlsMode {
    pub fn for_settings(settings: &SmtpSettings) -> Self {
        if settings.implicit_tls() {
            Self::Implicit
        } else {
            Self::Opportunistic
        }
    }
}

/// Sends messages through the SMTP relay described by [`SmtpSettings`].
#[derive(Debug, Clone)]
pub struct SmtpSender {
    timeout: Duration,
}

impl SmtpSender {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the connection/command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one message. Configuration is checked before connecting.
    pub async fn send(
        &self,
        settings: &SmtpSettings,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError> {
        let transport = self.build_transport(settings)?;
        let email = build_message(message)?;

        let response = transport.send(email).await?;

        // Extract message ID from SMTP response, or generate one
        let message_id = response
            .message()
            .next()
            .and_then(|m| m.lines().next())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(DeliveryReceipt::new("smtp", message_id))
    }

    fn build_transport(
        &self,
        settings: &SmtpSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let (host, port) = settings.endpoint()?;

        let parameters = TlsParameters::new(host.to_string())?;
        let tls = match TlsMode::for_settings(settings) {
            TlsMode::Implicit => Tls::Wrapper(parameters),
            TlsMode::Opportunistic => Tls::Opportunistic(parameters),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(tls)
            .timeout(Some(self.timeout));

        if let Some((username, password)) = settings.auth() {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }

        Ok(builder.build())
    }
}

impl Default for SmtpSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the lettre message: HTML body, `"<senderName>" <from>` sender.
fn build_message(message: &OutgoingMessage) -> Result<Message, MailError> {
    let sender = message.sender();
    let from = Mailbox::new(sender.name, sender.email.parse()?);
    let to = Mailbox::new(None, message.to.parse()?);

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(&message.subject)
        .header(ContentType::TEXT_HTML)
        .body(message.content.clone())?;

    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "news@example.com".into(),
            sender_name: "Alice".into(),
            to: "bob@example.com".into(),
            subject: "Hello".into(),
            content: "<h1>Hello</h1>".into(),
        }
    }

    #[test]
    fn test_build_message_headers() {
        let email = build_message(&message()).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("From: "));
        assert!(raw.contains("Alice"));
        assert!(raw.contains("<news@example.com>"));
        assert!(raw.contains("bob@example.com"));
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut msg = message();
        msg.to = "not an address".into();
        assert!(matches!(
            build_message(&msg),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_tls_mode() {
        assert_eq!(
            TlsMode::for_settings(&SmtpSettings::new("h", "465")),
            TlsMode::Implicit
        );
        assert_eq!(
            TlsMode::for_settings(&SmtpSettings::new("h", "587")),
            TlsMode::Opportunistic
        );
        assert_eq!(
            TlsMode::for_settings(&SmtpSettings::new("h", "0").root_server()),
            TlsMode::Opportunistic
        );
    }

    #[test]
    fn test_transport_requires_host_and_port() {
        let Err(err) = SmtpSender::new().build_transport(&SmtpSettings::default()) else {
            panic!("expected configuration error");
        };
        assert_eq!(err.to_string(), "SMTP host and port are required");
    }
}
