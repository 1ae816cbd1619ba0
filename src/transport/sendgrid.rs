//! SendGrid v3 API transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use bulkmail::transport::SendGridSender;
//!
//! // Point at a mock server in tests, gzip request bodies in production.
//! let sender = SendGridSender::new().base_url(server.uri()).compress(true);
//! ```

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;

use super::DeliveryReceipt;
use crate::error::MailError;
use crate::message::OutgoingMessage;
use crate::server::SendGridSettings;

/// Default API root.
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

/// Sends messages through the SendGrid `mail/send` endpoint.
///
/// The API key comes from the server settings on each send; one client is shared.
#[derive(Debug, Clone)]
pub struct SendGridSender {
    client: Client,
    base_url: String,
    compress: bool,
}

impl SendGridSender {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: SENDGRID_API_URL.to_string(),
            compress: false,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable gzip compression for requests.
    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Send one message. A missing API key fails before any request is made.
    pub async fn send(
        &self,
        settings: &SendGridSettings,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, MailError> {
        let api_key = settings.api_key()?;
        let request = build_request(message);

        let url = format!("{}/mail/send", self.base_url);
        let json_body = serde_json::to_vec(&request)?;

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("bulkmail/{}", crate::VERSION));

        let body = if self.compress {
            req = req.header("Content-Encoding", "gzip");
            compress_body(&json_body)?
        } else {
            json_body
        };

        let response = req.body(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: ApiErrors = response.json().await.unwrap_or_default();
            return Err(MailError::provider_with_status(
                "sendgrid",
                body.summary(),
                status.as_u16(),
            ));
        }

        // 202 with an empty body; the id only comes back as a header.
        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(DeliveryReceipt::new("sendgrid", message_id))
    }
}

impl Default for SendGridSender {
    fn default() -> Self {
        Self::new()
    }
}

fn build_request(message: &OutgoingMessage) -> MailSend<'_> {
    let name = Some(message.sender_name.as_str()).filter(|n| !n.is_empty());
    MailSend {
        personalizations: [Personalization {
            to: [Mailbox {
                email: &message.to,
                name: None,
            }],
        }],
        from: Mailbox {
            email: &message.from,
            name,
        },
        subject: &message.subject,
        content: [Part {
            mime: "text/html",
            value: &message.content,
        }],
    }
}

fn compress_body(body: &[u8]) -> Result<Vec<u8>, MailError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body)
        .map_err(|e| MailError::provider("sendgrid", format!("Failed to compress body: {}", e)))?;
    encoder.finish().map_err(|e| {
        MailError::provider("sendgrid", format!("Failed to finish compression: {}", e))
    })
}

// ============================================================================
// Wire format
// ============================================================================

/// `POST /mail/send` body: one personalization, one HTML part.
#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Mailbox<'a>,
    subject: &'a str,
    content: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Mailbox<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Mailbox<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    #[serde(rename = "type")]
    mime: &'static str,
    value: &'a str,
}

/// Error body: `{"errors": [{"message": "...", "field": "..."}]}`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ApiErrors {
    fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "Unknown error".to_string();
        }
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let message = OutgoingMessage {
            from: "news@example.com".into(),
            sender_name: "Alice".into(),
            to: "bob@example.com".into(),
            subject: "Hello".into(),
            content: "<p>Hi</p>".into(),
        };

        let body = serde_json::to_value(build_request(&message)).unwrap();
        assert_eq!(
            body,
            json!({
                "personalizations": [{"to": [{"email": "bob@example.com"}]}],
                "from": {"email": "news@example.com", "name": "Alice"},
                "subject": "Hello",
                "content": [{"type": "text/html", "value": "<p>Hi</p>"}]
            })
        );
    }

    #[test]
    fn test_compress_body_is_gzip() {
        let out = compress_body(b"{}").unwrap();
        assert_eq!(&out[..2], &[0x1f, 0x8b]);
    }
}
