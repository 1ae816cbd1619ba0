//! Outbound server configurations.
//!
//! An [`OutboundServer`] is either an SMTP relay or a SendGrid API account.
//! The JSON form matches the dashboard payload:
//!
//! ```json
//! {"id": "…", "type": "smtp", "host": "smtp.example.com", "port": "587",
//!  "username": "u", "password": "p", "isRootServer": false, "status": "Active"}
//! {"id": "…", "type": "sendgrid", "apiKey": "SG.xxx", "status": "Active"}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::MailError;

/// Port used by root servers (unauthenticated relays).
pub const ROOT_SERVER_PORT: &str = "25";

/// Port that switches SMTP to implicit TLS.
pub const IMPLICIT_TLS_PORT: &str = "465";

/// Availability of a configured server. Only `Active` servers are used for sending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerStatus {
    #[default]
    Active,
    Failed,
    Disabled,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "Active",
            Self::Failed => "Failed",
            Self::Disabled => "Disabled",
        };
        f.write_str(s)
    }
}

/// A configured outbound server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundServer {
    /// Unique identifier (UUID v4 for servers created through the store).
    #[serde(default)]
    pub id: String,
    /// Transport variant and its settings.
    #[serde(flatten)]
    pub kind: ServerKind,
    #[serde(default)]
    pub status: ServerStatus,
}

/// The two transport variants. There is no fallback between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerKind {
    #[serde(rename = "smtp")]
    Smtp(SmtpSettings),
    #[serde(rename = "sendgrid")]
    SendGrid(SendGridSettings),
}

/// SMTP relay settings.
///
/// Host and port are kept optional so that incomplete configurations can be
/// stored and rejected at send time with a [`MailError::Configuration`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(
        default,
        deserialize_with = "port_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Unauthenticated relay, conventionally on port 25.
    #[serde(default)]
    pub is_root_server: bool,
}

/// SendGrid API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGridSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl OutboundServer {
    /// New active SMTP server with a fresh id.
    pub fn smtp(settings: SmtpSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ServerKind::Smtp(settings),
            status: ServerStatus::Active,
        }
    }

    /// New active SendGrid server with a fresh id.
    pub fn sendgrid(api_key: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ServerKind::SendGrid(SendGridSettings {
                api_key: Some(api_key.into()),
            }),
            status: ServerStatus::Active,
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ServerStatus::Active
    }

    /// Provider name used in logs and metrics.
    pub fn provider_name(&self) -> &'static str {
        match self.kind {
            ServerKind::Smtp(_) => "smtp",
            ServerKind::SendGrid(_) => "sendgrid",
        }
    }

    /// Check that the variant's required fields are present.
    pub fn validate(&self) -> Result<(), MailError> {
        match &self.kind {
            ServerKind::Smtp(smtp) => smtp.endpoint().map(|_| ()),
            ServerKind::SendGrid(sendgrid) => sendgrid.api_key().map(|_| ()),
        }
    }
}

impl SmtpSettings {
    /// Settings for an authenticated relay.
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port.into()),
            ..Self::default()
        }
    }

    /// Set username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Mark as a root server: no authentication, port 25.
    pub fn root_server(mut self) -> Self {
        self.is_root_server = true;
        self.port = Some(ROOT_SERVER_PORT.to_string());
        self
    }

    /// Host and numeric port, or a configuration error if either is missing.
    pub fn endpoint(&self) -> Result<(&str, u16), MailError> {
        let host = non_empty(&self.host);
        let port = non_empty(&self.port);
        let (Some(host), Some(port)) = (host, port) else {
            return Err(MailError::Configuration(
                "SMTP host and port are required".into(),
            ));
        };
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| MailError::Configuration(format!("Invalid SMTP port: {}", port)))?;
        Ok((host, port))
    }

    /// Port 465 connects with TLS from the start.
    pub fn implicit_tls(&self) -> bool {
        self.port.as_deref().map(str::trim) == Some(IMPLICIT_TLS_PORT)
    }

    /// Credentials to authenticate with, `None` for root servers.
    pub fn auth(&self) -> Option<(&str, &str)> {
        if self.is_root_server {
            return None;
        }
        Some((
            self.username.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        ))
    }
}

impl SendGridSettings {
    /// The API key, or a configuration error if it is missing or empty.
    pub fn api_key(&self) -> Result<&str, MailError> {
        non_empty(&self.api_key)
            .ok_or_else(|| MailError::Configuration("SendGrid API key is required".into()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Accept the port as either a JSON string or a number.
fn port_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(Option::<Port>::deserialize(deserializer)?.map(|port| match port {
        Port::Text(s) => s,
        Port::Number(n) => n.to_string(),
    }))
}
