//! Error types for bulkmail.

use thiserror::Error;

/// Errors that can occur while configuring, sending, or persisting campaigns.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Server configuration is incomplete (missing host/port, API key, ...).
    ///
    /// The message is shown verbatim at the HTTP boundary.
    #[error("{0}")]
    Configuration(String),

    /// A from or to address that SMTP refused to parse.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Draft failed validation before a run could start.
    #[error("{0}")]
    Validation(String),

    /// A bulk run was requested without any sender names to rotate through.
    #[error("At least one sender name is required")]
    NoSenderNames,

    /// No server with status `Active` is configured.
    #[error("Please configure an email server first")]
    NoActiveServer,

    /// The draft points at a recipient list that does not exist.
    #[error("Selected list not found")]
    ListNotFound(String),

    /// A bulk run is already in progress.
    #[error("A bulk run is already in progress")]
    Busy,

    /// The SMTP message could not be assembled.
    #[error("Build error: {0}")]
    BuildError(String),

    /// SMTP connection or protocol failure.
    #[error("Send error: {0}")]
    SendError(String),

    /// The provider answered with an error.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
        status: Option<u16>,
    },

    /// The SendGrid request never got a response.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Persisted state or a payload was not valid JSON.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Reading or writing persisted state failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The HTML shell failed to render.
    #[error("Template error: {0}")]
    TemplateError(String),
}

impl MailError {
    /// Provider rejection without an HTTP status.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: None,
        }
    }

    /// Provider rejection carrying the HTTP status it came with.
    pub fn provider_with_status(
        provider: &'static str,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: Some(status),
        }
    }

    /// True for errors raised before any network call was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(feature = "sendgrid")]
impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for MailError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<askama::Error> for MailError {
    fn from(err: askama::Error) -> Self {
        Self::TemplateError(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::BuildError(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::SendError(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}
