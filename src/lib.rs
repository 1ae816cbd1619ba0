//! # bulkmail
//!
//! Bulk email campaigns over SMTP or SendGrid: paced one-at-a-time sending with
//! round-robin sender names, persisted servers/lists/drafts, and rolling
//! delivery analytics.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bulkmail::{BulkRequest, BulkSender, OutboundServer};
//! use bulkmail::transport::Dispatcher;
//!
//! let sender = BulkSender::new(Arc::new(Dispatcher::new()));
//! let server = OutboundServer::sendgrid("SG.xxxxx");
//!
//! let result = sender
//!     .run(&server, &BulkRequest {
//!         from: "news@example.com".into(),
//!         sender_names: vec!["Alice".into(), "Bob".into()],
//!         to: vec!["a@example.com".into(), "b@example.com".into()],
//!         subject: "Launch".into(),
//!         content: "<p>Hello</p>".into(),
//!     })
//!     .await?;
//!
//! assert_eq!(result.delivered + result.failed, result.sent);
//! ```
//!
//! ## Environment Variables
//!
//! Read by [`Config::from_env`]:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BULKMAIL_ADDR` | `127.0.0.1:3000` | HTTP listen address |
//! | `BULKMAIL_DATA_DIR` | `./data` | Persisted state directory |
//! | `BULKMAIL_SEND_INTERVAL_MS` | `200` | Pause between sends |
//! | `BULKMAIL_SKIP_TRAILING_DELAY` | `false` | Skip the pause after the last recipient |
//! | `SENDGRID_BASE_URL` | `https://api.sendgrid.com/v3` | SendGrid API root |
//! | `SMTP_TIMEOUT_SECS` | `30` | SMTP connection timeout |
//!
//! ## Feature Flags
//!
//! - `smtp` - SMTP transport via lettre
//! - `sendgrid` - SendGrid v3 API transport
//! - `local` - `LocalTransport` and `testing` assertions
//! - `server` - axum HTTP API and the `bulkmail` binary
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `bulkmail_messages_total` | Counter | provider, status | Messages attempted |
//! | `bulkmail_delivery_duration_seconds` | Histogram | provider | Per-message send time |
//! | `bulkmail_runs_total` | Counter | provider | Bulk runs started |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) in your app to collect them.

/// The version of the bulkmail crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod analytics;
mod campaign;
mod config;
mod dashboard;
mod error;
mod message;
mod server;
mod template;
mod throttle;

pub mod store;
pub mod transport;

#[cfg(feature = "local")]
pub mod testing;

#[cfg(feature = "server")]
pub mod http;

// Re-exports
pub use address::Address;
pub use analytics::{AnalyticsEntry, AnalyticsLog, AnalyticsSummary, DATE_LABEL_FORMAT, WINDOW};
pub use campaign::{progress_percent, BulkSender, SendResult};
pub use config::Config;
pub use dashboard::{CampaignPlan, Dashboard};
pub use error::MailError;
pub use message::{parse_recipients, parse_sender_names, BulkRequest, OutgoingMessage};
pub use server::{
    OutboundServer, SendGridSettings, ServerKind, ServerStatus, SmtpSettings, ROOT_SERVER_PORT,
};
pub use store::{
    AnalyticsStore, CredentialStore, DraftMessage, DraftStore, KeyValueBackend,
    RecipientList, RecipientListStore,
};
pub use template::{render_campaign_html, CampaignTemplate};
pub use throttle::{Throttle, DEFAULT_SEND_INTERVAL};
pub use transport::{deliver, DeliveryReceipt, Dispatcher, Transport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        deliver, BulkRequest, BulkSender, Dashboard, DraftMessage, MailError, OutboundServer,
        OutgoingMessage, SendResult, ServerStatus, SmtpSettings, Throttle, Transport,
    };

    #[cfg(feature = "local")]
    pub use crate::transport::LocalTransport;
}
