//! Runtime configuration loaded from environment variables.
//!
//! Every setting has a default so the service starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MailError;
use crate::throttle::{Throttle, DEFAULT_SEND_INTERVAL};

/// Default SendGrid API root.
pub const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com/v3";

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen address.
    /// Env: `BULKMAIL_ADDR`
    /// Default: `127.0.0.1:3000`
    pub bind_addr: SocketAddr,

    /// Directory holding persisted state, one JSON file per namespace.
    /// Env: `BULKMAIL_DATA_DIR`
    /// Default: `./data`
    pub data_dir: PathBuf,

    /// Pause between consecutive sends of a bulk run.
    /// Env: `BULKMAIL_SEND_INTERVAL_MS`
    /// Default: `200`
    pub send_interval: Duration,

    /// Skip the pause after the last recipient.
    /// Env: `BULKMAIL_SKIP_TRAILING_DELAY` (true/false)
    /// Default: `false`
    pub skip_trailing_delay: bool,

    /// Env: `SENDGRID_BASE_URL`
    pub sendgrid_base_url: String,

    /// Env: `SMTP_TIMEOUT_SECS`
    /// Default: `30`
    pub smtp_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 3000).into(),
            data_dir: PathBuf::from("./data"),
            send_interval: DEFAULT_SEND_INTERVAL,
            skip_trailing_delay: false,
            sendgrid_base_url: DEFAULT_SENDGRID_BASE_URL.to_string(),
            smtp_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, MailError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Unset variables keep their default;
    /// set but unparsable ones are a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "BULKMAIL_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("BULKMAIL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BULKMAIL_SEND_INTERVAL_MS")? {
            config.send_interval = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("BULKMAIL_SKIP_TRAILING_DELAY") {
            config.skip_trailing_delay = parse_bool("BULKMAIL_SKIP_TRAILING_DELAY", &val)?;
        }
        if let Some(url) = lookup("SENDGRID_BASE_URL") {
            config.sendgrid_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "SMTP_TIMEOUT_SECS")? {
            config.smtp_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Pacing for bulk runs.
    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.send_interval).skip_trailing(self.skip_trailing_delay)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, MailError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| MailError::Configuration(format!("Invalid {}: {}", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, MailError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(MailError::Configuration(format!("Invalid {}: {}", key, raw))),
    }
}
