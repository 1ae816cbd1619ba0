//! Persisted dashboard state.
//!
//! Four independent namespaces live on a [`KeyValueBackend`]:
//!
//! | Namespace | Store | Rehydration |
//! |-----------|-------|-------------|
//! | `smtp-server-storage` | [`CredentialStore`] | explicit `load()` |
//! | `email-list-storage` | [`RecipientListStore`] | explicit `load()` |
//! | `analytics-storage` | [`AnalyticsStore`] | explicit `load()` |
//! | `email-storage` | [`DraftStore`] | on `open()` |
//!
//! Each value is a JSON envelope `{"state": …, "version": 0}`. Every mutation
//! writes through to the backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

mod analytics;
mod credentials;
mod draft;
mod file;
mod lists;
mod memory;

pub use analytics::AnalyticsStore;
pub use credentials::CredentialStore;
pub use draft::{DraftMessage, DraftStore};
pub use file::FileBackend;
pub use lists::{RecipientList, RecipientListStore};
pub use memory::MemoryBackend;

/// Namespace of the credential store.
pub const SERVERS_NAMESPACE: &str = "smtp-server-storage";
/// Namespace of the recipient list store.
pub const LISTS_NAMESPACE: &str = "email-list-storage";
/// Namespace of the analytics log.
pub const ANALYTICS_NAMESPACE: &str = "analytics-storage";
/// Namespace of the draft message.
pub const DRAFT_NAMESPACE: &str = "email-storage";

/// Current envelope version.
pub const STATE_VERSION: u32 = 0;

/// Durable string key/value storage.
pub trait KeyValueBackend: Send + Sync {
    /// Read the raw value under `namespace`, `None` if never written.
    fn load(&self, namespace: &str) -> Result<Option<String>, MailError>;

    /// Replace the value under `namespace`.
    fn save(&self, namespace: &str, value: &str) -> Result<(), MailError>;

    /// Delete the value under `namespace`. Missing values are not an error.
    fn remove(&self, namespace: &str) -> Result<(), MailError>;
}

#[derive(Serialize, Deserialize)]
struct Persisted<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Read and decode the state stored under `namespace`.
pub(crate) fn read_state<T: DeserializeOwned>(
    backend: &dyn KeyValueBackend,
    namespace: &str,
) -> Result<Option<T>, MailError> {
    let Some(raw) = backend.load(namespace)? else {
        return Ok(None);
    };
    let persisted: Persisted<T> = serde_json::from_str(&raw)?;
    if persisted.version != STATE_VERSION {
        tracing::warn!(
            namespace,
            version = persisted.version,
            "Ignoring persisted state with unknown version"
        );
        return Ok(None);
    }
    Ok(Some(persisted.state))
}

/// Encode and store `state` under `namespace`.
pub(crate) fn write_state<T: Serialize>(
    backend: &dyn KeyValueBackend,
    namespace: &str,
    state: &T,
) -> Result<(), MailError> {
    let raw = serde_json::to_string(&Persisted {
        state,
        version: STATE_VERSION,
    })?;
    backend.save(namespace, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_round_trip() {
        let backend = MemoryBackend::new();
        write_state(&backend, "ns", &json!({"a": 1})).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&backend.load("ns").unwrap().unwrap()).unwrap();
        assert_eq!(raw, json!({"state": {"a": 1}, "version": 0}));

        let state: Option<serde_json::Value> = read_state(&backend, "ns").unwrap();
        assert_eq!(state, Some(json!({"a": 1})));
    }

    #[test]
    fn test_unknown_version_ignored() {
        let backend = MemoryBackend::new();
        backend
            .save("ns", r#"{"state": {"a": 1}, "version": 3}"#)
            .unwrap();
        let state: Option<serde_json::Value> = read_state(&backend, "ns").unwrap();
        assert_eq!(state, None);
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let backend = MemoryBackend::new();
        backend.save("ns", "not json").unwrap();
        let result: Result<Option<serde_json::Value>, _> = read_state(&backend, "ns");
        assert!(matches!(result, Err(MailError::JsonError(_))));
    }
}
