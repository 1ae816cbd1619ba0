//! In-memory backend.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::KeyValueBackend;
use crate::error::MailError;

/// Thread-safe in-memory key/value storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create wrapped in an Arc for sharing between stores.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Namespaces currently holding a value.
    pub fn namespaces(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueBackend for MemoryBackend {
    fn load(&self, namespace: &str) -> Result<Option<String>, MailError> {
        Ok(self.values.read().get(namespace).cloned())
    }

    fn save(&self, namespace: &str, value: &str) -> Result<(), MailError> {
        self.values
            .write()
            .insert(namespace.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<(), MailError> {
        self.values.write().remove(namespace);
        Ok(())
    }
}
