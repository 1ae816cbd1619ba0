//! File backend: one JSON file per namespace.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::KeyValueBackend;
use crate::error::MailError;

/// Stores each namespace as `<dir>/<namespace>.json`.
///
/// Writes go to a temporary file that is then renamed over the old one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: &str) -> Result<PathBuf, MailError> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MailError::Storage(format!(
                "invalid namespace '{}'",
                namespace
            )));
        }
        Ok(self.dir.join(format!("{}.json", namespace)))
    }
}

impl KeyValueBackend for FileBackend {
    fn load(&self, namespace: &str) -> Result<Option<String>, MailError> {
        let path = self.path_for(namespace)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MailError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, namespace: &str, value: &str) -> Result<(), MailError> {
        let path = self.path_for(namespace)?;
        fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        tracing::trace!(namespace, path = %path.display(), "State written");
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<(), MailError> {
        let path = self.path_for(namespace)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
