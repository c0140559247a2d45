//! Durable local storage for the admin credential.
//!
//! A single string survives across sessions so the persistence call can be
//! prefilled without re-prompting. It is never used to bypass the admin
//! gate; authorization still only comes from the server accepting a save.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("no config directory available")]
    NoConfigDir,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend for the persisted credential.
pub trait CredentialStore {
    /// Load the last-entered credential, if one was saved.
    fn load(&self) -> Option<String>;

    /// Persist the credential for future sessions.
    fn store(&self, credential: &str) -> StorageResult<()>;

    /// Forget the persisted credential.
    fn clear(&self) -> StorageResult<()>;
}

/// In-memory store for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.credential.read().ok()?.clone()
    }

    fn store(&self, credential: &str) -> StorageResult<()> {
        let mut slot = self
            .credential
            .write()
            .map_err(|e| StorageError::Io(format!("lock error: {}", e)))?;
        *slot = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut slot = self
            .credential
            .write()
            .map_err(|e| StorageError::Io(format!("lock error: {}", e)))?;
        *slot = None;
        Ok(())
    }
}

/// File-backed store under the user config directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store at the default location (`<config dir>/mapink/credential`).
    pub fn new() -> StorageResult<Self> {
        let dir = dirs::config_dir().ok_or(StorageError::NoConfigDir)?;
        Ok(Self::at_path(dir.join("mapink").join("credential")))
    }

    /// Store at an explicit path (used by tests).
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let trimmed = raw.trim_end_matches('\n');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn store(&self, credential: &str) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        fs::write(&self.path, credential).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().is_none());

        store.store("hunter2").unwrap();
        assert_eq!(store.load().as_deref(), Some("hunter2"));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::at_path(dir.path().join("credential"));

        assert!(store.load().is_none());
        store.store("secret").unwrap();
        assert_eq!(store.load().as_deref(), Some("secret"));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::at_path(dir.path().join("nested").join("credential"));
        store.store("secret").unwrap();
        assert_eq!(store.load().as_deref(), Some("secret"));
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::at_path(dir.path().join("credential"));
        assert!(store.clear().is_ok());
    }
}
