//! Durable credential storage
//!
//! Credentials live in `<data dir>/tvshell/credentials.toml`. A record only
//! counts as signed in when both the email and the token are present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::models::Credentials;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode credentials: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Where signed-in state survives restarts
pub trait CredentialStore: Send {
    /// Stored credentials, or `None` unless both fields are present
    fn load(&self) -> Option<Credentials>;
    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecord {
    user_email: Option<String>,
    user_auth_token: Option<String>,
}

impl StoredRecord {
    fn into_credentials(self) -> Option<Credentials> {
        match (self.user_email, self.user_auth_token) {
            (Some(email), Some(auth_token)) if !email.is_empty() && !auth_token.is_empty() => {
                Some(Credentials { email, auth_token })
            }
            _ => None,
        }
    }
}

/// TOML file store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Default location (`<data dir>/tvshell/credentials.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("tvshell").join("credentials.toml"))
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::default_path()
            .map(Self::at)
            .ok_or(StoreError::NoDataDir)
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Option<Credentials> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| toml::from_str::<StoredRecord>(&s).ok())
            .and_then(StoredRecord::into_credentials)
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let record = StoredRecord {
            user_email: Some(credentials.email.clone()),
            user_auth_token: Some(credentials.auth_token.clone()),
        };
        std::fs::write(&self.path, toml::to_string_pretty(&record)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            record: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Option<Credentials> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        if let Ok(mut record) = self.record.lock() {
            *record = Some(credentials.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        if let Ok(mut record) = self.record.lock() {
            *record = None;
        }
        Ok(())
    }
}
