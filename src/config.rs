//! Configuration management for tvshell
//!
//! Handles config file loading/saving and the device id.
//! Config is stored at ~/.config/tvshell/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::http::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use crate::api::{homesso, HomeSsoClient, RequestClient};
use crate::app::BoundaryPolicy;
use crate::signin::{PollerSettings, MAX_POLL_ATTEMPTS, POLL_INTERVAL};

/// Env var that overrides the stored device id
pub const DEVICE_ID_ENV: &str = "TVSHELL_DEVICE_ID";

/// App id reported to the continuity layer when none is configured
pub const DEFAULT_APP_ID: &str = "vzb2000001";

/// Application configuration. Every field is optional; getters fall back
/// to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account service base URL
    pub sso_base_url: Option<String>,
    /// Cached device id sent with sign-in requests
    pub device_id: Option<String>,
    /// Grid edge behavior (clamp, wrap)
    pub grid_boundary: Option<BoundaryPolicy>,
    pub poll_interval_ms: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub http_timeout_ms: Option<u64>,
    pub http_retries: Option<u32>,
    pub http_retry_delay_ms: Option<u64>,
    /// Continuity app id
    pub app_id: Option<String>,

    /// File this config was loaded from
    #[serde(skip)]
    source: Option<PathBuf>,
    /// Set when `source` exists but could not be read or parsed; such a
    /// file is never written over
    #[serde(skip)]
    damaged: bool,
}

impl Config {
    /// Get config file path (~/.config/tvshell/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tvshell").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from `path`, or return default if missing or invalid.
    /// Later saves go back to `path`, unless the file was invalid.
    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(path, &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read config file, using defaults");
                Self {
                    damaged: true,
                    ..Self::default()
                }
            }
        };
        config.source = Some(path.to_path_buf());
        config
    }

    fn parse(path: &Path, contents: &str) -> Self {
        match toml::from_str(contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                // Keep the device id so sign-in stays keyed to the same device
                let device_id = toml::from_str::<toml::Table>(contents)
                    .ok()
                    .and_then(|table| table.get("device_id")?.as_str().map(str::to_string));
                Self {
                    device_id,
                    damaged: true,
                    ..Self::default()
                }
            }
        }
    }

    /// Whether the loaded file was unreadable or invalid
    pub fn is_damaged(&self) -> bool {
        self.damaged
    }

    /// Save config to the file it was loaded from (or the default path)
    pub fn save(&self) -> Result<()> {
        let path = match &self.source {
            Some(path) => path.clone(),
            None => Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?,
        };
        if self.damaged {
            anyhow::bail!("Refusing to overwrite invalid config file {}", path.display());
        }

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Get the device id with fallback chain:
    /// 1. Environment variable TVSHELL_DEVICE_ID
    /// 2. Cached id from config file
    /// 3. Fresh random id (and cache it)
    pub fn get_device_id(&mut self) -> String {
        if let Ok(id) = std::env::var(DEVICE_ID_ENV) {
            if !id.is_empty() {
                return id;
            }
        }

        if let Some(ref id) = self.device_id {
            return id.clone();
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.device_id = Some(id.clone());
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to cache device id");
        }
        id
    }

    pub fn sso_base_url(&self) -> &str {
        self.sso_base_url.as_deref().unwrap_or(homesso::DEFAULT_BASE_URL)
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.grid_boundary.unwrap_or_default()
    }

    pub fn app_id(&self) -> &str {
        self.app_id.as_deref().unwrap_or(DEFAULT_APP_ID)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poll_interval_ms.map(Duration::from_millis).unwrap_or(POLL_INTERVAL),
            max_attempts: self.max_poll_attempts.unwrap_or(MAX_POLL_ATTEMPTS),
        }
    }

    /// Request client for the account service with configured defaults
    pub fn request_client(&self) -> RequestClient {
        RequestClient::new(self.sso_base_url()).with_defaults(
            self.http_timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TIMEOUT),
            self.http_retries.unwrap_or(DEFAULT_RETRIES),
            self.http_retry_delay_ms.map(Duration::from_millis).unwrap_or(DEFAULT_RETRY_DELAY),
        )
    }

    pub fn sso_client(&mut self) -> HomeSsoClient {
        let device_id = self.get_device_id();
        HomeSsoClient::with_client(self.request_client(), device_id)
    }
}
