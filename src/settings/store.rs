//! Settings model and storage backends
//!
//! The JSON store keeps a single human-readable file in the per-user data
//! directory. Writes go through a temp file and rename, so concurrent saves
//! never leave a torn file behind; the last writer wins.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::constants::files;
use crate::errors::{SettingsError, SettingsResult};

/// Base URL and credentials for the remote service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Absolute origin plus versioned API prefix
    #[serde(rename = "BaseUrl")]
    pub base_url: String,
    /// Bearer token from the last successful sign-in
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
    /// Estimated token expiry
    #[serde(rename = "AuthTokenExpiresAt")]
    pub auth_token_expires_at: Option<DateTime<Utc>>,
    /// Integration API key
    #[serde(rename = "ApiKey")]
    pub api_key: String,
}

impl Settings {
    /// Base URL with trailing slashes removed, ready for path concatenation
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Store a base URL in normalized form
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
    }

    /// Whether a base URL has been configured
    pub fn has_base_url(&self) -> bool {
        !self.normalized_base_url().is_empty()
    }

    /// Bearer token, if one is stored
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.auth_token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// API key, if one is stored
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    /// Whether the stored token is past its estimated expiry
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        match self.auth_token_expires_at {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }
}

/// Load/save seam for settings. Implementations must default missing
/// fields rather than fail.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Load the current settings
    async fn load(&self) -> SettingsResult<Settings>;

    /// Persist settings, replacing what was stored
    async fn save(&self, settings: &Settings) -> SettingsResult<()>;
}

/// JSON file backed settings store
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at `<data_dir>/sanitize-client/settings.json`
    pub fn open_default() -> SettingsResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Default settings file location for the current user
    pub fn default_path() -> SettingsResult<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| SettingsError::Unavailable {
            reason: "could not determine user data directory".to_string(),
        })?;
        Ok(data_dir
            .join(files::APP_DIR_NAME)
            .join(files::SETTINGS_FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(path: &Path, contents: &[u8]) -> SettingsResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(io_err)?;

        // Unique temp per writer so concurrent saves cannot share a temp file
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        temp.write_all(contents).map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        temp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for JsonSettingsStore {
    async fn load(&self) -> SettingsResult<Settings> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", self.path.display());
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<Settings>(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(
                    "Settings file {} is unreadable ({}), using defaults",
                    self.path.display(),
                    e
                );
                Ok(Settings::default())
            }
        }
    }

    async fn save(&self, settings: &Settings) -> SettingsResult<()> {
        let contents = serde_json::to_vec_pretty(settings)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::write_atomically(&path, &contents))
            .await
            .map_err(|e| SettingsError::Unavailable {
                reason: format!("settings writer task failed: {}", e),
            })??;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// In-memory settings, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl MemorySettingsStore {
    /// Create a store seeded with the given settings
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }
}

#[async_trait]
impl SettingsProvider for MemorySettingsStore {
    async fn load(&self) -> SettingsResult<Settings> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> SettingsResult<()> {
        *self.inner.write().await = settings.clone();
        Ok(())
    }
}
