//! Configuration management for the sanitize client
//!
//! This module provides TOML configuration with automatic first-run
//! initialization and zero-config defaults. Server address and credentials
//! are not configuration; they live in the settings file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CoordinatorConfig, PollConfig};
use crate::auth::{AuthConfig, HostnameConfig};
use crate::constants::{auth, coordinator, files, hostname, http, logging, poller};
use crate::errors::{ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Status polling settings
    pub poller: PollerConfigToml,
    /// Upload coordinator settings
    pub coordinator: CoordinatorConfigToml,
    /// Sign-in settings
    pub auth: AuthConfigToml,
    /// Hostname validation settings
    pub hostname: HostnameConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Accept self-signed certificates (appliances usually ship them)
    pub accept_invalid_certs: bool,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

/// TOML-friendly poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfigToml {
    /// Delay between status checks in milliseconds
    pub interval_ms: u64,
    /// Status checks before giving up
    pub max_ticks: u32,
}

impl Default for PollerConfigToml {
    fn default() -> Self {
        Self {
            interval_ms: poller::TICK_INTERVAL.as_millis() as u64,
            max_ticks: poller::MAX_TICKS,
        }
    }
}

/// TOML-friendly coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfigToml {
    /// Settling delay before the job list refresh, in seconds
    pub refresh_delay_secs: u64,
    /// Where sanitized files go (unset = next to the original)
    pub destination_dir: Option<PathBuf>,
    /// Batch name prefix
    pub batch_name_prefix: Option<String>,
}

impl Default for CoordinatorConfigToml {
    fn default() -> Self {
        Self {
            refresh_delay_secs: coordinator::REFRESH_DELAY.as_secs(),
            destination_dir: None,
            batch_name_prefix: None,
        }
    }
}

/// TOML-friendly authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfigToml {
    /// Sign-in timeout in seconds
    pub sign_in_timeout_secs: u64,
    /// Estimated token lifetime in seconds
    pub token_lifetime_secs: u64,
}

impl Default for AuthConfigToml {
    fn default() -> Self {
        Self {
            sign_in_timeout_secs: auth::SIGN_IN_TIMEOUT.as_secs(),
            token_lifetime_secs: auth::TOKEN_LIFETIME.as_secs(),
        }
    }
}

/// TOML-friendly hostname validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostnameConfigToml {
    /// Timeout per probe in seconds
    pub probe_timeout_secs: u64,
    /// Timeout for the whole validation in seconds
    pub validation_timeout_secs: u64,
}

impl Default for HostnameConfigToml {
    fn default() -> Self {
        Self {
            probe_timeout_secs: hostname::PROBE_TIMEOUT.as_secs(),
            validation_timeout_secs: hostname::VALIDATION_TIMEOUT.as_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Runtime configuration derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client: ClientConfig,
    pub coordinator: CoordinatorConfig,
    pub auth: AuthConfig,
    pub hostname: HostnameConfig,
    /// Log level used when no verbosity flag is given
    pub log_level: tracing::Level,
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        let client = self.client.to_runtime_config();
        let hostname = HostnameConfig {
            accept_invalid_certs: client.accept_invalid_certs,
            ..self.hostname.to_runtime_config()
        };

        RuntimeConfig {
            coordinator: self.coordinator.to_runtime_config(self.poller.to_runtime_config()),
            auth: self.auth.to_runtime_config(),
            hostname,
            client,
            log_level: self.logging.level.parse().unwrap_or(tracing::Level::WARN),
        }
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit override, else the per-user file if present)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit file is missing, a file cannot be
    /// read or parsed, or a value is out of range
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::get_default_config_path()
                .ok()
                .filter(|path| path.exists()),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file if none exists and notifies the user
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::get_default_config_path()?;
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        info!("Creating default configuration file...");
        Self::write_default_config(&config_path).await?;

        println!("📁 Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   You can customize settings by editing this file.");
        println!();

        Ok(Some(config_path))
    }

    /// Write the commented default configuration to `path`
    pub async fn write_default_config(path: &Path) -> Result<()> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(io_err)?;
        Ok(())
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_dir".to_string(),
            value: String::new(),
            reason: "Could not determine user config directory".to_string(),
        })?;

        Ok(config_dir
            .join(files::APP_DIR_NAME)
            .join(files::CONFIG_FILE_NAME))
    }

    /// Reject values that would make the client unusable
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.poller.max_ticks == 0 {
            return Err(invalid("poller.max_ticks", "0".to_string(), "Must be at least 1"));
        }
        if self.poller.interval_ms == 0 {
            return Err(invalid("poller.interval_ms", "0".to_string(), "Must be at least 1"));
        }
        if self.client.request_timeout_secs == 0 {
            return Err(invalid(
                "client.request_timeout_secs",
                "0".to_string(),
                "Must be at least 1",
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(
                "logging.level",
                self.logging.level.clone(),
                "Expected one of error, warn, info, debug, trace",
            ));
        }
        Ok(())
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Sanitize Client Configuration
# This file was automatically generated on first run.
# Server address and credentials are stored separately in settings.json.

[client]
# Appliances usually ship self-signed certificates.
# Set to false for hardened deployments with trusted certificates.
accept_invalid_certs = true
request_timeout_secs = {request_timeout}
connect_timeout_secs = {connect_timeout}
user_agent = "{user_agent}"

[poller]
# One status check per interval, giving up after max_ticks checks
interval_ms = {interval_ms}
max_ticks = {max_ticks}

[coordinator]
# Delay before the job list is refreshed after a successful upload
refresh_delay_secs = {refresh_delay}
# Where sanitized files are written (default: next to the original)
# destination_dir = "/path/to/sanitized"
# batch_name_prefix = "batch"

[auth]
sign_in_timeout_secs = {sign_in_timeout}
token_lifetime_secs = {token_lifetime}

[hostname]
probe_timeout_secs = {probe_timeout}
validation_timeout_secs = {validation_timeout}

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            request_timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout = http::CONNECT_TIMEOUT.as_secs(),
            user_agent = http::USER_AGENT,
            interval_ms = poller::TICK_INTERVAL.as_millis(),
            max_ticks = poller::MAX_TICKS,
            refresh_delay = coordinator::REFRESH_DELAY.as_secs(),
            sign_in_timeout = auth::SIGN_IN_TIMEOUT.as_secs(),
            token_lifetime = auth::TOKEN_LIFETIME.as_secs(),
            probe_timeout = hostname::PROBE_TIMEOUT.as_secs(),
            validation_timeout = hostname::VALIDATION_TIMEOUT.as_secs(),
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            accept_invalid_certs: self.accept_invalid_certs,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl PollerConfigToml {
    /// Convert to runtime PollConfig
    pub fn to_runtime_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.interval_ms),
            max_ticks: self.max_ticks,
        }
    }
}

impl CoordinatorConfigToml {
    /// Convert to runtime CoordinatorConfig
    pub fn to_runtime_config(&self, poll: PollConfig) -> CoordinatorConfig {
        CoordinatorConfig {
            poll,
            refresh_delay: Duration::from_secs(self.refresh_delay_secs),
            destination_dir: self.destination_dir.clone(),
            batch_name_hint: self.batch_name_prefix.clone(),
            password_list: None,
        }
    }
}

impl AuthConfigToml {
    /// Convert to runtime AuthConfig
    pub fn to_runtime_config(&self) -> AuthConfig {
        AuthConfig {
            token_lifetime: Duration::from_secs(self.token_lifetime_secs),
            sign_in_timeout: Duration::from_secs(self.sign_in_timeout_secs),
        }
    }
}

impl HostnameConfigToml {
    /// Convert to runtime HostnameConfig
    pub fn to_runtime_config(&self) -> HostnameConfig {
        HostnameConfig {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            validation_timeout: Duration::from_secs(self.validation_timeout_secs),
            ..HostnameConfig::default()
        }
    }
}
