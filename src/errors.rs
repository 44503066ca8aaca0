//! Error types for the sanitize client
//!
//! This module defines error types for all components of the application.
//! Errors are designed to be actionable and provide clear context for debugging and
//! user feedback.

use std::path::PathBuf;
use thiserror::Error;

use crate::constants::http::BODY_SNIPPET_CHARS;

/// Transport-level errors. The transport never retries; callers decide.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No base URL has been configured yet
    #[error("No server configured. Set a hostname first")]
    MissingBaseUrl,

    /// Base URL plus path did not form a valid URL
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Header value could not be encoded (e.g. control characters in a key)
    #[error("Invalid value for header {name}")]
    InvalidHeader { name: String },

    /// Network, TLS or protocol failure before a status was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Server returned HTTP {status}: {}", snippet(.body))]
    Status { status: u16, body: String },

    /// Response body could not be decoded as the expected JSON shape
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Settings could not be read before sending
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl TransportError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Settings persistence errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The per-user data directory could not be determined or used
    #[error("Settings storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// I/O error while reading or writing the settings file
    #[error("Settings file I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure on save
    #[error("Failed to serialize settings")]
    Serialize(#[from] serde_json::Error),
}

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Server rejected the credentials or reported an error flag
    #[error("Sign-in failed: {message}")]
    SignInRejected { message: String },

    /// Server reported success but returned no access token
    #[error("Sign-in returned an empty access token")]
    EmptyToken,

    /// Sign-in did not complete before the timer fired
    #[error("Sign-in timed out after {seconds} seconds")]
    TimedOut { seconds: u64 },

    /// Username or password was empty
    #[error("Invalid credentials: {reason}")]
    InvalidInput { reason: String },

    /// Hostname did not answer any probe in time
    #[error("Cannot reach a sanitization server at {base_url}")]
    UnreachableHost { base_url: String },

    /// Transport failure during authentication
    #[error("Sign-in request failed: {0}")]
    Transport(#[from] TransportError),

    /// Token could not be persisted
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Job submission, polling, download and persistence errors
#[derive(Error, Debug)]
pub enum JobError {
    /// File to submit does not exist or is not readable
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// No API key configured or supplied
    #[error("No API key configured. Run 'sanitize_client api-key' to set one")]
    MissingApiKey,

    /// Server refused the submission
    #[error("Submission rejected by server: {message}")]
    SubmissionRejected { message: String },

    /// Job did not reach a terminal status before the tick cap
    #[error("Sanitization did not finish within {ticks} status checks")]
    PollTimedOut {
        ticks: u32,
        last_error: Option<String>,
    },

    /// Poll loop observed a cancellation request
    #[error("Sanitization wait was cancelled")]
    PollCancelled,

    /// Server reported a terminal failure status
    #[error("Sanitization failed: {}", snippet(.body))]
    SanitizationFailed { status: String, body: String },

    /// Sanitized artifact download returned a non-2xx status
    #[error("Download failed with HTTP {status}: {}", snippet(.body))]
    DownloadFailed { status: u16, body: String },

    /// Destination could not be created or written
    #[error("Cannot write to destination {path}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure outside of the poll loop
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Settings could not be read
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Coordinator entry rejections
#[derive(Error, Debug)]
pub enum FlowError {
    /// Another upload already owns the progress surface
    #[error("An upload is already in progress. Please wait for it to finish")]
    Busy,

    /// Drag-and-drop carried more than one file
    #[error("Only a single file can be sanitized at a time ({count} were dropped)")]
    SingleFileOnly { count: usize },

    /// Drag-and-drop carried nothing usable
    #[error("No file was supplied")]
    NoFile,

    /// A stage of the pipeline failed
    #[error(transparent)]
    Job(#[from] JobError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Config directory or file could not be accessed
    #[error("Configuration I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Settings error
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Job lifecycle error
    #[error(transparent)]
    Job(#[from] JobError),

    /// Coordinator rejection
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(TransportError::Http(_))
                | AppError::Job(JobError::Transport(TransportError::Http(_)))
                | AppError::Job(JobError::PollTimedOut { .. })
                | AppError::Auth(AuthError::TimedOut { .. })
                | AppError::Flow(FlowError::Busy)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "transport",
            AppError::Settings(_) => "settings",
            AppError::Auth(_) => "authentication",
            AppError::Job(_) => "job",
            AppError::Flow(_) => "flow",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Bounded body preview for messages and logs
pub fn snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        cut.push('…');
        cut
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Settings result type alias
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Job result type alias
pub type JobResult<T> = std::result::Result<T, JobError>;

/// Flow result type alias
pub type FlowResult<T> = std::result::Result<T, FlowError>;
