//! Application constants for the sanitize client
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names used to pre-fill interactive prompts
pub mod env {
    /// Environment variable name for the integration API key
    pub const API_KEY: &str = "SANITIZE_API_KEY";

    /// Environment variable name for the sign-in username
    pub const USERNAME: &str = "SANITIZE_USERNAME";

    /// Environment variable name for the sign-in password
    pub const PASSWORD: &str = "SANITIZE_PASSWORD";
}

/// Remote API paths, relative to the configured base URL
pub mod api {
    /// Versioned API prefix appended to a bare hostname
    pub const API_PREFIX: &str = "/api/v1";

    /// Credential exchange endpoint
    pub const SIGN_IN: &str = "user/signin";

    /// Multipart job creation endpoint (PUT)
    pub const JOB_CREATE: &str = "integration/job/create";

    /// Job history listing, also used as the cheap API key probe
    pub const JOB_LIST: &str = "integration/job/list";

    /// Job status, suffixed with the job id
    pub const JOB_STATUS: &str = "integration/job/status";

    /// Sanitized artifact download, suffixed with the job id
    pub const DOWNLOAD_SANITIZED: &str = "integration/job/download/sanitized";

    /// Original upload download, suffixed with the job id
    pub const DOWNLOAD_ORIGINAL: &str = "integration/job/download/original";

    /// Per-job operation details, suffixed with the job id
    pub const JOB_DETAILS: &str = "integration/job";

    /// PDF report, suffixed with the job id
    pub const PDF_REPORT: &str = "integration/pdf-report";
}

/// Authentication constants
pub mod auth {
    use super::Duration;

    /// Client type identifier sent with every sign-in request
    pub const CLIENT_TYPE_ID: &str = "91976df0-2bd2-472b-8c99-c06a07fe1b3c";

    /// Authentication method identifier (local user/password)
    pub const AUTH_METHOD_ID: &str = "6709b914-dad0-468f-b713-1c370fa61716";

    /// Operating system identifier
    pub const OS_ID: &str = "ed790d54-ed48-43b6-ab21-b93303305993";

    /// The server does not report token lifetime, so expiry is estimated
    pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

    /// Sign-in is raced against this timer
    pub const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(7);

    /// Header carrying the integration API key
    pub const API_KEY_HEADER: &str = "X-API-Key";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Sanitize-Client/0.1.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum characters of a response body included in diagnostics
    pub const BODY_SNIPPET_CHARS: usize = 500;
}

/// Hostname validation constants
pub mod hostname {
    use super::Duration;

    /// Timeout applied to each individual probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Whole validation is raced against this timer
    pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(7);

    /// Paths probed relative to the base URL, in order
    pub const PROBE_PATHS: &[&str] = &["health", "version", ""];

    /// Accept header used while probing
    pub const PROBE_ACCEPT: &str = "application/json, */*;q=0.1";
}

/// Status polling constants
pub mod poller {
    use super::Duration;

    /// Interval between status ticks
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

    /// Hard cap on ticks before the poll times out (two minutes)
    pub const MAX_TICKS: u32 = 120;

    /// Body marker for terminal success
    pub const SUCCESS_MARKER: &str = "SANITIZED";

    /// Body markers for terminal failure
    pub const FAILURE_MARKERS: &[&str] = &["FAILED", "ERROR"];
}

/// Upload coordination constants
pub mod coordinator {
    use super::Duration;

    /// Settling delay before the job list is refreshed after a success
    pub const REFRESH_DELAY: Duration = Duration::from_secs(5);

    /// Default batch name prefix when the caller supplies no hint
    pub const BATCH_PREFIX: &str = "batch";
}

/// File operation constants
pub mod files {
    /// Suffix inserted before the extension of a sanitized file
    pub const SANITIZED_SUFFIX: &str = "_sanitized";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Settings file name inside the application data directory
    pub const SETTINGS_FILE_NAME: &str = "settings.json";

    /// Application directory name under the per-user data/config roots
    pub const APP_DIR_NAME: &str = "sanitize-client";

    /// Config file name inside the application config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use env::{API_KEY as ENV_API_KEY, PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use files::SANITIZED_SUFFIX;
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use poller::{MAX_TICKS, TICK_INTERVAL};
