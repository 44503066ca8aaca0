//! Authentication and server configuration
//!
//! This module covers exchanging credentials for a bearer token, checking
//! an integration API key, and pointing the client at a server.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sanitize_client::app::{ClientConfig, IntegrationClient};
//! use sanitize_client::auth::{AuthConfig, AuthService, HostnameConfig, HostnameService};
//! use sanitize_client::settings::JsonSettingsStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Arc::new(JsonSettingsStore::open_default()?);
//!
//! let hostnames = HostnameService::new(settings.clone(), HostnameConfig::default());
//! hostnames.configure("sanitizer.example.internal").await?;
//!
//! let client = IntegrationClient::with_config(&ClientConfig::default(), settings)?;
//! let auth = AuthService::new(client.transport().clone(), AuthConfig::default());
//! auth.sign_in_with_timeout("alice", "correct horse").await?;
//! # Ok(())
//! # }
//! ```

pub mod hostname;
pub mod signin;

// Re-export main public API
pub use hostname::{normalize_hostname, HostnameConfig, HostnameService};
pub use signin::{AuthConfig, AuthService};
