//! Persistent client settings
//!
//! Settings hold the server base URL and the credentials attached to every
//! request. They are the single source of truth consulted before each call;
//! nothing downstream caches them beyond one request.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sanitize_client::settings::{JsonSettingsStore, SettingsProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonSettingsStore::open_default()?;
//! let mut settings = store.load().await?;
//! settings.set_base_url("https://appliance.local/api/v1/");
//! store.save(&settings).await?;
//! # Ok(())
//! # }
//! ```

pub mod store;

pub use store::{JsonSettingsStore, MemorySettingsStore, Settings, SettingsProvider};
