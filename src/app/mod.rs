//! Core application logic for the sanitize client
//!
//! This module contains the HTTP client for the integration API, the job
//! lifecycle (submission, polling, download), the data models, and the
//! upload flow coordinator that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sanitize_client::app::{ClientConfig, IntegrationClient};
//! use sanitize_client::app::models::format_file_size;
//! use sanitize_client::settings::JsonSettingsStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Arc::new(JsonSettingsStore::open_default()?);
//! let client = IntegrationClient::with_config(&ClientConfig::default(), settings)?;
//!
//! for job in client.list_jobs().await? {
//!     println!("{} {} {}", job.file_name, format_file_size(job.file_size_bytes), job.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod jobs;
pub mod models;
pub mod race;

// Re-export main public API
pub use client::{ClientConfig, HttpTransport, IntegrationClient, RawResponse};
pub use coordinator::{
    Coordinator, CoordinatorConfig, FlowReport, FlowState, Notice, ProgressSurface, SurfaceMode,
};
pub use jobs::{JobSubmitter, PollConfig, StatusPoller, SubmitRequest};
pub use models::{Job, JobId, JobRecord, JobStatus};
pub use race::{race_against_timer, Raced};
