//! HTTP client for the sanitization service integration API
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Settings-driven transport returning raw status and body
//! - `download`: Artifact downloads and atomic persistence

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::app::models::{CreateJobResponse, JobHistoryResponse, JobId, JobRecord};
use crate::constants::{api, auth::API_KEY_HEADER};
use crate::errors::TransportResult;
use crate::settings::SettingsProvider;

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::{persist, sanitized_file_name, DownloadHandler};
pub use http::{HttpTransport, RawResponse, RequestBody};

/// File payload for a job submission
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name reported to the server
    pub file_name: String,
    /// File contents
    pub contents: Vec<u8>,
}

/// Typed wrapper over the integration endpoints
#[derive(Debug, Clone)]
pub struct IntegrationClient {
    transport: HttpTransport,
}

impl IntegrationClient {
    /// Wrap an existing transport
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Build a client and transport from configuration
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the underlying HTTP client cannot be built
    pub fn with_config(
        config: &ClientConfig,
        settings: Arc<dyn SettingsProvider>,
    ) -> TransportResult<Self> {
        let client = config.build_http_client()?;
        Ok(Self::new(HttpTransport::new(client, settings)))
    }

    /// Underlying transport
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Create a batch holding one attachment
    ///
    /// The API key is sent explicitly and overrides any stored key.
    ///
    /// # Arguments
    ///
    /// * `attachment` - File name and contents
    /// * `batch_name` - Unique batch name
    /// * `password_list` - Optional passwords for encrypted archives
    /// * `api_key` - Integration API key for this call
    pub async fn create_job(
        &self,
        attachment: Attachment,
        batch_name: &str,
        password_list: Option<&str>,
        api_key: &str,
    ) -> TransportResult<CreateJobResponse> {
        let size = attachment.contents.len();
        let part = Part::bytes(attachment.contents)
            .file_name(attachment.file_name.clone())
            .mime_str("application/octet-stream")?;

        let mut form = Form::new().text("batch_name", batch_name.to_string());
        if let Some(passwords) = password_list.filter(|p| !p.trim().is_empty()) {
            form = form.text("password_list", passwords.to_string());
        }
        form = form.part("attachments", part);

        info!(
            "Submitting {} ({} bytes) as batch {}",
            attachment.file_name, size, batch_name
        );

        self.transport
            .put_multipart(api::JOB_CREATE, form, &[(API_KEY_HEADER, api_key)])
            .await
    }

    /// Job history for the current credentials
    pub async fn list_jobs(&self) -> TransportResult<Vec<JobRecord>> {
        let response: JobHistoryResponse = self.transport.get_json(api::JOB_LIST).await?;
        if response.error {
            warn!(
                "Job list reported an error: {}",
                response.message.as_deref().unwrap_or("no message")
            );
        }
        debug!(
            "Job list returned {} of {} entries",
            response.data.len(),
            response.total_count
        );

        Ok(response
            .data
            .into_iter()
            .map(|item| JobRecord::from(item.user_job_info))
            .collect())
    }

    /// Raw status response for one job
    pub async fn job_status(&self, job_id: &JobId) -> TransportResult<RawResponse> {
        self.transport
            .get_raw(&job_path(api::JOB_STATUS, job_id))
            .await
    }

    /// Raw sanitized artifact response
    pub async fn download_sanitized(&self, job_id: &JobId) -> TransportResult<RawResponse> {
        self.transport
            .get_raw(&job_path(api::DOWNLOAD_SANITIZED, job_id))
            .await
    }

    /// Raw original upload response
    pub async fn download_original(&self, job_id: &JobId) -> TransportResult<RawResponse> {
        self.transport
            .get_raw(&job_path(api::DOWNLOAD_ORIGINAL, job_id))
            .await
    }

    /// Per-job operation details as untyped JSON
    pub async fn job_operations(&self, job_id: &JobId) -> TransportResult<serde_json::Value> {
        self.transport
            .get_json(&job_path(api::JOB_DETAILS, job_id))
            .await
    }

    /// Raw PDF report response
    pub async fn pdf_report(&self, job_id: &JobId) -> TransportResult<RawResponse> {
        self.transport
            .get_raw(&job_path(api::PDF_REPORT, job_id))
            .await
    }
}

/// Endpoint path with the job id appended as one escaped segment
fn job_path(endpoint: &str, job_id: &JobId) -> String {
    let escaped: String = form_urlencoded::byte_serialize(job_id.as_str().as_bytes()).collect();
    // byte_serialize emits '+' only for spaces; a literal '+' arrives as %2B
    format!("{}/{}", endpoint, escaped.replace('+', "%20"))
}
