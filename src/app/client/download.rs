//! Artifact downloads and atomic persistence
//!
//! Downloads are held in memory and written with the temp file + rename
//! pattern so an interrupted write never leaves a partial artifact under
//! the final name.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::app::client::{IntegrationClient, RawResponse};
use crate::app::models::JobId;
use crate::constants::files;
use crate::errors::{snippet, JobError, JobResult};

/// Artifact download operations handler
pub struct DownloadHandler<'a> {
    client: &'a IntegrationClient,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler over the given client
    pub fn new(client: &'a IntegrationClient) -> Self {
        Self { client }
    }

    /// Downloads the sanitized artifact for a job
    ///
    /// # Errors
    ///
    /// Returns `JobError::DownloadFailed` carrying status and body on non-2xx,
    /// or `JobError::Transport` if the request could not be made
    pub async fn sanitized(&self, job_id: &JobId) -> JobResult<Vec<u8>> {
        let response = self.client.download_sanitized(job_id).await?;
        Self::into_bytes(job_id, response)
    }

    /// Downloads the original upload for a job
    pub async fn original(&self, job_id: &JobId) -> JobResult<Vec<u8>> {
        let response = self.client.download_original(job_id).await?;
        Self::into_bytes(job_id, response)
    }

    /// Downloads the PDF report for a job
    pub async fn report(&self, job_id: &JobId) -> JobResult<Vec<u8>> {
        let response = self.client.pdf_report(job_id).await?;
        Self::into_bytes(job_id, response)
    }

    fn into_bytes(job_id: &JobId, response: RawResponse) -> JobResult<Vec<u8>> {
        if !response.is_success() {
            let body = response.text();
            tracing::error!(
                "Download for job {} failed with HTTP {}: {}",
                job_id,
                response.status,
                snippet(&body)
            );
            return Err(JobError::DownloadFailed {
                status: response.status,
                body,
            });
        }

        tracing::debug!("Downloaded {} bytes for job {}", response.body.len(), job_id);
        Ok(response.body)
    }
}

/// Name of the sanitized artifact: `{stem}_sanitized{ext}`
pub fn sanitized_file_name(original: &Path) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    match original.extension() {
        Some(ext) => format!(
            "{}{}.{}",
            stem,
            files::SANITIZED_SUFFIX,
            ext.to_string_lossy()
        ),
        None => format!("{}{}", stem, files::SANITIZED_SUFFIX),
    }
}

/// Writes bytes to `dir/file_name`, creating `dir` if absent
///
/// Existing files with the same name are replaced.
///
/// # Errors
///
/// Returns `JobError::DestinationUnwritable` if the directory cannot be
/// created or the file cannot be written
pub async fn persist(bytes: &[u8], dir: &Path, file_name: &str) -> JobResult<PathBuf> {
    let destination = dir.join(file_name);
    let unwritable = |source| JobError::DestinationUnwritable {
        path: destination.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(unwritable)?;

    let temp_path = dir.join(format!(".{}{}", file_name, files::TEMP_FILE_SUFFIX));
    if let Err(e) = write_file(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(unwritable(e));
    }

    if let Err(e) = tokio::fs::rename(&temp_path, &destination).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(unwritable(e));
    }

    tracing::info!("Saved {} ({} bytes)", destination.display(), bytes.len());
    Ok(destination)
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
