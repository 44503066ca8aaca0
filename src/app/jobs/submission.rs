//! Job submission
//!
//! Each submission uploads exactly one file and uses only the first job id
//! the server returns. The server may return several ids per batch; this
//! client never submits more than one file per call, so any further ids are
//! logged and ignored.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{TimeZone, Utc};
use tracing::{info, warn};

use crate::app::client::{Attachment, IntegrationClient};
use crate::app::models::{Job, JobId, JobStatus, UploadAttempt};
use crate::constants::coordinator::BATCH_PREFIX;
use crate::errors::{JobError, JobResult};

/// Generates unique, timestamp-based batch names
///
/// Names have millisecond resolution and are strictly increasing per namer,
/// so two uploads in the same millisecond still get distinct names.
#[derive(Debug, Default)]
pub struct BatchNamer {
    last_millis: AtomicI64,
}

impl BatchNamer {
    /// Create a namer
    pub fn new() -> Self {
        Self::default()
    }

    /// Next batch name, `{prefix}_{YYYYMMDD}_{HHMMSS}_{mmm}`
    ///
    /// The hint is reduced to ASCII alphanumerics, `-` and `_`; an empty
    /// result falls back to the default prefix.
    pub fn next(&self, hint: Option<&str>) -> String {
        let now = Utc::now().timestamp_millis();
        let millis = self.reserve(now);

        let prefix = hint
            .map(|h| {
                h.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                    .collect::<String>()
            })
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| BATCH_PREFIX.to_string());

        let stamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .map(|t| t.format("%Y%m%d_%H%M%S_%3f").to_string())
            .unwrap_or_else(|| millis.to_string());

        format!("{}_{}", prefix, stamp)
    }

    fn reserve(&self, now: i64) -> i64 {
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = if now > last { now } else { last + 1 };
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Parameters for one submission
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    /// File to upload
    pub file_path: &'a Path,
    /// Integration API key
    pub api_key: &'a str,
    /// Optional batch name prefix
    pub batch_name_hint: Option<&'a str>,
    /// Optional passwords for encrypted archives
    pub password_list: Option<&'a str>,
}

impl<'a> SubmitRequest<'a> {
    /// Request with no hint and no passwords
    pub fn new(file_path: &'a Path, api_key: &'a str) -> Self {
        Self {
            file_path,
            api_key,
            batch_name_hint: None,
            password_list: None,
        }
    }

    /// Set the batch name prefix
    pub fn with_batch_name_hint(mut self, hint: &'a str) -> Self {
        self.batch_name_hint = Some(hint);
        self
    }

    /// Set the password list
    pub fn with_password_list(mut self, passwords: &'a str) -> Self {
        self.password_list = Some(passwords);
        self
    }
}

/// Uploads files and creates jobs
#[derive(Debug)]
pub struct JobSubmitter {
    client: IntegrationClient,
    namer: BatchNamer,
}

impl JobSubmitter {
    /// Create a submitter over the given client
    pub fn new(client: IntegrationClient) -> Self {
        Self {
            client,
            namer: BatchNamer::new(),
        }
    }

    /// Upload one file and return the created job
    ///
    /// # Errors
    ///
    /// * `JobError::FileNotFound` - the file is missing or unreadable
    /// * `JobError::MissingApiKey` - the API key is empty
    /// * `JobError::SubmissionRejected` - error flag set or no job id returned
    /// * `JobError::Transport` - network failure or non-2xx response
    pub async fn submit(&self, request: SubmitRequest<'_>) -> JobResult<Job> {
        let api_key = request.api_key.trim();
        if api_key.is_empty() {
            return Err(JobError::MissingApiKey);
        }

        let path = request.file_path;
        let contents = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => tokio::fs::read(path).await.map_err(|e| {
                warn!("Cannot read {}: {}", path.display(), e);
                JobError::FileNotFound {
                    path: path.to_path_buf(),
                }
            })?,
            _ => {
                return Err(JobError::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let file_size_bytes = contents.len() as u64;

        let attempt = UploadAttempt {
            file_path: path.to_path_buf(),
            batch_name: self.namer.next(request.batch_name_hint),
            api_key_used: api_key.to_string(),
            started_at: Utc::now(),
        };

        let response = self
            .client
            .create_job(
                Attachment {
                    file_name: file_name.clone(),
                    contents,
                },
                &attempt.batch_name,
                request.password_list,
                &attempt.api_key_used,
            )
            .await?;

        let message = response
            .message
            .clone()
            .unwrap_or_else(|| "no message".to_string());
        if response.error {
            warn!("Submission of {} rejected: {}", file_name, message);
            return Err(JobError::SubmissionRejected { message });
        }

        let data = response.data.unwrap_or_default();
        let mut ids = data.user_job_ids.into_iter();
        let job_id = match ids.next().filter(|id| !id.trim().is_empty()) {
            Some(id) => JobId::new(id),
            None => {
                warn!("Submission of {} returned no job id: {}", file_name, message);
                return Err(JobError::SubmissionRejected {
                    message: format!("no job id returned ({})", message),
                });
            }
        };
        let extra = ids.count();
        if extra > 0 {
            warn!("Ignoring {} additional job ids for batch {}", extra, data.id);
        }

        info!(
            "Created job {} in batch {} ({}) after {} ms",
            job_id,
            data.id,
            attempt.batch_name,
            (Utc::now() - attempt.started_at).num_milliseconds()
        );

        Ok(Job {
            job_id,
            batch_id: data.id,
            file_name,
            file_size_bytes,
            status: JobStatus::Pending,
            created_at: attempt.started_at,
        })
    }
}
