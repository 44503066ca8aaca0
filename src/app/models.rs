//! Data models for the sanitize client
//!
//! This module defines the job lifecycle types owned by the client and the
//! wire shapes exchanged with the sanitization service.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque server-assigned job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a server-provided id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-reported job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Sanitized,
    Failed,
    NotSanitizable,
    Blocked,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the server will no longer change the outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Sanitized | JobStatus::Failed | JobStatus::NotSanitizable | JobStatus::Error
        )
    }

    /// Terminal success
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Sanitized)
    }

    /// Human-readable label for list views
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "In Progress",
            JobStatus::Sanitized => "Sanitized",
            JobStatus::Failed => "Failed",
            JobStatus::NotSanitizable => "Not Sanitizable",
            JobStatus::Blocked => "Blocked",
            JobStatus::Error => "Error",
            JobStatus::Unknown => "Unknown",
        }
    }

    /// Wire representation
    pub fn as_wire(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Sanitized => "SANITIZED",
            JobStatus::Failed => "FAILED",
            JobStatus::NotSanitizable => "NOT_SANITIZABLE",
            JobStatus::Blocked => "BLOCKED",
            JobStatus::Error => "ERROR",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Ok(match normalized.as_str() {
            "PENDING" => JobStatus::Pending,
            "IN_PROGRESS" => JobStatus::InProgress,
            "SANITIZED" => JobStatus::Sanitized,
            "FAILED" => JobStatus::Failed,
            "NOT_SANITIZABLE" => JobStatus::NotSanitizable,
            "BLOCKED" => JobStatus::Blocked,
            "ERROR" => JobStatus::Error,
            _ => JobStatus::Unknown,
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One submitted job, owned by the coordinator invocation that created it.
/// `status` only ever changes to what the server reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: JobId,
    pub batch_id: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral record of one upload attempt; never persisted
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub file_path: PathBuf,
    pub batch_name: String,
    pub api_key_used: String,
    pub started_at: DateTime<Utc>,
}

/// Sign-in request body
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "type")]
    pub client_type: String,
    pub auth: String,
    pub os: String,
}

/// Sign-in response body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignInResponse {
    pub tokens: SignInTokens,
    pub error: bool,
    pub message: Option<String>,
}

/// Tokens returned by sign-in
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignInTokens {
    pub access: String,
    pub refresh: String,
}

/// Job creation response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateJobResponse {
    pub data: Option<CreateJobData>,
    pub error: bool,
    pub message: Option<String>,
}

/// Batch created by a submission
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateJobData {
    pub id: String,
    pub user_job_ids: Vec<String>,
    pub batch_name: Option<String>,
    pub user_id: Option<String>,
    pub client_type: Option<String>,
}

/// Job history listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobHistoryResponse {
    pub data: Vec<JobHistoryItem>,
    pub error: bool,
    pub message: Option<String>,
    pub total_count: u64,
}

/// Entry in the job history listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobHistoryItem {
    pub user_job_info: UserJobInfo,
}

/// Per-job details within a history entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserJobInfo {
    pub username: Option<String>,
    pub created_at: String,
    pub status: String,
    pub user_job_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_extension: Option<String>,
}

/// Status endpoint body; only the status field is interpreted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobStatusBody {
    pub status: Option<String>,
    pub data: Option<Box<JobStatusBody>>,
}

impl JobStatusBody {
    /// Status at the top level or nested under `data`
    pub fn reported_status(&self) -> Option<JobStatus> {
        self.status
            .as_deref()
            .map(|s| s.parse().unwrap_or(JobStatus::Unknown))
            .or_else(|| self.data.as_ref().and_then(|d| d.reported_status()))
    }
}

/// Flattened job history row for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: JobId,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub status: JobStatus,
    pub created_at: String,
}

impl From<UserJobInfo> for JobRecord {
    fn from(info: UserJobInfo) -> Self {
        Self {
            job_id: JobId::new(info.user_job_id),
            file_name: if info.file_name.is_empty() {
                "Unknown".to_string()
            } else {
                info.file_name
            },
            file_size_bytes: info.file_size,
            status: info.status.parse().unwrap_or(JobStatus::Unknown),
            created_at: info.created_at,
        }
    }
}

/// Format a byte count the way the job list shows it
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.0} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.2} GB", b / GB)
    }
}

/// Format a server timestamp as `YYYY-MM-DD HH:MM`, or echo it if unparseable
pub fn format_created_at(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    raw.to_string()
}
