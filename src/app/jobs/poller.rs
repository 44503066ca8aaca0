//! Job status polling
//!
//! The poller runs a fixed-cadence loop against a [`JobStatusSource`] until
//! the job reaches a terminal status, the tick cap is hit, or the caller
//! cancels. Transient failures on a tick are logged and swallowed; the tick
//! still counts toward the cap, so the overall deadline never moves.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::client::{IntegrationClient, RawResponse};
use crate::app::models::{JobId, JobStatus, JobStatusBody};
use crate::constants::poller;
use crate::errors::{snippet, JobError, JobResult, TransportResult};

/// Where the poller reads job status from
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Fetch the raw status response for one job
    async fn fetch_status(&self, job_id: &JobId) -> TransportResult<RawResponse>;
}

#[async_trait]
impl JobStatusSource for IntegrationClient {
    async fn fetch_status(&self, job_id: &JobId) -> TransportResult<RawResponse> {
        self.job_status(job_id).await
    }
}

/// Poll cadence and cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between ticks
    pub interval: Duration,
    /// Ticks before giving up
    pub max_ticks: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: poller::TICK_INTERVAL,
            max_ticks: poller::MAX_TICKS,
        }
    }
}

/// Classification of one status response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Terminal success
    Sanitized,
    /// Terminal failure with the reported status
    Failed(JobStatus),
    /// Keep polling
    Pending,
}

/// Classify a successful status body
///
/// A structured `status` field (top level or under `data`) decides when it
/// is recognised. Otherwise the body is scanned for the success marker
/// first, then the failure markers.
pub fn classify(body: &str) -> TickOutcome {
    if let Ok(parsed) = serde_json::from_str::<JobStatusBody>(body) {
        match parsed.reported_status() {
            Some(JobStatus::Sanitized) => return TickOutcome::Sanitized,
            Some(status) if status.is_terminal() => return TickOutcome::Failed(status),
            Some(JobStatus::Unknown) | None => {}
            Some(_) => return TickOutcome::Pending,
        }
    }

    if body.contains(poller::SUCCESS_MARKER) {
        TickOutcome::Sanitized
    } else if poller::FAILURE_MARKERS.iter().any(|m| body.contains(m)) {
        TickOutcome::Failed(JobStatus::Failed)
    } else {
        TickOutcome::Pending
    }
}

/// Successful poll result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Tick on which the terminal status was observed (1-based)
    pub ticks: u32,
    /// Final status body
    pub body: String,
}

/// Repeatedly queries job status until a terminal state
pub struct StatusPoller<S> {
    source: S,
    config: PollConfig,
}

impl<S: JobStatusSource> StatusPoller<S> {
    /// Create a poller over the given source
    pub fn new(source: S, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Poll configuration
    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Poll until the job is sanitized
    ///
    /// `on_tick` is called with `(tick, max_ticks)` before each fetch.
    ///
    /// # Errors
    ///
    /// * `JobError::SanitizationFailed` - the server reported a terminal failure
    /// * `JobError::PollTimedOut` - no terminal status within `max_ticks`
    /// * `JobError::PollCancelled` - `cancel` fired; checked at every tick boundary
    ///
    /// Failed checks of any kind are logged and retried on the next tick.
    pub async fn poll<F>(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
        mut on_tick: F,
    ) -> JobResult<PollReport>
    where
        F: FnMut(u32, u32) + Send,
    {
        let max_ticks = self.config.max_ticks;
        let mut last_error: Option<String> = None;

        info!("Polling job {} (up to {} checks)", job_id, max_ticks);

        for tick in 1..=max_ticks {
            if cancel.is_cancelled() {
                info!("Polling for job {} cancelled before tick {}", job_id, tick);
                return Err(JobError::PollCancelled);
            }
            on_tick(tick, max_ticks);

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Polling for job {} cancelled during tick {}", job_id, tick);
                    return Err(JobError::PollCancelled);
                }
                result = self.source.fetch_status(job_id) => result,
            };

            match fetched {
                Ok(response) if response.is_success() => {
                    let body = response.text();
                    match classify(&body) {
                        TickOutcome::Sanitized => {
                            info!("Job {} sanitized after {} checks", job_id, tick);
                            return Ok(PollReport { ticks: tick, body });
                        }
                        TickOutcome::Failed(status) => {
                            warn!(
                                "Job {} reported {} on check {}: {}",
                                job_id,
                                status.as_wire(),
                                tick,
                                snippet(&body)
                            );
                            return Err(JobError::SanitizationFailed {
                                status: status.as_wire().to_string(),
                                body,
                            });
                        }
                        TickOutcome::Pending => {
                            debug!("Job {} still pending on check {}", job_id, tick);
                        }
                    }
                }
                Ok(response) => {
                    let message = format!("HTTP {}: {}", response.status, snippet(&response.text()));
                    warn!("Status check {} for job {} failed, {}", tick, job_id, message);
                    last_error = Some(message);
                }
                Err(e) => {
                    // Settings may be fixed mid-poll, so no failure ends the loop early
                    warn!("Status check {} for job {} failed: {}", tick, job_id, e);
                    last_error = Some(e.to_string());
                }
            }

            if tick < max_ticks {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Polling for job {} cancelled after tick {}", job_id, tick);
                        return Err(JobError::PollCancelled);
                    }
                    _ = tokio::time::sleep(self.config.interval) => {}
                }
            }
        }

        warn!("Job {} not finished after {} checks", job_id, max_ticks);
        Err(JobError::PollTimedOut {
            ticks: max_ticks,
            last_error,
        })
    }
}
