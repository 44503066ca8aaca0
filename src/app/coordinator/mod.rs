//! Upload flow orchestration
//!
//! The coordinator drives one file through submit, poll, download and
//! persist, in that order, and owns the single progress surface while doing
//! so. Every entry point funnels into the same state machine:
//!
//! ```text
//! Idle -> Uploading -> Polling -> Downloading -> Done(success) | Done(failure) -> Idle
//! ```
//!
//! Only one attempt may run at a time. A second attempt started while one
//! is in flight is rejected with a busy notice and never touches the
//! progress indicator.
//!
//! # Architecture
//!
//! - [`config`] - Configuration structures and validation
//! - [`state`] - Flow states and transition tracking
//! - [`surface`] - UI adapter seam and the dismissal guard
//! - [`signals`] - Ctrl-C handling that cancels the poll loop
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use sanitize_client::app::{ClientConfig, Coordinator, CoordinatorConfig, IntegrationClient};
//! use sanitize_client::app::coordinator::RecordingSurface;
//! use sanitize_client::settings::JsonSettingsStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Arc::new(JsonSettingsStore::open_default()?);
//! let client = IntegrationClient::with_config(&ClientConfig::default(), settings)?;
//! let coordinator = Coordinator::new(
//!     client,
//!     Arc::new(RecordingSurface::new()),
//!     CoordinatorConfig::default(),
//! );
//!
//! let report = coordinator.sanitize_file(Path::new("invoice.pdf"), None).await?;
//! println!("Saved {}", report.saved_to.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod signals;
pub mod state;
pub mod surface;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::client::download::{persist, sanitized_file_name, DownloadHandler};
use crate::app::client::IntegrationClient;
use crate::app::jobs::{JobSubmitter, StatusPoller, SubmitRequest};
use crate::app::models::{Job, JobRecord, JobStatus};
use crate::errors::{FlowError, FlowResult, JobError, JobResult, TransportResult};
use crate::settings::SettingsProvider;

pub use config::CoordinatorConfig;
pub use signals::SignalHandler;
pub use state::{FlowOutcome, FlowState, FlowStateTracker};
pub use surface::{
    Notice, ProgressSurface, RecordingSurface, SurfaceEvent, SurfaceGuard, SurfaceMode,
};

/// Result of a successful flow
#[derive(Debug)]
pub struct FlowReport {
    /// Submitted job, with the final server status
    pub job: Job,
    /// Where the sanitized artifact was written
    pub saved_to: PathBuf,
    /// Status checks needed before the job was sanitized
    pub poll_ticks: u32,
    /// Delayed job list refresh
    pub refresh: JoinHandle<()>,
}

struct Completed {
    job: Job,
    saved_to: PathBuf,
    poll_ticks: u32,
}

/// Clears the busy flag and the attempt's cancel token, and returns the
/// machine to `Idle` when dropped, including when the attempt is abandoned
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    state: &'a FlowStateTracker,
    current_run: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self
            .current_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        self.state.set(FlowState::Idle);
        self.busy.store(false, Ordering::Release);
    }
}

/// Upload flow coordinator
pub struct Coordinator {
    client: IntegrationClient,
    submitter: JobSubmitter,
    poller: StatusPoller<IntegrationClient>,
    settings: Arc<dyn SettingsProvider>,
    surface: Arc<dyn ProgressSurface>,
    config: CoordinatorConfig,
    busy: AtomicBool,
    state: FlowStateTracker,
    shutdown: CancellationToken,
    current_run: Mutex<Option<CancellationToken>>,
}

impl Coordinator {
    /// Create a coordinator driving the given surface
    pub fn new(
        client: IntegrationClient,
        surface: Arc<dyn ProgressSurface>,
        config: CoordinatorConfig,
    ) -> Self {
        let settings = client.transport().settings().clone();

        Self {
            submitter: JobSubmitter::new(client.clone()),
            poller: StatusPoller::new(client.clone(), config.poll),
            client,
            settings,
            surface,
            config,
            busy: AtomicBool::new(false),
            state: FlowStateTracker::new(),
            shutdown: CancellationToken::new(),
            current_run: Mutex::new(None),
        }
    }

    /// Current flow state
    pub fn state(&self) -> FlowState {
        self.state.current()
    }

    /// Receive every state transition
    pub fn subscribe(&self) -> broadcast::Receiver<FlowState> {
        self.state.subscribe()
    }

    /// Whether an attempt currently owns the progress surface
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Token cancelling the current and every future poll loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the poll loop of the attempt in flight, if any
    pub fn cancel_current(&self) -> bool {
        let guard = self
            .current_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(token) => {
                info!("Cancelling current upload");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// File picker entry point
    ///
    /// `destination` overrides the configured destination directory.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Busy` if another attempt is in flight, or
    /// `FlowError::Job` for any stage failure. The error has already been
    /// shown on the surface.
    pub async fn sanitize_file(
        &self,
        file: &Path,
        destination: Option<&Path>,
    ) -> FlowResult<FlowReport> {
        let completed = self.run(file, destination, SurfaceMode::Inline).await?;
        self.surface.notify(Notice::Saved {
            path: completed.saved_to.clone(),
        });
        Ok(self.report(completed))
    }

    /// Drag-and-drop entry point
    ///
    /// Exactly one file is accepted. Anything else is rejected up front with
    /// a notice, without leaving `Idle`.
    pub async fn sanitize_dropped(
        &self,
        files: &[PathBuf],
        destination: Option<&Path>,
    ) -> FlowResult<FlowReport> {
        match files {
            [] => Err(FlowError::NoFile),
            [file] => self.sanitize_file(file, destination).await,
            _ => {
                warn!("Rejected drop of {} files", files.len());
                self.surface.notify(Notice::SingleFileOnly { count: files.len() });
                Err(FlowError::SingleFileOnly { count: files.len() })
            }
        }
    }

    /// Startup entry point for a file passed on the command line
    ///
    /// Runs behind a modal indicator, then shows the success surface. Once the
    /// user acknowledges it the main view is revealed and the job list is
    /// refreshed after the settling delay. On failure the main view is still
    /// revealed.
    pub async fn sanitize_startup_file(
        &self,
        file: &Path,
        destination: Option<&Path>,
    ) -> FlowResult<FlowReport> {
        info!("Processing startup file {}", file.display());

        match self.run(file, destination, SurfaceMode::Modal).await {
            Ok(completed) => {
                self.surface.acknowledge_success(&completed.saved_to).await;
                self.surface.reveal_main();
                Ok(self.report(completed))
            }
            Err(e) => {
                self.surface.reveal_main();
                Err(e)
            }
        }
    }

    /// Fetch the job list now and show it
    pub async fn refresh_jobs(&self) -> TransportResult<Vec<JobRecord>> {
        let jobs = self.client.list_jobs().await?;
        self.surface.show_jobs(&jobs);
        Ok(jobs)
    }

    fn report(&self, completed: Completed) -> FlowReport {
        FlowReport {
            job: completed.job,
            saved_to: completed.saved_to,
            poll_ticks: completed.poll_ticks,
            refresh: self.spawn_refresh(),
        }
    }

    fn spawn_refresh(&self) -> JoinHandle<()> {
        let client = self.client.clone();
        let surface = self.surface.clone();
        let delay = self.config.refresh_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match client.list_jobs().await {
                Ok(jobs) => surface.show_jobs(&jobs),
                Err(e) => warn!("Job list refresh failed: {}", e),
            }
        })
    }

    fn acquire(&self) -> FlowResult<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected upload while another is in flight");
            self.surface.notify(Notice::Busy);
            return Err(FlowError::Busy);
        }

        Ok(BusyGuard {
            busy: &self.busy,
            state: &self.state,
            current_run: &self.current_run,
        })
    }

    async fn run(
        &self,
        file: &Path,
        destination: Option<&Path>,
        mode: SurfaceMode,
    ) -> FlowResult<Completed> {
        let _busy = self.acquire()?;
        let cancel = self.shutdown.child_token();
        *self
            .current_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(cancel.clone());

        let name = display_name(file);
        let result = {
            let progress = SurfaceGuard::begin(
                self.surface.as_ref(),
                mode,
                &format!("Uploading {}...", name),
            );
            self.pipeline(file, destination, &progress, &cancel).await
        };

        match result {
            Ok(completed) => {
                self.state.set(FlowState::Done(FlowOutcome::Success));
                info!(
                    "Sanitized {} as job {} -> {}",
                    name,
                    completed.job.job_id,
                    completed.saved_to.display()
                );
                Ok(completed)
            }
            Err(e) => {
                self.state.set(FlowState::Done(FlowOutcome::Failure));
                error!("Sanitizing {} failed: {}", name, e);
                self.surface.notify(Notice::Error(e.to_string()));
                Err(FlowError::Job(e))
            }
        }
    }

    async fn pipeline(
        &self,
        file: &Path,
        destination: Option<&Path>,
        progress: &SurfaceGuard<'_>,
        cancel: &CancellationToken,
    ) -> JobResult<Completed> {
        let name = display_name(file);

        self.state.set(FlowState::Uploading);
        let settings = self.settings.load().await?;
        let api_key = settings
            .api_key()
            .ok_or(JobError::MissingApiKey)?
            .to_string();

        let mut request = SubmitRequest::new(file, &api_key);
        if let Some(hint) = self.config.batch_name_hint.as_deref() {
            request = request.with_batch_name_hint(hint);
        }
        if let Some(passwords) = self.config.password_list.as_deref() {
            request = request.with_password_list(passwords);
        }
        let mut job = self.submitter.submit(request).await?;

        self.state.set(FlowState::Polling);
        progress.update(&format!("Sanitizing {}...", name));
        let report = self
            .poller
            .poll(&job.job_id, cancel, |tick, max| {
                progress.update(&format!("Sanitizing {} (check {}/{})", name, tick, max));
            })
            .await?;
        job.status = JobStatus::Sanitized;

        self.state.set(FlowState::Downloading);
        progress.update(&format!("Downloading {}...", name));
        let bytes = DownloadHandler::new(&self.client)
            .sanitized(&job.job_id)
            .await?;

        let dir = self.destination_for(file, destination);
        let saved_to = persist(&bytes, &dir, &sanitized_file_name(file)).await?;

        Ok(Completed {
            job,
            saved_to,
            poll_ticks: report.ticks,
        })
    }

    fn destination_for(&self, file: &Path, destination: Option<&Path>) -> PathBuf {
        destination
            .map(Path::to_path_buf)
            .or_else(|| self.config.destination_dir.clone())
            .or_else(|| {
                file.parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
