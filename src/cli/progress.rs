//! Terminal progress surface
//!
//! This module renders the coordinator's progress surface with indicatif
//! spinners. Inline runs show a single spinner line; modal runs (startup
//! files) add a banner and wait for the user to press Enter before the job
//! list is shown.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sanitize_client::app::{ProgressSurface, SurfaceMode};
//! use sanitize_client::cli::{ProgressConfig, TerminalSurface};
//!
//! let surface = TerminalSurface::new(ProgressConfig::default());
//! surface.begin(SurfaceMode::Inline, "Uploading report.pdf...");
//! surface.update("Sanitizing... (3/120)");
//! surface.dismiss();
//! ```

use std::fmt::Write as _;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::coordinator::{Notice, ProgressSurface, SurfaceMode};
use crate::app::models::{format_created_at, format_file_size, JobRecord};

/// Configuration for the terminal surface
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw animated spinners (off for quiet mode and pipes)
    pub enable_spinner: bool,
    /// Spinner redraw interval
    pub tick_interval: Duration,
    /// Block on Enter after a modal run succeeds
    pub wait_for_acknowledgement: bool,
    /// Maximum width for file names in the job table
    pub max_filename_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_spinner: true,
            tick_interval: Duration::from_millis(100),
            wait_for_acknowledgement: true,
            max_filename_width: 40,
        }
    }
}

impl ProgressConfig {
    /// Configuration for `--quiet` runs: no spinner, no blocking prompt
    pub fn quiet() -> Self {
        Self {
            enable_spinner: false,
            wait_for_acknowledgement: false,
            ..Self::default()
        }
    }
}

/// [`ProgressSurface`] drawn on the terminal
#[derive(Debug)]
pub struct TerminalSurface {
    config: ProgressConfig,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalSurface {
    /// Create a surface with nothing on screen
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            spinner: Mutex::new(None),
        }
    }

    fn spinner(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.spinner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn create_spinner(&self, mode: SurfaceMode) -> ProgressBar {
        if !self.config.enable_spinner {
            return ProgressBar::hidden();
        }

        let template = match mode {
            SurfaceMode::Inline => "{spinner:.blue} {msg}",
            SurfaceMode::Modal => "  {spinner:.green} [{elapsed}] {msg}",
        };
        let style = ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|e| {
                debug!("Spinner template error: {}", e);
                ProgressStyle::default_spinner()
            });

        let bar = ProgressBar::new_spinner().with_style(style);
        bar.enable_steady_tick(self.config.tick_interval);
        bar
    }

    /// Print above the spinner if one is active, so lines don't interleave
    fn print_line(&self, line: &str) {
        match self.spinner().as_ref() {
            Some(bar) if !bar.is_hidden() => bar.println(line),
            _ => eprintln!("{}", line),
        }
    }
}

#[async_trait]
impl ProgressSurface for TerminalSurface {
    fn begin(&self, mode: SurfaceMode, message: &str) {
        if mode == SurfaceMode::Modal {
            eprintln!("🧼 Sanitize Client");
            eprintln!("=================");
        }

        let bar = self.create_spinner(mode);
        bar.set_message(message.to_string());
        if bar.is_hidden() {
            eprintln!("{}", message);
        }

        if let Some(previous) = self.spinner().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn update(&self, message: &str) {
        if let Some(bar) = self.spinner().as_ref() {
            bar.set_message(message.to_string());
        }
    }

    fn dismiss(&self) {
        if let Some(bar) = self.spinner().take() {
            bar.finish_and_clear();
        }
    }

    fn notify(&self, notice: Notice) {
        let line = match notice {
            Notice::Busy => {
                "⏳ An upload is already in progress. Please wait for it to finish.".to_string()
            }
            Notice::SingleFileOnly { count } => format!(
                "⚠️  Only a single file can be sanitized at a time ({} were dropped).",
                count
            ),
            Notice::Error(message) => format!("❌ {}", message),
            Notice::Saved { path } => format!("✅ Sanitized file saved to {}", path.display()),
        };
        self.print_line(&line);
    }

    async fn acknowledge_success(&self, saved_to: &Path) {
        eprintln!();
        eprintln!("✅ Sanitization complete");
        eprintln!("   Saved to: {}", saved_to.display());

        if !self.config.wait_for_acknowledgement {
            return;
        }

        eprintln!("   Press Enter to continue...");
        let waited = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)
        })
        .await;
        if let Ok(Err(e)) = waited {
            debug!("Could not read acknowledgement: {}", e);
        }
    }

    fn reveal_main(&self) {
        eprintln!();
    }

    fn show_jobs(&self, jobs: &[JobRecord]) {
        println!("{}", render_job_table(jobs, self.config.max_filename_width));
    }
}

/// Format the job history as a fixed-width table
pub fn render_job_table(jobs: &[JobRecord], max_filename_width: usize) -> String {
    if jobs.is_empty() {
        return "No jobs found.".to_string();
    }

    let width = max_filename_width.max(8);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>9}  {:<16}  {:<16}  {}",
        "FILE",
        "SIZE",
        "STATUS",
        "CREATED",
        "JOB ID",
        width = width
    );

    for job in jobs {
        let _ = writeln!(
            out,
            "{:<width$}  {:>9}  {:<16}  {:<16}  {}",
            truncate(&job.file_name, width),
            format_file_size(job.file_size_bytes),
            job.status.label(),
            format_created_at(&job.created_at),
            job.job_id,
            width = width
        );
    }

    let _ = write!(out, "{} job(s)", jobs.len());
    out
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut cut: String = name.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
