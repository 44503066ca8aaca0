//! Progress surface seam between the coordinator and a user interface
//!
//! The coordinator owns exactly one surface. Adapters translate these calls
//! into terminal spinners, dialogs or whatever the front end offers; they
//! hold no flow logic of their own.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::models::JobRecord;

/// How the progress indicator is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Inside the main view
    Inline,
    /// Blocking indicator shown before the main view exists
    Modal,
}

/// User-facing notices outside the progress indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Another upload owns the indicator
    Busy,
    /// More than one file was dropped
    SingleFileOnly { count: usize },
    /// A flow finished with an error
    Error(String),
    /// A flow finished and the artifact was saved
    Saved { path: PathBuf },
}

/// UI adapter driven by the coordinator
#[async_trait]
pub trait ProgressSurface: Send + Sync {
    /// Show the progress indicator
    fn begin(&self, mode: SurfaceMode, message: &str);

    /// Replace the indicator text
    fn update(&self, message: &str);

    /// Hide the indicator
    fn dismiss(&self);

    /// Show a notice
    fn notify(&self, notice: Notice);

    /// Show the distinct success surface and wait until the user acknowledges it
    async fn acknowledge_success(&self, saved_to: &Path);

    /// Reveal the main view after a headless startup run
    fn reveal_main(&self);

    /// Display the job list
    fn show_jobs(&self, jobs: &[JobRecord]);
}

/// Dismisses the surface when dropped, on every exit path
pub struct SurfaceGuard<'a> {
    surface: &'a dyn ProgressSurface,
}

impl<'a> SurfaceGuard<'a> {
    /// Begin the indicator and return the guard owning it
    pub fn begin(surface: &'a dyn ProgressSurface, mode: SurfaceMode, message: &str) -> Self {
        surface.begin(mode, message);
        Self { surface }
    }

    /// Replace the indicator text
    pub fn update(&self, message: &str) {
        self.surface.update(message);
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.surface.dismiss();
    }
}

/// A surface call, as captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Begin(SurfaceMode, String),
    Update(String),
    Dismiss,
    Notify(Notice),
    Acknowledged(PathBuf),
    RevealMain,
    ShowJobs(usize),
}

/// Surface that records every call instead of drawing anything
///
/// Used for headless runs and by tests asserting on what the user would see.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Notices recorded so far
    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Notify(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[async_trait]
impl ProgressSurface for RecordingSurface {
    fn begin(&self, mode: SurfaceMode, message: &str) {
        self.push(SurfaceEvent::Begin(mode, message.to_string()));
    }

    fn update(&self, message: &str) {
        self.push(SurfaceEvent::Update(message.to_string()));
    }

    fn dismiss(&self) {
        self.push(SurfaceEvent::Dismiss);
    }

    fn notify(&self, notice: Notice) {
        self.push(SurfaceEvent::Notify(notice));
    }

    async fn acknowledge_success(&self, saved_to: &Path) {
        self.push(SurfaceEvent::Acknowledged(saved_to.to_path_buf()));
    }

    fn reveal_main(&self) {
        self.push(SurfaceEvent::RevealMain);
    }

    fn show_jobs(&self, jobs: &[JobRecord]) {
        self.push(SurfaceEvent::ShowJobs(jobs.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_dismisses_on_drop() {
        let surface = RecordingSurface::new();
        {
            let guard = SurfaceGuard::begin(&surface, SurfaceMode::Inline, "Uploading");
            guard.update("Polling");
        }
        assert_eq!(
            surface.events(),
            vec![
                SurfaceEvent::Begin(SurfaceMode::Inline, "Uploading".to_string()),
                SurfaceEvent::Update("Polling".to_string()),
                SurfaceEvent::Dismiss,
            ]
        );
    }

    #[test]
    fn test_guard_dismisses_on_early_return() {
        // Error path through `?` still releases the indicator
        fn failing(surface: &RecordingSurface) -> Result<(), &'static str> {
            let _guard = SurfaceGuard::begin(surface, SurfaceMode::Modal, "Sanitizing");
            Err::<(), _>("boom")?;
            Ok(())
        }

        let surface = RecordingSurface::new();
        assert!(failing(&surface).is_err());
        assert_eq!(surface.events().last(), Some(&SurfaceEvent::Dismiss));
    }
}
