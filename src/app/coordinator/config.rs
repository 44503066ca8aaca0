//! Configuration structures for the upload coordinator

use std::path::PathBuf;
use std::time::Duration;

use crate::app::jobs::PollConfig;
use crate::constants::coordinator;

/// Configuration for the upload coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Status poll cadence and cap
    pub poll: PollConfig,
    /// Settling delay before the job list is refreshed after a success
    pub refresh_delay: Duration,
    /// Default destination directory; the original file's directory when unset
    pub destination_dir: Option<PathBuf>,
    /// Batch name prefix
    pub batch_name_hint: Option<String>,
    /// Passwords sent with every submission
    pub password_list: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            refresh_delay: coordinator::REFRESH_DELAY,
            destination_dir: None,
            batch_name_hint: None,
            password_list: None,
        }
    }
}

impl CoordinatorConfig {
    /// Set poll configuration
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the post-success settling delay
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Set the password list
    pub fn with_password_list(mut self, passwords: impl Into<String>) -> Self {
        self.password_list = Some(passwords.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.poll.max_ticks == 0 {
            return Err("Poll tick cap cannot be zero".to_string());
        }

        if self.poll.interval.is_zero() {
            return Err("Poll interval cannot be zero".to_string());
        }

        Ok(())
    }
}
