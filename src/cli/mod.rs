//! Command-line interface components
//!
//! This module contains CLI-specific code for the sanitize client,
//! including argument parsing, the terminal progress surface, and
//! interactive setup.

pub mod args;
pub mod commands;
pub mod progress;
pub mod startup;

pub use args::{Cli, Commands, DownloadArgs, DropArgs, GlobalArgs, SanitizeArgs};
pub use commands::{
    handle_api_key, handle_details, handle_download, handle_drop, handle_hostname,
    handle_interactive, handle_jobs, handle_login, handle_report, handle_sanitize,
    handle_startup_file, handle_status, AppContext,
};
pub use progress::{render_job_table, ProgressConfig, TerminalSurface};
pub use startup::{check_startup, interactive_setup, show_startup_status, StartupStatus};
