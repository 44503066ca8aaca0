//! Command-line argument parsing for the sanitize client
//!
//! This module defines the CLI structure using clap derive macros. A bare
//! file path runs the context-menu flow; subcommands cover server setup,
//! credentials and the job catalogue.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Sanitize Client - Submit files to a sanitization server
#[derive(Parser, Debug)]
#[command(
    name = "sanitize_client",
    version,
    about = "Submit files to a content-sanitization server and download the cleaned result",
    long_about = "Uploads a file to a remote sanitization service, waits for the job to finish and
saves the sanitized copy. Passing a file path without a subcommand runs the same
flow used by the desktop 'open with' integration.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// File supplied by an 'open with' or context-menu invocation
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate and store the sanitization server address
    Hostname {
        /// Host name or URL (prompted when omitted)
        host: Option<String>,
    },

    /// Sign in with a username and password
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Store and validate the integration API key
    ApiKey {
        /// API key (prompted when omitted)
        key: Option<String>,
    },

    /// List job history
    Jobs,

    /// Sanitize one file and save the result
    Sanitize(SanitizeArgs),

    /// Sanitize dropped files (exactly one is accepted)
    Drop(DropArgs),

    /// Download the sanitized or original file of a job
    Download(DownloadArgs),

    /// Download the PDF report of a job
    Report {
        /// Job identifier
        job_id: String,

        /// Directory to save the report in
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,
    },

    /// Show the operations the server ran on a job
    Details {
        /// Job identifier
        job_id: String,
    },

    /// Show server, session and API key status
    Status,
}

/// Arguments for the sanitize command
#[derive(Args, Debug, Clone)]
pub struct SanitizeArgs {
    /// File to sanitize
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory to save the sanitized file in
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Passwords to try on protected archives, comma separated
    #[arg(long, value_name = "LIST")]
    pub passwords: Option<String>,
}

/// Arguments for the drop command
#[derive(Args, Debug, Clone)]
pub struct DropArgs {
    /// Dropped files
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Directory to save the sanitized file in
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Job identifier
    pub job_id: String,

    /// Download the original upload instead of the sanitized file
    #[arg(long)]
    pub original: bool,

    /// Directory to save the file in
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// File name to save as (defaults to the name reported by the server)
    #[arg(short, long)]
    pub name: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments, falling back to
    /// the configured level
    pub fn log_level(&self, configured: tracing::Level) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            configured
        }
    }
}

impl SanitizeArgs {
    /// Reject inputs that cannot be a single readable file
    pub fn validate(&self) -> Result<(), String> {
        if self.file.as_os_str().is_empty() {
            return Err("File path must not be empty".to_string());
        }
        if let Some(dest) = &self.dest {
            if dest.is_file() {
                return Err(format!("Destination {} is a file", dest.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_file_without_subcommand() {
        let cli = Cli::try_parse_from(["sanitize_client", "report.docx"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("report.docx")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_no_arguments_is_interactive_mode() {
        let cli = Cli::try_parse_from(["sanitize_client"]).unwrap();
        assert!(cli.file.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["sanitize_client", "sanitize", "a.pdf", "--dest", "out"])
            .unwrap();
        match cli.command {
            Some(Commands::Sanitize(args)) => {
                assert_eq!(args.file, PathBuf::from("a.pdf"));
                assert_eq!(args.dest, Some(PathBuf::from("out")));
                assert!(args.validate().is_ok());
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["sanitize_client", "drop", "a.pdf", "b.pdf"]).unwrap();
        match cli.command {
            Some(Commands::Drop(args)) => assert_eq!(args.files.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["sanitize_client", "download", "42", "--original"])
            .unwrap();
        match cli.command {
            Some(Commands::Download(args)) => {
                assert_eq!(args.job_id, "42");
                assert!(args.original);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["sanitize_client", "api-key"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ApiKey { key: None })));
    }

    #[test]
    fn test_drop_requires_a_file() {
        assert!(Cli::try_parse_from(["sanitize_client", "drop"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let quiet = Cli::try_parse_from(["sanitize_client", "-q", "status"]).unwrap();
        let verbose = Cli::try_parse_from(["sanitize_client", "status", "-v"]).unwrap();
        let debug = Cli::try_parse_from(["sanitize_client", "--very-verbose"]).unwrap();
        let default = Cli::try_parse_from(["sanitize_client"]).unwrap();

        let configured = tracing::Level::WARN;
        assert_eq!(quiet.log_level(configured), tracing::Level::ERROR);
        assert_eq!(verbose.log_level(configured), tracing::Level::INFO);
        assert_eq!(debug.log_level(configured), tracing::Level::DEBUG);
        assert_eq!(default.log_level(configured), tracing::Level::WARN);
        assert_eq!(
            default.log_level(tracing::Level::TRACE),
            tracing::Level::TRACE
        );
    }
}
