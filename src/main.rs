//! Sanitize Client CLI application
//!
//! Command-line entry point for submitting files to a sanitization server.
//! A bare file argument runs the context-menu flow; with no arguments at all
//! the client walks through setup and shows the job list.

use std::process;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use sanitize_client::cli::{
    handle_api_key, handle_details, handle_download, handle_drop, handle_hostname,
    handle_interactive, handle_jobs, handle_login, handle_report, handle_sanitize,
    handle_startup_file, handle_status, AppContext, Cli, Commands,
};
use sanitize_client::errors::{AppError, Result};

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        // Flow errors were already shown on the progress surface
        if !matches!(e, AppError::Flow(_)) {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse_args();

    let ctx = AppContext::load(cli.global.config.clone(), cli.global.quiet).await?;

    // Initialize logging based on verbosity
    init_logging(&cli, ctx.log_level());

    info!("Sanitize Client v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(file) = &cli.file {
        info!("Processing startup file {}", file.display());
        return handle_startup_file(&ctx, file).await;
    }

    // Execute the appropriate command
    match cli.command {
        Some(Commands::Hostname { host }) => handle_hostname(&ctx, host).await,
        Some(Commands::Login { username }) => handle_login(&ctx, username).await,
        Some(Commands::ApiKey { key }) => handle_api_key(&ctx, key).await,
        Some(Commands::Jobs) => handle_jobs(&ctx).await,
        Some(Commands::Sanitize(args)) => {
            info!("Executing sanitize command");
            handle_sanitize(&ctx, args).await
        }
        Some(Commands::Drop(args)) => {
            info!("Executing drop command with {} file(s)", args.files.len());
            handle_drop(&ctx, args).await
        }
        Some(Commands::Download(args)) => handle_download(&ctx, args).await.map(|_| ()),
        Some(Commands::Report { job_id, dest }) => {
            handle_report(&ctx, &job_id, dest).await.map(|_| ())
        }
        Some(Commands::Details { job_id }) => handle_details(&ctx, &job_id).await,
        Some(Commands::Status) => handle_status(&ctx).await,
        None => handle_interactive(&ctx).await,
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli, configured: tracing::Level) {
    let log_level = cli.log_level(configured);

    // Create environment filter
    let mut filter = EnvFilter::from_default_env();
    match format!("sanitize_client={}", log_level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Invalid log directive: {}", e),
    }

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    if cli.global.quiet && cli.global.verbose {
        warn!("--quiet overrides --verbose");
    }
}
