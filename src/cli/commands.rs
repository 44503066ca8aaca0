//! Command handlers for the sanitize client CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to the coordinator, the auth services and the job catalogue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::client::{persist, sanitized_file_name, DownloadHandler};
use crate::app::coordinator::{Coordinator, FlowReport, SignalHandler};
use crate::app::models::JobId;
use crate::app::IntegrationClient;
use crate::auth::{AuthService, HostnameService};
use crate::cli::progress::{render_job_table, ProgressConfig, TerminalSurface};
use crate::cli::startup::{
    check_startup, interactive_setup, prompt_line, prompt_secret, show_startup_status,
    store_api_key,
};
use crate::cli::{DownloadArgs, DropArgs, SanitizeArgs};
use crate::config::{AppConfig, RuntimeConfig};
use crate::constants::env as env_vars;
use crate::errors::{AppError, Result};
use crate::settings::{JsonSettingsStore, SettingsProvider};

/// Everything a command needs, built once per process
pub struct AppContext {
    settings: Arc<dyn SettingsProvider>,
    runtime: RuntimeConfig,
    progress: ProgressConfig,
}

impl AppContext {
    /// Assemble a context from its parts
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        runtime: RuntimeConfig,
        progress: ProgressConfig,
    ) -> Self {
        Self {
            settings,
            runtime,
            progress,
        }
    }

    /// Load configuration and open the per-user settings file
    pub async fn load(config_override: Option<PathBuf>, quiet: bool) -> Result<Self> {
        if config_override.is_none() && !quiet {
            if let Err(e) = AppConfig::initialize_first_run().await {
                warn!("Could not create default configuration: {}", e);
            }
        }

        let config = AppConfig::load(config_override).await?;
        let settings = JsonSettingsStore::open_default()?;
        debug!("Using settings file {}", settings.path().display());

        let progress = if quiet {
            ProgressConfig::quiet()
        } else {
            ProgressConfig::default()
        };

        Ok(Self::new(
            Arc::new(settings),
            config.to_runtime_config(),
            progress,
        ))
    }

    /// Log level from the `[logging]` section
    pub fn log_level(&self) -> tracing::Level {
        self.runtime.log_level
    }

    /// Settings provider shared by every service
    pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
        &self.settings
    }

    /// Integration client over a fresh transport
    pub fn client(&self) -> Result<IntegrationClient> {
        Ok(IntegrationClient::with_config(
            &self.runtime.client,
            self.settings.clone(),
        )?)
    }

    /// Sign-in and API key service
    pub fn auth(&self) -> Result<AuthService> {
        Ok(AuthService::new(
            self.client()?.transport().clone(),
            self.runtime.auth,
        ))
    }

    /// Hostname validation service
    pub fn hostnames(&self) -> HostnameService {
        HostnameService::new(self.settings.clone(), self.runtime.hostname.clone())
    }

    /// Coordinator drawing on the terminal, optionally with archive passwords
    pub fn coordinator(&self, password_list: Option<&str>) -> Result<Coordinator> {
        let mut config = self.runtime.coordinator.clone();
        if let Some(passwords) = password_list {
            config = config.with_password_list(passwords);
        }
        config.validate().map_err(AppError::generic)?;

        Ok(Coordinator::new(
            self.client()?,
            Arc::new(TerminalSurface::new(self.progress.clone())),
            config,
        ))
    }
}

/// Handle `hostname [HOST]`
pub async fn handle_hostname(ctx: &AppContext, host: Option<String>) -> Result<()> {
    let input = match host {
        Some(host) => host,
        None => prompt_line("Sanitization server (host or URL): ", None)?,
    };

    println!("🔍 Checking {}...", input.trim());
    let base_url = ctx.hostnames().configure(&input).await?;
    println!("✅ Server set to {}", base_url);
    Ok(())
}

/// Handle `login [--username NAME]`
pub async fn handle_login(ctx: &AppContext, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => prompt_line("Username: ", Some(env_vars::USERNAME))?,
    };
    let password = prompt_secret("Password: ", env_vars::PASSWORD)?;

    ctx.auth()?
        .sign_in_with_timeout(&username, &password)
        .await?;
    println!("✅ Signed in as {}", username);
    Ok(())
}

/// Handle `api-key [KEY]`
pub async fn handle_api_key(ctx: &AppContext, key: Option<String>) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => prompt_secret("Integration API key: ", env_vars::API_KEY)?,
    };

    store_api_key(&ctx.auth()?, &key).await?;
    Ok(())
}

/// Handle `jobs`
pub async fn handle_jobs(ctx: &AppContext) -> Result<()> {
    let jobs = ctx.client()?.list_jobs().await?;
    info!("Listed {} jobs", jobs.len());
    println!(
        "{}",
        render_job_table(&jobs, ctx.progress.max_filename_width)
    );
    Ok(())
}

/// Handle `sanitize FILE [--dest DIR]`
pub async fn handle_sanitize(ctx: &AppContext, args: SanitizeArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let coordinator = ctx.coordinator(args.passwords.as_deref())?;
    let signals = SignalHandler::new(coordinator.shutdown_token()).setup();
    let result = coordinator
        .sanitize_file(&args.file, args.dest.as_deref())
        .await;
    signals.abort();

    finish_flow(result?).await;
    Ok(())
}

/// Handle `drop FILE...`
pub async fn handle_drop(ctx: &AppContext, args: DropArgs) -> Result<()> {
    let coordinator = ctx.coordinator(None)?;
    let signals = SignalHandler::new(coordinator.shutdown_token()).setup();
    let result = coordinator
        .sanitize_dropped(&args.files, args.dest.as_deref())
        .await;
    signals.abort();

    finish_flow(result?).await;
    Ok(())
}

/// Handle a file passed without a subcommand (context-menu invocation)
pub async fn handle_startup_file(ctx: &AppContext, file: &Path) -> Result<()> {
    let coordinator = ctx.coordinator(None)?;
    let signals = SignalHandler::new(coordinator.shutdown_token()).setup();
    let result = coordinator.sanitize_startup_file(file, None).await;
    signals.abort();

    finish_flow(result?).await;
    Ok(())
}

/// Handle `download ID [--original] [--dest DIR] [--name NAME]`
pub async fn handle_download(ctx: &AppContext, args: DownloadArgs) -> Result<PathBuf> {
    let client = ctx.client()?;
    let job_id = JobId::new(args.job_id.trim());

    let file_name = match args.name {
        Some(name) => name,
        None => {
            let known = known_file_name(&client, &job_id).await;
            download_file_name(&job_id, args.original, known.as_deref())
        }
    };

    let handler = DownloadHandler::new(&client);
    let bytes = if args.original {
        handler.original(&job_id).await?
    } else {
        handler.sanitized(&job_id).await?
    };

    let dir = args.dest.unwrap_or_else(|| PathBuf::from("."));
    let saved_to = persist(&bytes, &dir, &file_name).await?;
    println!("✅ Saved {}", saved_to.display());
    Ok(saved_to)
}

/// Handle `report ID [--dest DIR]`
pub async fn handle_report(
    ctx: &AppContext,
    job_id: &str,
    dest: Option<PathBuf>,
) -> Result<PathBuf> {
    let client = ctx.client()?;
    let job_id = JobId::new(job_id.trim());

    let bytes = DownloadHandler::new(&client).report(&job_id).await?;
    let dir = dest.unwrap_or_else(|| PathBuf::from("."));
    let saved_to = persist(&bytes, &dir, &format!("{}_report.pdf", job_id)).await?;
    println!("📄 Report saved to {}", saved_to.display());
    Ok(saved_to)
}

/// Handle `details ID`
pub async fn handle_details(ctx: &AppContext, job_id: &str) -> Result<()> {
    let operations = ctx
        .client()?
        .job_operations(&JobId::new(job_id.trim()))
        .await?;
    let rendered = serde_json::to_string_pretty(&operations)
        .map_err(|e| AppError::generic(format!("Cannot render job details: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

/// Handle `status`
pub async fn handle_status(ctx: &AppContext) -> Result<()> {
    let status = check_startup(ctx.settings().as_ref()).await?;
    show_startup_status(&status);

    if status.is_ready() {
        let accepted = ctx.auth()?.validate_api_key().await;
        if accepted {
            println!("🔑 Server accepts the stored API key");
        } else {
            println!("⚠️  Server did not accept the stored API key");
        }
    }
    Ok(())
}

/// No file and no subcommand: complete setup, then show the job list
pub async fn handle_interactive(ctx: &AppContext) -> Result<()> {
    let status = interactive_setup(ctx.settings().as_ref(), &ctx.hostnames(), &ctx.auth()?).await?;
    show_startup_status(&status);

    if status.is_ready() {
        handle_jobs(ctx).await?;
    }
    Ok(())
}

/// Print the summary of a finished flow and wait for the delayed refresh
async fn finish_flow(report: FlowReport) {
    println!(
        "Job {} sanitized after {} status check(s)",
        report.job.job_id, report.poll_ticks
    );
    println!("Refreshing job list...");
    if let Err(e) = report.refresh.await {
        warn!("Job list refresh task failed: {}", e);
    }
}

async fn known_file_name(client: &IntegrationClient, job_id: &JobId) -> Option<String> {
    match client.list_jobs().await {
        Ok(jobs) => jobs
            .into_iter()
            .find(|job| &job.job_id == job_id)
            .map(|job| job.file_name),
        Err(e) => {
            debug!("Could not look up file name for job {}: {}", job_id, e);
            None
        }
    }
}

/// File name for a downloaded artifact
///
/// Uses the name reported in the job list when known, falling back to the
/// job id.
pub fn download_file_name(job_id: &JobId, original: bool, known_name: Option<&str>) -> String {
    let name = known_name
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "Unknown")
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned());

    match (name, original) {
        (Some(name), true) => name,
        (Some(name), false) => sanitized_file_name(Path::new(&name)),
        (None, true) => job_id.to_string(),
        (None, false) => format!("{}_sanitized", job_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettingsStore, Settings};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(server: &MockServer) -> AppContext {
        let mut settings = Settings::default();
        settings.set_base_url(&format!("{}/api/v1", server.uri()));
        settings.api_key = "key-123".to_string();

        AppContext::new(
            Arc::new(MemorySettingsStore::new(settings)),
            AppConfig::default().to_runtime_config(),
            ProgressConfig::quiet(),
        )
    }

    fn job_list_body() -> serde_json::Value {
        serde_json::json!({
            "data": [{
                "user_job_info": {
                    "username": "alice",
                    "created_at": "2024-03-01T09:15:00Z",
                    "status": "SANITIZED",
                    "user_job_id": "job-7",
                    "file_name": "invoice.pdf",
                    "file_size": 2048,
                    "file_extension": "pdf"
                }
            }],
            "error": false,
            "message": "",
            "total_count": 1
        })
    }

    #[test]
    fn test_download_file_name() {
        let id = JobId::new("job-7");
        assert_eq!(
            download_file_name(&id, false, Some("invoice.pdf")),
            "invoice_sanitized.pdf"
        );
        assert_eq!(download_file_name(&id, true, Some("invoice.pdf")), "invoice.pdf");
        assert_eq!(download_file_name(&id, false, None), "job-7_sanitized");
        assert_eq!(download_file_name(&id, true, Some("Unknown")), "job-7");
        // Server-provided names never escape the destination directory
        assert_eq!(
            download_file_name(&id, true, Some("../../etc/passwd")),
            "passwd"
        );
    }

    #[tokio::test]
    async fn test_download_uses_listed_file_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/job/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_list_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/job/download/sanitized/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"clean".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let args = DownloadArgs {
            job_id: "job-7".to_string(),
            original: false,
            dest: Some(temp_dir.path().to_path_buf()),
            name: None,
        };

        let saved = handle_download(&context(&server), args).await.unwrap();
        assert_eq!(saved, temp_dir.path().join("invoice_sanitized.pdf"));
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), b"clean");
    }

    #[tokio::test]
    async fn test_report_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/pdf-report/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let saved = handle_report(&context(&server), "job-7", Some(temp_dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(saved, temp_dir.path().join("job-7_report.pdf"));
    }

    #[tokio::test]
    async fn test_report_failure_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/pdf-report/job-7"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no report"))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let result =
            handle_report(&context(&server), "job-7", Some(temp_dir.path().to_path_buf())).await;
        assert!(matches!(
            result,
            Err(AppError::Job(crate::errors::JobError::DownloadFailed { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_jobs_and_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/job/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_list_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/integration/job/job-7"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [{"operation": "strip-macros"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server);
        handle_jobs(&ctx).await.unwrap();
        handle_details(&ctx, "job-7").await.unwrap();
    }

    #[tokio::test]
    async fn test_coordinator_rejects_invalid_poll_config() {
        let server = MockServer::start().await;
        let mut ctx = context(&server);
        ctx.runtime.coordinator.poll.max_ticks = 0;

        assert!(matches!(
            ctx.coordinator(None),
            Err(AppError::Generic { .. })
        ));
    }
}
