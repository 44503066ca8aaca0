//! Unit tests for the upload coordinator
//!
//! These drive the full submit, poll, download and persist flow against a
//! wiremock server with millisecond poll intervals.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::app::client::ClientConfig;
use crate::app::jobs::PollConfig;
use crate::settings::{MemorySettingsStore, Settings};

use super::*;

const SANITIZED_BYTES: &[u8] = b"clean document bytes";

/// Create test coordinator configuration
///
/// Short intervals keep the tests fast while still exercising the real
/// timers.
pub fn create_test_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_poll(PollConfig {
            interval: Duration::from_millis(10),
            max_ticks: 5,
        })
        .with_refresh_delay(Duration::from_millis(20))
}

fn settings_for(server: &MockServer) -> Settings {
    Settings {
        base_url: format!("{}/api/v1", server.uri()),
        auth_token: String::new(),
        auth_token_expires_at: None,
        api_key: "test-key".to_string(),
    }
}

/// Create a coordinator against the mock server
///
/// Returns the coordinator together with the recording surface it drives.
pub fn create_test_coordinator(
    settings: Settings,
    config: CoordinatorConfig,
) -> (Arc<Coordinator>, Arc<RecordingSurface>) {
    let store = Arc::new(MemorySettingsStore::new(settings));
    let client = IntegrationClient::with_config(&ClientConfig::default(), store).unwrap();
    let surface = Arc::new(RecordingSurface::new());
    let coordinator = Coordinator::new(client, surface.clone(), config);
    (Arc::new(coordinator), surface)
}

async fn mount_create(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/api/v1/integration/job/create"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"data":{"id":"batch-1","user_job_ids":["job-1"]},"error":false,"message":"created"}"#,
        ))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/integration/job/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/integration/job/download/sanitized/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(SANITIZED_BYTES.to_vec()))
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/integration/job/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"data":[{"user_job_info":{"created_at":"2026-03-01T10:00:00Z","status":"SANITIZED",
                "user_job_id":"job-1","file_name":"report.pdf","file_size":6}}],
                "error":false,"total_count":1}"#,
        ))
        .mount(server)
        .await;
}

async fn write_upload(dir: &TempDir, name: &str) -> PathBuf {
    let file = dir.path().join(name);
    tokio::fs::write(&file, b"dirty!").await.unwrap();
    file
}

fn drain(rx: &mut broadcast::Receiver<FlowState>) -> Vec<FlowState> {
    let mut seen = Vec::new();
    while let Ok(state) = rx.try_recv() {
        seen.push(state);
    }
    seen
}

fn begin_count(surface: &RecordingSurface) -> usize {
    surface
        .events()
        .iter()
        .filter(|e| matches!(e, SurfaceEvent::Begin(..)))
        .count()
}

/// Test the complete picker flow
///
/// Verifies the state sequence, the persisted artifact and that the job
/// list refresh only happens after the settling delay.
#[tokio::test]
async fn test_picker_flow_success() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, r#"{"status":"SANITIZED"}"#).await;
    mount_download(&server).await;
    mount_list(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "report.pdf").await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());
    let mut rx = coordinator.subscribe();

    let report = coordinator.sanitize_file(&file, None).await.unwrap();

    assert_eq!(report.poll_ticks, 1);
    assert_eq!(report.job.status, JobStatus::Sanitized);
    assert_eq!(report.saved_to, temp_dir.path().join("report_sanitized.pdf"));
    assert_eq!(tokio::fs::read(&report.saved_to).await.unwrap(), SANITIZED_BYTES);

    assert_eq!(
        drain(&mut rx),
        vec![
            FlowState::Uploading,
            FlowState::Polling,
            FlowState::Downloading,
            FlowState::Done(FlowOutcome::Success),
            FlowState::Idle,
        ]
    );
    assert_eq!(coordinator.state(), FlowState::Idle);
    assert!(!coordinator.is_busy());

    // Refresh has not happened yet
    assert!(!surface
        .events()
        .iter()
        .any(|e| matches!(e, SurfaceEvent::ShowJobs(_))));

    report.refresh.await.unwrap();
    let events = surface.events();
    assert!(matches!(events[0], SurfaceEvent::Begin(SurfaceMode::Inline, _)));
    let dismiss = events.iter().position(|e| *e == SurfaceEvent::Dismiss).unwrap();
    let saved = events
        .iter()
        .position(|e| matches!(e, SurfaceEvent::Notify(Notice::Saved { .. })))
        .unwrap();
    assert!(dismiss < saved);
    assert_eq!(events.last(), Some(&SurfaceEvent::ShowJobs(1)));
}

#[tokio::test]
async fn test_explicit_destination_is_created() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, "SANITIZED").await;
    mount_download(&server).await;
    mount_list(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "sheet.xlsx").await;
    let out = temp_dir.path().join("out").join("clean");
    let (coordinator, _) = create_test_coordinator(settings_for(&server), create_test_config());

    let report = coordinator.sanitize_file(&file, Some(&out)).await.unwrap();
    assert_eq!(report.saved_to, out.join("sheet_sanitized.xlsx"));
    assert_eq!(tokio::fs::read(&report.saved_to).await.unwrap(), SANITIZED_BYTES);
}

/// Test drag-and-drop of several files
///
/// The whole batch is rejected up front and the machine never leaves Idle.
#[tokio::test]
async fn test_multi_file_drop_never_leaves_idle() {
    let server = MockServer::start().await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());
    let mut rx = coordinator.subscribe();

    let files = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
    let result = coordinator.sanitize_dropped(&files, None).await;

    assert!(matches!(result, Err(FlowError::SingleFileOnly { count: 2 })));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(coordinator.state(), FlowState::Idle);
    assert_eq!(surface.notices(), vec![Notice::SingleFileOnly { count: 2 }]);
    assert_eq!(begin_count(&surface), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_drop_is_rejected() {
    let server = MockServer::start().await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());

    let result = coordinator.sanitize_dropped(&[], None).await;
    assert!(matches!(result, Err(FlowError::NoFile)));
    assert!(surface.events().is_empty());
}

#[tokio::test]
async fn test_single_file_drop_runs_pipeline() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, "SANITIZED").await;
    mount_download(&server).await;
    mount_list(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "notes.txt").await;
    let (coordinator, _) = create_test_coordinator(settings_for(&server), create_test_config());

    let report = coordinator.sanitize_dropped(&[file], None).await.unwrap();
    assert!(report.saved_to.ends_with("notes_sanitized.txt"));
}

/// Test the busy invariant
///
/// A second attempt while the first is polling is rejected with a notice
/// and never writes to the progress indicator.
#[tokio::test]
async fn test_second_upload_rejected_while_busy() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, r#"{"status":"IN_PROGRESS"}"#).await;

    let temp_dir = TempDir::new().unwrap();
    let first = write_upload(&temp_dir, "first.pdf").await;
    let second = write_upload(&temp_dir, "second.pdf").await;

    let config = create_test_config().with_poll(PollConfig {
        interval: Duration::from_millis(20),
        max_ticks: 10_000,
    });
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), config);
    let mut rx = coordinator.subscribe();

    let running = coordinator.clone();
    let handle = tokio::spawn(async move { running.sanitize_file(&first, None).await });

    loop {
        if rx.recv().await.unwrap() == FlowState::Polling {
            break;
        }
    }

    let result = coordinator.sanitize_file(&second, None).await;
    assert!(matches!(result, Err(FlowError::Busy)));
    assert_eq!(coordinator.state(), FlowState::Polling);
    assert_eq!(begin_count(&surface), 1);
    assert!(surface.notices().contains(&Notice::Busy));
    assert!(!surface.events().iter().any(|e| match e {
        SurfaceEvent::Begin(_, msg) | SurfaceEvent::Update(msg) => msg.contains("second.pdf"),
        _ => false,
    }));

    assert!(coordinator.cancel_current());
    let first_result = handle.await.unwrap();
    assert!(matches!(
        first_result,
        Err(FlowError::Job(JobError::PollCancelled))
    ));
    assert_eq!(coordinator.state(), FlowState::Idle);
    assert!(!coordinator.is_busy());
    assert_eq!(surface.events().iter().filter(|e| **e == SurfaceEvent::Dismiss).count(), 1);
}

/// Test an attempt whose future is dropped mid-poll
///
/// The busy flag and the cancel handle are released with it, so a later
/// cancel reports nothing in flight and a new upload is accepted.
#[tokio::test]
async fn test_abandoned_attempt_releases_cancel_handle() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, r#"{"status":"IN_PROGRESS"}"#).await;

    let temp_dir = TempDir::new().unwrap();
    let first = write_upload(&temp_dir, "first.pdf").await;
    let second = write_upload(&temp_dir, "second.pdf").await;

    let config = create_test_config().with_poll(PollConfig {
        interval: Duration::from_millis(20),
        max_ticks: 10_000,
    });
    let (coordinator, _surface) = create_test_coordinator(settings_for(&server), config);
    let mut rx = coordinator.subscribe();

    let running = coordinator.clone();
    let handle = tokio::spawn(async move { running.sanitize_file(&first, None).await });

    loop {
        if rx.recv().await.unwrap() == FlowState::Polling {
            break;
        }
    }

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert!(!coordinator.is_busy());
    assert_eq!(coordinator.state(), FlowState::Idle);
    assert!(!coordinator.cancel_current());

    // A fresh attempt is accepted and gets its own cancel handle
    let running = coordinator.clone();
    let handle = tokio::spawn(async move { running.sanitize_file(&second, None).await });
    loop {
        if rx.recv().await.unwrap() == FlowState::Polling {
            break;
        }
    }
    assert!(coordinator.cancel_current());
    assert!(matches!(
        handle.await.unwrap(),
        Err(FlowError::Job(JobError::PollCancelled))
    ));
    assert!(!coordinator.cancel_current());
}

/// Test server-reported failure
///
/// The indicator is dismissed before the error notice and nothing is written.
#[tokio::test]
async fn test_failed_status_surfaces_error_and_dismisses() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, r#"{"status":"FAILED","reason":"macro payload"}"#).await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "macro.docm").await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());
    let mut rx = coordinator.subscribe();

    let result = coordinator.sanitize_file(&file, None).await;
    match result {
        Err(FlowError::Job(JobError::SanitizationFailed { status, body })) => {
            assert_eq!(status, "FAILED");
            assert!(body.contains("macro payload"));
        }
        other => panic!("Expected SanitizationFailed, got {:?}", other),
    }

    let states = drain(&mut rx);
    assert_eq!(
        &states[states.len() - 2..],
        &[FlowState::Done(FlowOutcome::Failure), FlowState::Idle]
    );
    assert!(!states.contains(&FlowState::Downloading));

    let events = surface.events();
    let dismiss = events.iter().position(|e| *e == SurfaceEvent::Dismiss).unwrap();
    let error = events
        .iter()
        .position(|e| matches!(e, SurfaceEvent::Notify(Notice::Error(_))))
        .unwrap();
    assert!(dismiss < error);
    assert!(!temp_dir.path().join("macro_sanitized.docm").exists());
}

#[tokio::test]
async fn test_missing_api_key_is_user_facing() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "a.pdf").await;

    let mut settings = settings_for(&server);
    settings.api_key = String::new();
    let (coordinator, surface) = create_test_coordinator(settings, create_test_config());

    let result = coordinator.sanitize_file(&file, None).await;
    assert!(matches!(result, Err(FlowError::Job(JobError::MissingApiKey))));
    assert!(surface.events().contains(&SurfaceEvent::Dismiss));
    assert!(matches!(surface.notices()[0], Notice::Error(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_timeout_after_tick_cap() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, "IN_PROGRESS").await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "slow.zip").await;
    let (coordinator, _) = create_test_coordinator(settings_for(&server), create_test_config());

    let result = coordinator.sanitize_file(&file, None).await;
    assert!(matches!(
        result,
        Err(FlowError::Job(JobError::PollTimedOut { ticks: 5, .. }))
    ));

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().contains("/status/"))
        .count();
    assert_eq!(polls, 5);
}

#[tokio::test]
async fn test_download_failure_is_reported() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, "SANITIZED").await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/integration/job/download/sanitized/.*$"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "a.pdf").await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());

    let result = coordinator.sanitize_file(&file, None).await;
    assert!(matches!(
        result,
        Err(FlowError::Job(JobError::DownloadFailed { status: 500, .. }))
    ));
    assert!(surface.events().contains(&SurfaceEvent::Dismiss));
}

/// Test the startup entry point
///
/// Modal indicator, then success acknowledgement, then the main view, then
/// the delayed refresh.
#[tokio::test]
async fn test_startup_flow_acknowledges_then_reveals() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, "SANITIZED").await;
    mount_download(&server).await;
    mount_list(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let file = write_upload(&temp_dir, "startup.pdf").await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());

    let report = coordinator.sanitize_startup_file(&file, None).await.unwrap();
    report.refresh.await.unwrap();

    let events = surface.events();
    assert!(matches!(events[0], SurfaceEvent::Begin(SurfaceMode::Modal, _)));
    let tail: Vec<_> = events
        .iter()
        .skip_while(|e| **e != SurfaceEvent::Dismiss)
        .cloned()
        .collect();
    assert_eq!(
        tail,
        vec![
            SurfaceEvent::Dismiss,
            SurfaceEvent::Acknowledged(report.saved_to.clone()),
            SurfaceEvent::RevealMain,
            SurfaceEvent::ShowJobs(1),
        ]
    );
}

#[tokio::test]
async fn test_startup_failure_still_reveals_main() {
    let server = MockServer::start().await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());

    let result = coordinator
        .sanitize_startup_file(Path::new("/definitely/missing/file.pdf"), None)
        .await;
    assert!(matches!(
        result,
        Err(FlowError::Job(JobError::FileNotFound { .. }))
    ));
    assert_eq!(surface.events().last(), Some(&SurfaceEvent::RevealMain));
    assert!(!surface
        .events()
        .iter()
        .any(|e| matches!(e, SurfaceEvent::Acknowledged(_))));
}

#[tokio::test]
async fn test_refresh_jobs_shows_list() {
    let server = MockServer::start().await;
    mount_list(&server).await;
    let (coordinator, surface) = create_test_coordinator(settings_for(&server), create_test_config());

    let jobs = coordinator.refresh_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(surface.events(), vec![SurfaceEvent::ShowJobs(1)]);
}

#[test]
fn test_destination_defaults_to_source_directory() {
    let (coordinator, _) =
        create_test_coordinator(Settings::default(), CoordinatorConfig::default());
    assert_eq!(
        coordinator.destination_for(Path::new("/data/in/a.pdf"), None),
        PathBuf::from("/data/in")
    );
    assert_eq!(
        coordinator.destination_for(Path::new("a.pdf"), None),
        PathBuf::from(".")
    );
    assert_eq!(
        coordinator.destination_for(Path::new("/data/in/a.pdf"), Some(Path::new("/out"))),
        PathBuf::from("/out")
    );
}
