//! Settings persistence through the public API

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use sanitize_client::settings::{JsonSettingsStore, Settings, SettingsProvider};

fn sample() -> Settings {
    Settings {
        base_url: "https://appliance.local/api/v1".to_string(),
        auth_token: "token-abc".to_string(),
        auth_token_expires_at: Some(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()),
        api_key: "key-123".to_string(),
    }
}

#[tokio::test]
async fn test_saved_settings_are_visible_to_a_new_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sanitize-client").join("settings.json");

    JsonSettingsStore::new(&path).save(&sample()).await.unwrap();

    // A fresh store reads what the first one wrote
    let reopened = JsonSettingsStore::new(&path).load().await.unwrap();
    assert_eq!(reopened, sample());

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(raw.contains("\"BaseUrl\""));
    assert!(raw.contains("\"AuthTokenExpiresAt\""));
    assert!(raw.contains('\n'), "settings file should be indented");
}

#[tokio::test]
async fn test_concurrent_saves_leave_a_readable_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonSettingsStore::new(temp_dir.path().join("settings.json")));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut settings = sample();
            settings.api_key = format!("key-{}", i);
            store.save(&settings).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Last writer wins, but the file is never torn
    let loaded = store.load().await.unwrap();
    assert!(loaded.api_key.starts_with("key-"));
    assert_eq!(loaded.base_url, sample().base_url);
}

#[tokio::test]
async fn test_missing_file_loads_empty_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonSettingsStore::new(temp_dir.path().join("absent.json"));

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded, Settings::default());
    assert!(!loaded.has_base_url());
    assert!(loaded.api_key().is_none());
}
