//! # Config File Integration Tests
//!
//! Loads client settings from a JSON file on disk, the way the CLI does, and
//! mounts against the mock backend with them.

use std::io::Write;
use std::time::Duration;

use lib_showroom::{Placement, ShowroomClient, SyncConfig, SyncMode};
use project_tests::fixtures::sponsored;
use project_tests::MockBackend;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn write_config(body: &serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[tokio::test]
async fn client_runs_on_settings_from_a_file() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_content(vec![sponsored("h1", "hero", 5)]);
    let file = write_config(&json!({
        "apiUrl": backend.base_url(),
        "authToken": "file-token",
        "pollIntervalMs": 150,
        "requestTimeoutMs": 300,
        "safetyTimeoutMs": 600,
        "maxRetries": 0
    }));

    let settings = SyncConfig::load(Some(file.path()), SyncConfig::default()).unwrap();
    assert_eq!(settings.timings.poll_interval, Duration::from_millis(150));

    let client = ShowroomClient::connect(&settings).unwrap();
    let mut hero = client.sponsored_content(Some(Placement::Hero), 3);
    let state = tokio::time::timeout(WAIT, hero.wait_for(|s| !s.items.is_empty()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(state.items[0].id, "h1");
    assert_eq!(state.mode, SyncMode::FailoverPolling);
    assert_eq!(
        backend.last_poll_authorization().as_deref(),
        Some("Bearer file-token")
    );
}

#[tokio::test]
async fn overrides_beat_the_file() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_content(vec![sponsored("s1", "sidebar", 1)]);
    let file = write_config(&json!({
        "apiUrl": "http://127.0.0.1:9",
        "authToken": "file-token",
        "pollIntervalMs": 150,
        "requestTimeoutMs": 300,
        "safetyTimeoutMs": 600,
        "maxRetries": 0
    }));
    let overrides = SyncConfig {
        api_url: Some(backend.base_url()),
        auth_token: Some("flag-token".into()),
        ..Default::default()
    };

    let settings = SyncConfig::load(Some(file.path()), overrides).unwrap();
    let client = ShowroomClient::connect(&settings).unwrap();
    let mut sidebar = client.sponsored_content(Some(Placement::Sidebar), 3);
    let state = tokio::time::timeout(WAIT, sidebar.wait_for(|s| !s.items.is_empty()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(state.items[0].id, "s1");
    assert_eq!(
        backend.last_poll_authorization().as_deref(),
        Some("Bearer flag-token")
    );
}

#[tokio::test]
async fn malformed_file_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"apiUrl\": ").unwrap();

    let err = SyncConfig::load(Some(file.path()), SyncConfig::default()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"), "{err}");
}
