//! Document builders and fast client settings.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use lib_showroom::{SyncConfig, SyncSettings, SyncTimings};

/// Timers short enough for tests, ordered like the real ones
/// (poll interval > safety timeout > request timeout).
pub fn fast_timings() -> SyncTimings {
    SyncTimings {
        poll_interval: Duration::from_millis(150),
        request_timeout: Duration::from_millis(300),
        safety_timeout: Duration::from_millis(600),
    }
}

/// Settings pointing at a mock backend, without retries.
pub fn settings(api_url: &str, realtime_url: Option<String>) -> SyncSettings {
    let timings = fast_timings();
    let config = SyncConfig {
        api_url: Some(api_url.to_string()),
        realtime_url,
        poll_interval_ms: Some(timings.poll_interval.as_millis() as u64),
        request_timeout_ms: Some(timings.request_timeout.as_millis() as u64),
        safety_timeout_ms: Some(timings.safety_timeout.as_millis() as u64),
        connect_timeout_ms: Some(500),
        max_retries: Some(0),
        ..Default::default()
    };
    match config.resolve() {
        Ok(settings) => settings,
        Err(e) => panic!("test settings must be valid: {e}"),
    }
}

/// An active sponsored-content document created `minutes_ago`.
pub fn sponsored(id: &str, placement: &str, minutes_ago: i64) -> Value {
    let created = Utc::now() - ChronoDuration::minutes(minutes_ago);
    json!({
        "id": id,
        "placement": placement,
        "title": format!("Sponsored {id}"),
        "description": "Certified pre-owned, low mileage",
        "imageUrl": format!("https://cdn.example.com/{id}.jpg"),
        "linkUrl": format!("https://dealer.example.com/{id}"),
        "linkType": "external",
        "status": "active",
        "createdAt": created.to_rfc3339(),
        "impressions": 0,
        "clicks": 0
    })
}

/// Same as [`sponsored`] but whose window ended an hour ago.
pub fn expired(id: &str, placement: &str, minutes_ago: i64) -> Value {
    let mut doc = sponsored(id, placement, minutes_ago);
    doc["endAt"] = json!((Utc::now() - ChronoDuration::hours(1)).timestamp_millis());
    doc
}

/// Same as [`sponsored`] with a given status.
pub fn with_status(id: &str, placement: &str, status: &str) -> Value {
    let mut doc = sponsored(id, placement, 1);
    doc["status"] = json!(status);
    doc
}
