//! # Engagement Reporting Integration Tests
//!
//! Impression deduplication and click forwarding through a real client, with
//! the counts observed on the mock backend.

use std::sync::Arc;
use std::time::Duration;

use lib_showroom::{FailureKind, ShowroomClient, TracingObserver};
use project_tests::fixtures::settings;
use project_tests::MockBackend;

const WAIT: Duration = Duration::from_secs(5);

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

fn client(backend: &MockBackend) -> (ShowroomClient, Arc<TracingObserver>) {
    let observer = Arc::new(TracingObserver::new());
    let client = ShowroomClient::connect(&settings(&backend.base_url(), None))
        .unwrap()
        .with_observer(observer.clone());
    (client, observer)
}

#[tokio::test]
async fn one_impression_per_item_per_mount() {
    let backend = MockBackend::start().await.unwrap();
    let (client, _observer) = client(&backend);

    let tracker = client.impression_tracker();
    for ratio in [0.2, 0.6, 0.9, 0.0, 0.7, 1.0] {
        tracker.on_visibility("sc-1", ratio);
    }
    tracker.on_visibility("sc-2", 0.5);

    eventually(|| backend.engagement_count("sc-2", "impression") == 1).await;
    eventually(|| backend.engagement_count("sc-1", "impression") == 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.engagement_count("sc-1", "impression"), 1);

    // A remount starts over.
    let remount = client.impression_tracker();
    assert!(remount.on_visibility("sc-1", 1.0));
    eventually(|| backend.engagement_count("sc-1", "impression") == 2).await;
}

#[tokio::test]
async fn every_click_is_reported() {
    let backend = MockBackend::start().await.unwrap();
    let (client, _observer) = client(&backend);

    let tracker = client.impression_tracker();
    for _ in 0..3 {
        tracker.on_click("sc-9");
    }

    eventually(|| backend.engagement_count("sc-9", "click") == 3).await;
    assert_eq!(backend.engagement_count("sc-9", "impression"), 0);
}

#[tokio::test]
async fn failed_reports_only_reach_the_observer() {
    let backend = MockBackend::start().await.unwrap();
    let (client, observer) = client(&backend);

    let tracker = client.impression_tracker();
    assert!(tracker.on_visibility("broken", 1.0));
    tracker.on_click("broken");

    eventually(|| observer.count(FailureKind::Engagement) == 2).await;
    // The id stays recorded: a failed report is not retried in this mount.
    assert!(!tracker.on_visibility("broken", 1.0));
}
