//! # Impression & Click Tracking
//!
//! One [`ImpressionTracker`] lives for one mount of a content surface. It keeps
//! the set of item ids whose impression has already been reported, so an item
//! scrolling out of view and back in is counted once. Clicks are never
//! deduplicated.
//!
//! Reporting is fire-and-forget: the HTTP call runs on its own task, and any
//! failure goes to the observer and nowhere else.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::observer::{FailureKind, SyncObserver};
use crate::error::SyncError;
use crate::retrieve::ky_http::ApiClient;

/// Default fraction of an element that must be on screen to count as seen.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;

/// The engagement event being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementKind {
    /// The item was shown.
    Impression,
    /// The item's link was activated.
    Click,
}

impl EngagementKind {
    /// Path segment of the increment endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Impression => "impression",
            EngagementKind::Click => "click",
        }
    }
}

/// Where engagement events go. Must not block.
pub trait EngagementSink: Send + Sync {
    /// Reports one event for `item_id`.
    fn record(&self, item_id: &str, kind: EngagementKind);
}

/// Posts engagement events to `POST <base_path>/{id}/{impression|click}`.
pub struct HttpEngagement {
    api: Arc<ApiClient>,
    base_path: &'static str,
    collection: &'static str,
    observer: Arc<dyn SyncObserver>,
}

impl HttpEngagement {
    /// Sponsored content lives under `api/public/sponsored-content`.
    pub const SPONSORED_CONTENT_PATH: &'static str = "api/public/sponsored-content";

    /// Creates a sink for the collection whose documents live under `base_path`.
    pub fn new(
        api: Arc<ApiClient>,
        base_path: &'static str,
        collection: &'static str,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        Self { api, base_path, collection, observer }
    }
}

impl EngagementSink for HttpEngagement {
    fn record(&self, item_id: &str, kind: EngagementKind) {
        let url = match self.api.endpoint_with_segments(self.base_path, &[item_id, kind.as_str()]) {
            Ok(url) => url,
            Err(e) => {
                self.observer.on_failure(self.collection, FailureKind::Engagement, &e);
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            let err = SyncError::Config("engagement reported outside of a tokio runtime".into());
            self.observer.on_failure(self.collection, FailureKind::Engagement, &err);
            return;
        };

        let api = Arc::clone(&self.api);
        let observer = Arc::clone(&self.observer);
        let collection = self.collection;
        let item_id = item_id.to_string();

        runtime.spawn(async move {
            match api.post_empty(url).await {
                Ok(status) if (200..300).contains(&status) => {
                    tracing::trace!(
                        collection,
                        item_id,
                        kind = kind.as_str(),
                        "engagement recorded"
                    );
                }
                Ok(status) => {
                    let err = SyncError::Status { status, body: String::new() };
                    observer.on_failure(collection, FailureKind::Engagement, &err);
                }
                Err(e) => observer.on_failure(collection, FailureKind::Engagement, &e),
            }
        });
    }
}

/// Per-mount impression deduplicator and click forwarder.
pub struct ImpressionTracker {
    recorded: Mutex<HashSet<String>>,
    threshold: f64,
    sink: Arc<dyn EngagementSink>,
}

impl ImpressionTracker {
    /// Creates an empty tracker. `threshold` is the visible fraction (0, 1]
    /// at which an impression counts.
    pub fn new(sink: Arc<dyn EngagementSink>, threshold: f64) -> Self {
        Self {
            recorded: Mutex::new(HashSet::new()),
            threshold,
            sink,
        }
    }

    /// Feeds one visibility observation for `item_id`.
    ///
    /// Returns `true` if this call reported the impression: the item is at
    /// least `threshold` visible and had not been reported in this mount.
    pub fn on_visibility(&self, item_id: &str, visible_ratio: f64) -> bool {
        if visible_ratio.is_nan() || visible_ratio < self.threshold {
            return false;
        }

        let first_time = self
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_id.to_string());

        if first_time {
            self.sink.record(item_id, EngagementKind::Impression);
        }
        first_time
    }

    /// Reports a click. Every call is reported.
    pub fn on_click(&self, item_id: &str) {
        self.sink.record(item_id, EngagementKind::Click);
    }

    /// Whether the impression for `item_id` was already reported.
    pub fn has_recorded(&self, item_id: &str) -> bool {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item_id)
    }

    /// Number of distinct items reported in this mount.
    pub fn recorded_count(&self) -> usize {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, EngagementKind)>>,
    }

    impl RecordingSink {
        fn count(&self, kind: EngagementKind) -> usize {
            self.events.lock().unwrap().iter().filter(|(_, k)| *k == kind).count()
        }
    }

    impl EngagementSink for RecordingSink {
        fn record(&self, item_id: &str, kind: EngagementKind) {
            self.events.lock().unwrap().push((item_id.to_string(), kind));
        }
    }

    fn tracker() -> (ImpressionTracker, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (ImpressionTracker::new(sink.clone(), DEFAULT_VISIBILITY_THRESHOLD), sink)
    }

    #[test]
    fn repeated_visibility_reports_once() {
        let (tracker, sink) = tracker();

        let fired: Vec<bool> = (0..10).map(|_| tracker.on_visibility("sc-1", 0.9)).collect();

        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert!(fired[0]);
        assert_eq!(sink.count(EngagementKind::Impression), 1);
        assert!(tracker.has_recorded("sc-1"));
    }

    #[test]
    fn below_threshold_is_ignored() {
        let (tracker, sink) = tracker();

        assert!(!tracker.on_visibility("sc-1", 0.49));
        assert!(!tracker.on_visibility("sc-1", f64::NAN));
        assert!(!tracker.has_recorded("sc-1"));

        assert!(tracker.on_visibility("sc-1", 0.5));
        assert_eq!(sink.count(EngagementKind::Impression), 1);
    }

    #[test]
    fn scroll_out_and_back_in_does_not_recount() {
        let (tracker, sink) = tracker();

        for ratio in [0.6, 0.0, 0.2, 1.0, 0.0, 0.75] {
            tracker.on_visibility("sc-7", ratio);
        }

        assert_eq!(sink.count(EngagementKind::Impression), 1);
    }

    #[test]
    fn distinct_items_each_count_once() {
        let (tracker, sink) = tracker();

        for id in ["a", "b", "a", "c", "b"] {
            tracker.on_visibility(id, 1.0);
        }

        assert_eq!(tracker.recorded_count(), 3);
        assert_eq!(sink.count(EngagementKind::Impression), 3);
    }

    #[test]
    fn clicks_are_never_deduplicated() {
        let (tracker, sink) = tracker();

        tracker.on_visibility("sc-1", 1.0);
        for _ in 0..4 {
            tracker.on_click("sc-1");
        }

        assert_eq!(sink.count(EngagementKind::Click), 4);
        assert_eq!(sink.count(EngagementKind::Impression), 1);
    }

    #[test]
    fn a_new_mount_starts_with_an_empty_set() {
        let sink = Arc::new(RecordingSink::default());
        let first = ImpressionTracker::new(sink.clone(), 0.5);
        first.on_visibility("sc-1", 1.0);
        drop(first);

        let second = ImpressionTracker::new(sink.clone(), 0.5);
        assert!(second.on_visibility("sc-1", 1.0));
        assert_eq!(sink.count(EngagementKind::Impression), 2);
    }
}
