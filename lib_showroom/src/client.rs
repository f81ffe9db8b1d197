//! # Showroom Client
//!
//! The handle every consumer receives explicitly. It owns the shared HTTP
//! client, the realtime source, the observer and the root cancellation token,
//! and it is the only way to mount a live collection or create an impression
//! tracker.
//!
//! ```no_run
//! # async fn run() -> Result<(), lib_showroom::SyncError> {
//! use lib_showroom::{Placement, ShowroomClient, SyncConfig};
//!
//! let settings = SyncConfig {
//!     api_url: Some("https://cars.example.com".into()),
//!     ..Default::default()
//! }
//! .resolve()?;
//! let client = ShowroomClient::connect(&settings)?;
//!
//! let mut hero = client.sponsored_content(Some(Placement::Hero), 3);
//! let ready = hero.wait_for(|s| !s.loading).await;
//! # drop(ready);
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::configs::SyncSettings;
use crate::content::collections::{Collection, SponsoredContent};
use crate::content::model::{ContentItem, Placement};
use crate::core::impressions::{EngagementSink, HttpEngagement, ImpressionTracker};
use crate::core::live_collection::{LiveCollection, MountContext, SyncTimings};
use crate::core::observer::{SyncObserver, TracingObserver};
use crate::error::SyncError;
use crate::ingestors::{PollSource, RestPoller, SnapshotSource};
use crate::retrieve::ky_http::ApiClient;

/// Shared backend handle. Cheap to clone.
#[derive(Clone)]
pub struct ShowroomClient {
    api: Arc<ApiClient>,
    realtime: Option<Arc<dyn SnapshotSource>>,
    poller: Arc<dyn PollSource>,
    observer: Arc<dyn SyncObserver>,
    timings: SyncTimings,
    visibility_threshold: f64,
    root: CancellationToken,
}

impl ShowroomClient {
    /// Builds a client from validated settings.
    ///
    /// The realtime source is only set up when `realtime_url` is configured
    /// (and the `realtime` feature is enabled); otherwise every mount polls.
    pub fn connect(settings: &SyncSettings) -> Result<Self, SyncError> {
        let api = Arc::new(ApiClient::new(
            &settings.api_url,
            settings.auth_token.clone(),
            settings.max_retries,
            settings.timings.request_timeout,
        )?);

        #[cfg(feature = "realtime")]
        let realtime: Option<Arc<dyn SnapshotSource>> = settings.realtime_url.as_ref().map(|url| {
            Arc::new(crate::ingestors::WsSnapshotSource::new(url.clone(), settings.connect_timeout))
                as Arc<dyn SnapshotSource>
        });
        #[cfg(not(feature = "realtime"))]
        let realtime: Option<Arc<dyn SnapshotSource>> = None;

        tracing::info!(
            api_url = %api.base_url(),
            realtime = realtime.is_some(),
            "showroom client ready"
        );

        Ok(Self {
            poller: Arc::new(RestPoller::new(Arc::clone(&api))),
            api,
            realtime,
            observer: Arc::new(TracingObserver::new()),
            timings: settings.timings,
            visibility_threshold: settings.visibility_threshold,
            root: CancellationToken::new(),
        })
    }

    /// Replaces the failure observer.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces (or removes) the push subscription source.
    pub fn with_realtime(mut self, realtime: Option<Arc<dyn SnapshotSource>>) -> Self {
        self.realtime = realtime;
        self
    }

    /// Replaces the polling source.
    pub fn with_poller(mut self, poller: Arc<dyn PollSource>) -> Self {
        self.poller = poller;
        self
    }

    /// Overrides the mount timers.
    pub fn with_timings(mut self, timings: SyncTimings) -> Self {
        self.timings = timings;
        self
    }

    /// The shared HTTP client.
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// The failure observer.
    pub fn observer(&self) -> &Arc<dyn SyncObserver> {
        &self.observer
    }

    /// Mounts any collection. The mount stops on unmount or on [`shutdown`](Self::shutdown).
    pub fn mount<C: Collection>(&self, collection: C) -> LiveCollection<C::Item> {
        LiveCollection::mount(
            collection,
            MountContext {
                realtime: self.realtime.clone(),
                poller: Arc::clone(&self.poller),
                observer: Arc::clone(&self.observer),
                timings: self.timings,
                token: self.root.child_token(),
            },
        )
    }

    /// Mounts sponsored content for `placement` (every placement when `None`).
    pub fn sponsored_content(
        &self,
        placement: Option<Placement>,
        limit: usize,
    ) -> LiveCollection<ContentItem> {
        self.mount(SponsoredContent::new(placement, limit))
    }

    /// A fresh impression tracker for one mount of a sponsored-content surface.
    pub fn impression_tracker(&self) -> ImpressionTracker {
        let sink: Arc<dyn EngagementSink> = Arc::new(HttpEngagement::new(
            Arc::clone(&self.api),
            HttpEngagement::SPONSORED_CONTENT_PATH,
            "sponsored_content",
            Arc::clone(&self.observer),
        ));
        ImpressionTracker::new(sink, self.visibility_threshold)
    }

    /// Stops every mount created from this client (and its clones).
    pub fn shutdown(&self) {
        tracing::info!("showroom client shutting down");
        self.root.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}
