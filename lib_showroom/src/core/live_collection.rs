//! # Live Collection Subscriber
//!
//! Keeps one filtered, sorted, capped list of documents up to date for one
//! consumer (a hero carousel, a sidebar pair, a reviews block...). The consumer
//! sees a `watch` channel of [`LiveState`]: the current items, a `loading`
//! flag and the current [`SyncMode`].
//!
//! ## Lifecycle of a mount:
//! 1.  **Connecting**: the push subscription is opened. No realtime source, a
//!     connection error, or a timeout degrades the mount to polling.
//! 2.  **Streaming**: every pushed snapshot is decoded, filtered (status,
//!     placement/tenant, active window), sorted and truncated, then published.
//!     An error callback or the server closing the stream degrades the mount
//!     to polling for the rest of its life.
//! 3.  **FailoverPolling**: one time-boxed read right away, then one per
//!     interval. A failed or timed-out read keeps the previous list.
//!
//! Independently of the phase, a safety timer forces `loading = false` after
//! `safety_timeout` so a page is never stuck behind a spinner.
//!
//! ## Ownership
//! The `watch::Sender` lives inside the mount's task and nowhere else, so
//! every state write is serialized through one `select!` loop (last write
//! wins). Unmounting cancels the task's token and aborts the task; after that
//! nothing can write the state.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{error::Elapsed, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::content::collections::Collection;
use crate::core::mode::SyncMode;
use crate::core::observer::{FailureKind, SyncObserver};
use crate::error::SyncError;
use crate::ingestors::{PollSource, SnapshotSource, SnapshotStream};

/// Timers of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// Delay between two polls in failover mode.
    pub poll_interval: Duration,
    /// Time box of a single poll request.
    pub request_timeout: Duration,
    /// Upper bound on how long `loading` can stay `true`.
    pub safety_timeout: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
            safety_timeout: Duration::from_secs(2),
        }
    }
}

/// What a consumer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState<T> {
    /// Active items, in display order, at most `limit` of them.
    pub items: Vec<T>,
    /// `true` until the first result, failure or safety timeout.
    pub loading: bool,
    /// Current data source.
    pub mode: SyncMode,
    /// When `items` was last replaced.
    pub last_update: Option<DateTime<Utc>>,
}

impl<T> LiveState<T> {
    fn initial(mode: SyncMode, loading: bool) -> Self {
        Self {
            items: Vec::new(),
            loading,
            mode,
            last_update: None,
        }
    }
}

/// Everything a mount borrows from its client.
#[derive(Clone)]
pub struct MountContext {
    /// Push subscription source; `None` means realtime is unavailable.
    pub realtime: Option<Arc<dyn SnapshotSource>>,
    /// Polling source.
    pub poller: Arc<dyn PollSource>,
    /// Failure sink.
    pub observer: Arc<dyn SyncObserver>,
    /// Timers.
    pub timings: SyncTimings,
    /// Cancelled on unmount (and by the client's shutdown, as a child token).
    pub token: CancellationToken,
}

/// Handle to one mounted live collection.
///
/// Dropping the handle unmounts it.
pub struct LiveCollection<T> {
    collection: &'static str,
    rx: watch::Receiver<LiveState<T>>,
    token: CancellationToken,
    unmounted: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl<T> LiveCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Mounts `collection`: spawns its sync task and returns the handle.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn mount<C>(collection: C, ctx: MountContext) -> Self
    where
        C: Collection<Item = T>,
    {
        let name = collection.name();
        let token = ctx.token.clone();

        // A mount on a client that is already shut down never loads.
        let initial = if token.is_cancelled() {
            LiveState::initial(SyncMode::Closed, false)
        } else {
            LiveState::initial(SyncMode::Connecting, true)
        };
        let (tx, rx) = watch::channel(initial);

        tracing::debug!(collection = name, limit = collection.limit(), "mounting live collection");
        let unmounted = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(drive(collection, ctx, tx, Arc::clone(&unmounted)));

        Self {
            collection: name,
            rx,
            token,
            unmounted,
            task,
        }
    }

    /// A copy of the current state.
    pub fn state(&self) -> LiveState<T> {
        self.rx.borrow().clone()
    }

    /// The current items.
    pub fn items(&self) -> Vec<T> {
        self.rx.borrow().items.clone()
    }

    /// Whether the consumer should still show a loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().loading
    }

    /// The current data source.
    pub fn mode(&self) -> SyncMode {
        self.rx.borrow().mode
    }

    /// The collection name this handle watches.
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// A receiver for consumers that want to await changes themselves.
    pub fn subscribe(&self) -> watch::Receiver<LiveState<T>> {
        self.rx.clone()
    }

    /// Waits for the next published state. Returns `false` once the mount's
    /// task has ended and no further state will come.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until the state satisfies `predicate` and returns a copy of it,
    /// or `None` if the task ended first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&LiveState<T>) -> bool,
    ) -> Option<LiveState<T>> {
        self.rx.wait_for(predicate).await.ok().map(|state| (*state).clone())
    }

    /// Releases the subscription and stops every timer. Same as dropping the handle.
    pub fn unmount(self) {}
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        // Set before cancelling so the task never writes after teardown.
        self.unmounted.store(true, AtomicOrdering::SeqCst);
        self.token.cancel();
        self.task.abort();
        tracing::debug!(collection = self.collection, "live collection unmounted");
    }
}

/// Decodes, filters, sorts, deduplicates by id and truncates one snapshot.
///
/// Documents that fail to decode are skipped and reported as
/// [`FailureKind::Decode`]; the rest of the snapshot is still used.
pub fn refine<C: Collection>(
    collection: &C,
    docs: Vec<Value>,
    now: DateTime<Utc>,
    observer: &dyn SyncObserver,
) -> Vec<C::Item> {
    let mut items: Vec<C::Item> = docs
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<C::Item>(doc) {
            Ok(item) => Some(item),
            Err(e) => {
                observer.on_failure(collection.name(), FailureKind::Decode, &SyncError::Json(e));
                None
            }
        })
        .filter(|item| collection.accept(item, now))
        .collect();

    items.sort_by(|a, b| collection.compare(a, b));

    // A document listed twice (overlapping writes on the backend) is shown once.
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(collection.item_id(item).to_owned()));

    items.truncate(collection.limit());
    items
}

type PollOutcome = Result<Result<Vec<Value>, SyncError>, Elapsed>;
type PollFuture = Pin<Box<dyn Future<Output = PollOutcome> + Send>>;

async fn poll_in_flight(slot: &mut Option<PollFuture>) -> PollOutcome {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

struct Publisher<'a, T> {
    collection: &'static str,
    tx: watch::Sender<LiveState<T>>,
    observer: &'a dyn SyncObserver,
    unmounted: Arc<AtomicBool>,
}

impl<T> Publisher<'_, T> {
    fn items(&self, items: Vec<T>) {
        let count = items.len();
        self.tx.send_modify(|state| {
            state.items = items;
            state.loading = false;
            state.last_update = Some(Utc::now());
        });
        tracing::trace!(collection = self.collection, count, "published snapshot");
    }

    fn mode(&self, mode: SyncMode) {
        let changed = self.tx.send_if_modified(|state| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            true
        });
        if changed {
            self.observer.on_mode_change(self.collection, mode);
        }
    }

    /// Ends the loading phase without touching the items. Returns whether
    /// `loading` was still set.
    fn stop_loading(&self) -> bool {
        self.tx.send_if_modified(|state| std::mem::replace(&mut state.loading, false))
    }

    /// Last write of a mount stopped by the client's shutdown. An unmounted
    /// handle gets nothing.
    fn close(&self) {
        if self.unmounted.load(AtomicOrdering::SeqCst) {
            return;
        }
        self.stop_loading();
        self.mode(SyncMode::Closed);
        tracing::debug!(collection = self.collection, "live collection closed by shutdown");
    }

    fn safety_timeout(&self, after: Duration) {
        if self.stop_loading() {
            self.observer.on_failure(
                self.collection,
                FailureKind::LoadingTimeout,
                &SyncError::Timeout(after),
            );
        }
    }
}

async fn drive<C: Collection>(
    collection: C,
    ctx: MountContext,
    tx: watch::Sender<LiveState<C::Item>>,
    unmounted: Arc<AtomicBool>,
) {
    let MountContext {
        realtime,
        poller,
        observer,
        timings,
        token,
    } = ctx;
    let name = collection.name();
    let publisher = Publisher {
        collection: name,
        tx,
        observer: &*observer,
        unmounted,
    };

    let safety = tokio::time::sleep(timings.safety_timeout);
    tokio::pin!(safety);
    let mut safety_armed = true;

    // --- Phase 1: Open the push subscription ---
    let query = collection.subscription();
    let open = async {
        match &realtime {
            Some(source) => source.subscribe(&query).await,
            None => Err(SyncError::Unavailable("no realtime endpoint configured".into())),
        }
    };
    tokio::pin!(open);

    let opened: Option<SnapshotStream> = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return publisher.close(),
            _ = &mut safety, if safety_armed => {
                safety_armed = false;
                publisher.safety_timeout(timings.safety_timeout);
            }
            result = &mut open => break match result {
                Ok(stream) => Some(stream),
                Err(e) => {
                    observer.on_failure(name, FailureKind::SubscriptionUnavailable, &e);
                    None
                }
            },
        }
    };

    // --- Phase 2: Stream snapshots until the subscription fails ---
    if let Some(mut snapshots) = opened {
        publisher.mode(SyncMode::Streaming);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return publisher.close(),
                _ = &mut safety, if safety_armed => {
                    safety_armed = false;
                    publisher.safety_timeout(timings.safety_timeout);
                }
                next = snapshots.next() => match next {
                    Some(Ok(docs)) => {
                        publisher.items(refine(&collection, docs, Utc::now(), &*observer))
                    }
                    Some(Err(e)) => {
                        observer.on_failure(name, FailureKind::SubscriptionUnavailable, &e);
                        break;
                    }
                    None => {
                        let e = SyncError::Subscription("stream closed by server".into());
                        observer.on_failure(name, FailureKind::SubscriptionUnavailable, &e);
                        break;
                    }
                },
            }
        }
    }

    // --- Phase 3: Failover polling for the rest of the mount ---
    publisher.mode(SyncMode::FailoverPolling);
    let request = collection.poll_request();
    let mut ticker = tokio::time::interval(timings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: Option<PollFuture> = None;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return publisher.close(),
            _ = &mut safety, if safety_armed => {
                safety_armed = false;
                publisher.safety_timeout(timings.safety_timeout);
            }
            outcome = poll_in_flight(&mut in_flight) => {
                in_flight = None;
                match outcome {
                    Ok(Ok(docs)) => {
                        publisher.items(refine(&collection, docs, Utc::now(), &*observer))
                    }
                    Ok(Err(e)) => {
                        observer.on_failure(name, FailureKind::TransientFetch, &e);
                        publisher.stop_loading();
                    }
                    Err(_) => {
                        let e = SyncError::Timeout(timings.request_timeout);
                        observer.on_failure(name, FailureKind::Timeout, &e);
                        publisher.stop_loading();
                    }
                }
            }
            _ = ticker.tick(), if in_flight.is_none() => {
                let poller = Arc::clone(&poller);
                let request = request.clone();
                let time_box = timings.request_timeout;
                in_flight = Some(Box::pin(async move {
                    tokio::time::timeout(time_box, poller.fetch(&request)).await
                }));
            }
        }
    }
}
