//! # Sync Observer
//!
//! Every error this crate swallows goes through exactly one place: a
//! [`SyncObserver`]. The storefront never sees these errors (the worst case
//! is an empty or stale list), so the observer is what keeps them visible to
//! operators.
//!
//! The default [`TracingObserver`] logs each failure with structured fields
//! and keeps per-kind counters that can be scraped or asserted on.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::mode::SyncMode;
use crate::error::SyncError;

/// Classification of a swallowed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The push subscription could not be opened or reported an error; the
    /// mount has degraded to polling.
    SubscriptionUnavailable,
    /// One poll failed; the previous list is kept.
    TransientFetch,
    /// A poll request exceeded its time box.
    Timeout,
    /// The safety timer forced `loading = false`.
    LoadingTimeout,
    /// An impression or click could not be recorded.
    Engagement,
    /// A document in a snapshot could not be decoded and was skipped.
    Decode,
}

impl FailureKind {
    /// Every kind, in counter order.
    pub const ALL: [FailureKind; 6] = [
        FailureKind::SubscriptionUnavailable,
        FailureKind::TransientFetch,
        FailureKind::Timeout,
        FailureKind::LoadingTimeout,
        FailureKind::Engagement,
        FailureKind::Decode,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SubscriptionUnavailable => "subscription_unavailable",
            FailureKind::TransientFetch => "transient_fetch",
            FailureKind::Timeout => "timeout",
            FailureKind::LoadingTimeout => "loading_timeout",
            FailureKind::Engagement => "engagement",
            FailureKind::Decode => "decode",
        }
    }
}

/// Receives the failures and mode transitions of every mount.
///
/// Implementations must be cheap and must not block: they are called from
/// inside the subscriber loop.
pub trait SyncObserver: Send + Sync {
    /// A failure was swallowed.
    fn on_failure(&self, collection: &str, kind: FailureKind, error: &SyncError);

    /// A mount changed mode.
    fn on_mode_change(&self, collection: &str, mode: SyncMode) {
        let _ = (collection, mode);
    }
}

/// Logs through `tracing` and counts failures per kind.
#[derive(Debug, Default)]
pub struct TracingObserver {
    counters: [AtomicU64; FailureKind::ALL.len()],
}

impl TracingObserver {
    /// Creates an observer with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of failures of `kind` seen so far.
    pub fn count(&self, kind: FailureKind) -> u64 {
        self.counters[kind.index()].load(Ordering::Relaxed)
    }

    /// `(kind, count)` for every kind.
    pub fn snapshot(&self) -> Vec<(FailureKind, u64)> {
        FailureKind::ALL.iter().map(|k| (*k, self.count(*k))).collect()
    }
}

impl SyncObserver for TracingObserver {
    fn on_failure(&self, collection: &str, kind: FailureKind, error: &SyncError) {
        self.counters[kind.index()].fetch_add(1, Ordering::Relaxed);
        match kind {
            // Expected while the backend is degraded; one line per occurrence is enough.
            FailureKind::Engagement | FailureKind::Decode => {
                tracing::debug!(collection, kind = kind.as_str(), %error, "swallowed failure")
            }
            _ => tracing::warn!(collection, kind = kind.as_str(), %error, "swallowed failure"),
        }
    }

    fn on_mode_change(&self, collection: &str, mode: SyncMode) {
        tracing::info!(collection, mode = mode.as_str(), "sync mode changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_kind() {
        let observer = TracingObserver::new();
        let err = SyncError::Subscription("boom".into());

        observer.on_failure("banners", FailureKind::TransientFetch, &err);
        observer.on_failure("banners", FailureKind::TransientFetch, &err);
        observer.on_failure("reviews", FailureKind::Engagement, &err);

        assert_eq!(observer.count(FailureKind::TransientFetch), 2);
        assert_eq!(observer.count(FailureKind::Engagement), 1);
        assert_eq!(observer.count(FailureKind::Timeout), 0);
        assert_eq!(observer.snapshot().len(), FailureKind::ALL.len());
    }
}
