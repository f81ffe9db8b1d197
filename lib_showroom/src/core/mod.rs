//! # Core Engine Module
//!
//! The synchronization engine behind every live surface of a storefront.
//!
//! ## Core Components:
//!
//! - **`live_collection`**: the generic subscriber. One mount keeps one
//!   filtered, sorted, capped list up to date, streaming when it can and
//!   polling when it must.
//!
//! - **`impressions`**: the per-mount impression deduplicator and click
//!   forwarder, with its HTTP engagement sink.
//!
//! - **`observer`**: the single observability hook every swallowed error
//!   flows through.
//!
//! - **`mode`**: the operational mode of a mount (`Connecting`, `Streaming`,
//!   `FailoverPolling`, `Closed`).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Per-mount impression deduplication and click reporting.
pub mod impressions;
/// The generic live-collection subscriber.
pub mod live_collection;
/// Operational mode of a mount.
pub mod mode;
/// Failure classification and the observer hook.
pub mod observer;

// --- Public API Re-exports ---
pub use impressions::{EngagementKind, EngagementSink, HttpEngagement, ImpressionTracker};
pub use live_collection::{LiveCollection, LiveState, MountContext, SyncTimings};
pub use mode::SyncMode;
pub use observer::{FailureKind, SyncObserver, TracingObserver};
