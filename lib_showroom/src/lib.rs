//! # lib_showroom
//!
//! Live content synchronization for the marketplace storefronts.
//!
//! A [`ShowroomClient`] is created once from [`SyncSettings`] and passed to
//! whoever needs live data. Each consumer mounts a [`LiveCollection`]
//! (sponsored content, banners, promotions or reviews): it streams from the
//! realtime gateway while it can, degrades to polling when it cannot, and
//! always leaves the loading state within a bounded time. Sponsored-content
//! surfaces also get an [`ImpressionTracker`] that reports each item's
//! impression once per mount and every click.
//!
//! ## Modules
//!
//! - **`client`**: the explicit client handle.
//! - **`configs`**: layered configuration.
//! - **`content`**: wire types, the active-window filter and the four
//!   collection descriptions.
//! - **`core`**: the generic subscriber, the impression deduplicator and the
//!   observer hook.
//! - **`ingestors`**: the WebSocket push source and the HTTP poller.
//! - **`retrieve`**: the retrying HTTP client.
//! - **`loggers`** (feature `loggers`): tracing subscriber installation.

#![forbid(unsafe_code)]

pub mod client;
pub mod configs;
pub mod content;
pub mod core;
pub mod error;
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
pub mod retrieve;

// --- Public API Re-exports ---
pub use client::ShowroomClient;
pub use configs::{LogSettings, SyncConfig, SyncSettings};
pub use content::{
    is_within_window, Banner, Banners, Collection, ContentItem, ContentStatus, LinkType,
    Placement, Promotion, Promotions, Review, Reviews, SponsoredContent,
};
pub use crate::core::{
    EngagementKind, EngagementSink, FailureKind, ImpressionTracker, LiveCollection, LiveState,
    SyncMode, SyncObserver, SyncTimings, TracingObserver,
};
pub use error::SyncError;
#[cfg(feature = "loggers")]
pub use loggers::init_tracing;
