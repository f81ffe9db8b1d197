//! # Content Module
//!
//! Data model and pure logic for the live collections: wire types, the
//! active-window filter, and the per-collection query descriptions.

/// The four collection descriptions and the query types they produce.
pub mod collections;
/// Active-window evaluation.
pub mod expiry;
/// Wire types for sponsored content, banners, promotions and reviews.
pub mod model;
/// Serde helpers for store timestamps.
pub mod timestamp;

// --- Public API Re-exports ---
pub use collections::{
    Banners, Collection, PollRequest, Promotions, Reviews, SponsoredContent, SubscriptionQuery,
};
pub use expiry::is_within_window;
pub use model::{
    ActiveWindow, Banner, ContentItem, ContentStatus, LinkType, Placement, Promotion, Review,
    ReviewStatus,
};
