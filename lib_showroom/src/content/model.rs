//! # Content Models
//!
//! Wire types for the four live collections. All of them are owned by the
//! content-management backend; this crate only reads them, so every type is
//! lenient on input (unknown fields ignored, unknown statuses mapped to
//! `Other`) and camelCase on the wire.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expiry;
use super::timestamp;

/// A named slot on the page where sponsored content may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// The hero carousel at the top of a storefront.
    Hero,
    /// The sidebar banner pair.
    Sidebar,
    /// The sponsors grid.
    SponsorsSection,
    /// The slider placed between listing blocks.
    BetweenContent,
}

impl Placement {
    /// All placements, in page order.
    pub const ALL: [Placement; 4] = [
        Placement::Hero,
        Placement::Sidebar,
        Placement::SponsorsSection,
        Placement::BetweenContent,
    ];

    /// The wire name, as used in query strings and documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Hero => "hero",
            Placement::Sidebar => "sidebar",
            Placement::SponsorsSection => "sponsors_section",
            Placement::BetweenContent => "between_content",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`Placement`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement '{0}' (expected hero, sidebar, sponsors_section or between_content)")]
pub struct ParsePlacementError(pub String);

impl FromStr for Placement {
    type Err = ParsePlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Placement::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParsePlacementError(s.to_string()))
    }
}

/// Whether a link leaves the marketplace or stays inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Opens a third-party site.
    #[default]
    External,
    /// Navigates within the marketplace.
    Internal,
}

/// Moderation/lifecycle status of a content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Live and eligible for display.
    Active,
    /// Approved by moderation; treated the same as `Active`.
    Approved,
    /// Waiting for moderation.
    Pending,
    /// Paused by the advertiser.
    Paused,
    /// Marked expired by the backend.
    Expired,
    /// Rejected by moderation.
    Rejected,
    /// Any status this client does not know about.
    #[serde(other)]
    Other,
}

impl ContentStatus {
    /// The statuses the subscription asks the server for.
    pub const ACCEPTED: [ContentStatus; 2] = [ContentStatus::Active, ContentStatus::Approved];

    /// `true` for `active` and `approved`.
    pub fn is_accepted(&self) -> bool {
        Self::ACCEPTED.contains(self)
    }

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Active => "active",
            ContentStatus::Approved => "approved",
            ContentStatus::Pending => "pending",
            ContentStatus::Paused => "paused",
            ContentStatus::Expired => "expired",
            ContentStatus::Rejected => "rejected",
            ContentStatus::Other => "other",
        }
    }
}

/// The optional `[startAt, endAt]` interval an item is eligible in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWindow {
    /// First instant the item may be shown.
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub start_at: Option<DateTime<Utc>>,
    /// Last instant the item may be shown.
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub end_at: Option<DateTime<Utc>>,
}

impl ActiveWindow {
    /// See [`expiry::is_within_window`].
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        expiry::is_within_window(now, self.start_at, self.end_at)
    }
}

/// Engagement counters maintained by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    /// Recorded impressions.
    #[serde(default)]
    pub impressions: u64,
    /// Recorded clicks.
    #[serde(default)]
    pub clicks: u64,
}

/// A sponsored content document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Unique, stable document id.
    pub id: String,
    /// Where the item is shown.
    pub placement: Placement,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: String,
    #[serde(default)]
    pub link_type: LinkType,
    /// Lifecycle status.
    pub status: ContentStatus,
    /// Eligibility interval.
    #[serde(flatten)]
    pub active_window: ActiveWindow,
    /// Creation time; the freshness sort key. Items without one sort last.
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    /// Impression and click counts.
    #[serde(flatten)]
    pub counters: EngagementCounters,
}

impl ContentItem {
    /// Status is accepted and `now` is inside the active window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status.is_accepted() && self.active_window.contains(now)
    }
}

/// A banner document (hero carousel, sidebar pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: String,
    pub placement: Placement,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    pub status: ContentStatus,
    #[serde(flatten)]
    pub active_window: ActiveWindow,
    /// Higher values are shown first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A dealer promotion (discounts, seasonal offers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    /// Owning storefront; `None` for marketplace-wide promotions.
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_label: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ContentStatus,
    #[serde(flatten)]
    pub active_window: ActiveWindow,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Moderation status of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    Published,
    Pending,
    Rejected,
    #[serde(other)]
    Other,
}

impl ReviewStatus {
    /// The statuses shown on storefronts.
    pub const ACCEPTED: [ReviewStatus; 2] = [ReviewStatus::Approved, ReviewStatus::Published];

    /// `true` for `approved` and `published`.
    pub fn is_accepted(&self) -> bool {
        Self::ACCEPTED.contains(self)
    }

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => "approved",
            ReviewStatus::Published => "published",
            ReviewStatus::Pending => "pending",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Other => "other",
        }
    }
}

/// A customer review of a dealer or seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub author_name: String,
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    pub status: ReviewStatus,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_item_from_store_document() {
        let item: ContentItem = serde_json::from_value(json!({
            "id": "sc-1",
            "placement": "between_content",
            "title": "Winter tyres",
            "imageUrl": "https://cdn.example/tyres.jpg",
            "linkUrl": "/offers/tyres",
            "linkType": "internal",
            "status": "approved",
            "startAt": { "_seconds": 1_700_000_000, "_nanoseconds": 0 },
            "endAt": null,
            "createdAt": "2023-11-14T22:13:20Z",
            "impressions": 12,
            "clicks": 3,
            "advertiserNotes": "ignored"
        }))
        .unwrap();

        assert_eq!(item.placement, Placement::BetweenContent);
        assert_eq!(item.link_type, LinkType::Internal);
        assert_eq!(item.status, ContentStatus::Approved);
        assert!(item.active_window.start_at.is_some());
        assert!(item.active_window.end_at.is_none());
        assert_eq!(item.counters, EngagementCounters { impressions: 12, clicks: 3 });
        assert_eq!(item.description, "");
    }

    #[test]
    fn unknown_status_is_other_and_not_accepted() {
        let item: ContentItem = serde_json::from_value(json!({
            "id": "sc-2",
            "placement": "hero",
            "status": "archived",
            "createdAt": 0
        }))
        .unwrap();

        assert_eq!(item.status, ContentStatus::Other);
        assert!(!item.is_active(Utc::now()));
    }

    #[test]
    fn missing_creation_time_is_none() {
        let item: ContentItem = serde_json::from_value(json!({
            "id": "sc-4",
            "placement": "sidebar",
            "status": "active"
        }))
        .unwrap();

        assert!(item.created_at.is_none());
        assert!(item.is_active(Utc::now()));
    }

    #[test]
    fn unknown_placement_fails_the_item() {
        let res = serde_json::from_value::<ContentItem>(json!({
            "id": "sc-3",
            "placement": "footer",
            "status": "active",
            "createdAt": 0
        }));
        assert!(res.is_err());
    }

    #[test]
    fn placement_parsing_is_forgiving() {
        assert_eq!("Hero".parse::<Placement>(), Ok(Placement::Hero));
        assert_eq!("sponsors-section".parse::<Placement>(), Ok(Placement::SponsorsSection));
        assert!("footer".parse::<Placement>().is_err());
    }
}
