//! # Live Collections
//!
//! The storefront pages watch four collections that all follow the same
//! subscribe/filter/fallback shape. Each one is described here by a small
//! query type implementing [`Collection`]; the generic subscriber in
//! [`crate::core::live_collection`] does the rest.
//!
//! A `Collection` answers four questions:
//! - **What to ask the server for**: the push subscription query and the
//!   equivalent polling request.
//! - **What to keep**: the client-side acceptance predicate. It re-applies the
//!   server filter (status, placement, tenant) and the active window, so a
//!   stale or misbehaving backend can not leak items into the wrong slot.
//! - **How to order**: newest first unless the collection says otherwise.
//! - **How many**: the cap applied after filtering.

use std::cmp::Ordering;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::model::{Banner, ContentItem, ContentStatus, Placement, Promotion, Review, ReviewStatus};

/// A single server-side filter clause of a push subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFilter {
    /// Document field, camelCase.
    pub field: &'static str,
    /// Comparison operator understood by the store (`==`, `in`).
    pub op: &'static str,
    /// Right-hand side.
    pub value: Value,
}

impl FieldFilter {
    /// `field == value`
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self { field, op: "==", value: value.into() }
    }

    /// `field in values`
    pub fn one_of(field: &'static str, values: &[&str]) -> Self {
        Self { field, op: "in", value: json!(values) }
    }
}

/// The push subscription request sent to the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuery {
    /// Store collection name.
    pub collection: &'static str,
    /// Server-side filters, all of which must hold.
    #[serde(rename = "where")]
    pub filters: Vec<FieldFilter>,
    /// Field the server orders by, descending.
    pub order_by: &'static str,
    /// Maximum documents per snapshot.
    pub limit: usize,
}

/// The equivalent HTTP read used while polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    /// Path relative to the API base URL.
    pub path: &'static str,
    /// Query string pairs.
    pub query: Vec<(&'static str, String)>,
    /// Key of the array in the response envelope.
    pub envelope: &'static str,
}

/// A live collection the generic subscriber can mount.
pub trait Collection: Send + Sync + 'static {
    /// The decoded document type.
    type Item: DeserializeOwned + Serialize + Clone + Debug + Send + Sync + 'static;

    /// Store collection name; also used as the logging/observer label.
    fn name(&self) -> &'static str;

    /// Maximum number of published items.
    fn limit(&self) -> usize;

    /// Push subscription request.
    fn subscription(&self) -> SubscriptionQuery;

    /// Polling request.
    fn poll_request(&self) -> PollRequest;

    /// Stable document id.
    fn item_id<'a>(&self, item: &'a Self::Item) -> &'a str;

    /// Creation time used for the freshness sort, if the document has one.
    fn created_at(&self, item: &Self::Item) -> Option<DateTime<Utc>>;

    /// Client-side eligibility at `now`.
    fn accept(&self, item: &Self::Item, now: DateTime<Utc>) -> bool;

    /// Display order. Newest first by default; undated items go last.
    fn compare(&self, a: &Self::Item, b: &Self::Item) -> Ordering {
        self.created_at(b).cmp(&self.created_at(a))
    }
}

fn accepted_statuses() -> Vec<&'static str> {
    ContentStatus::ACCEPTED.iter().map(|s| s.as_str()).collect()
}

/// Sponsored content for one placement (or all placements).
#[derive(Debug, Clone, PartialEq)]
pub struct SponsoredContent {
    /// Restrict to one slot; `None` watches every placement.
    pub placement: Option<Placement>,
    /// Maximum number of items.
    pub limit: usize,
}

impl SponsoredContent {
    /// Watches `placement` with the given cap.
    pub fn new(placement: Option<Placement>, limit: usize) -> Self {
        Self { placement, limit }
    }
}

impl Collection for SponsoredContent {
    type Item = ContentItem;

    fn name(&self) -> &'static str {
        "sponsored_content"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn subscription(&self) -> SubscriptionQuery {
        let mut filters = vec![FieldFilter::one_of("status", &accepted_statuses())];
        if let Some(placement) = self.placement {
            filters.push(FieldFilter::eq("placement", placement.as_str()));
        }
        SubscriptionQuery {
            collection: self.name(),
            filters,
            order_by: "createdAt",
            limit: self.limit,
        }
    }

    fn poll_request(&self) -> PollRequest {
        let mut query = Vec::with_capacity(3);
        if let Some(placement) = self.placement {
            query.push(("placement", placement.as_str().to_string()));
        }
        query.push(("limit", self.limit.to_string()));
        query.push(("includeApproved", "true".to_string()));
        PollRequest {
            path: "api/public/sponsored-content",
            query,
            envelope: "content",
        }
    }

    fn item_id<'a>(&self, item: &'a ContentItem) -> &'a str {
        &item.id
    }

    fn created_at(&self, item: &ContentItem) -> Option<DateTime<Utc>> {
        item.created_at
    }

    fn accept(&self, item: &ContentItem, now: DateTime<Utc>) -> bool {
        item.is_active(now) && self.placement.is_none_or(|p| item.placement == p)
    }
}

/// Banners for one placement, highest priority first.
#[derive(Debug, Clone, PartialEq)]
pub struct Banners {
    /// Restrict to one slot; `None` watches every placement.
    pub placement: Option<Placement>,
    /// Maximum number of banners.
    pub limit: usize,
}

impl Collection for Banners {
    type Item = Banner;

    fn name(&self) -> &'static str {
        "banners"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn subscription(&self) -> SubscriptionQuery {
        let mut filters = vec![FieldFilter::one_of("status", &accepted_statuses())];
        if let Some(placement) = self.placement {
            filters.push(FieldFilter::eq("placement", placement.as_str()));
        }
        SubscriptionQuery {
            collection: self.name(),
            filters,
            order_by: "createdAt",
            limit: self.limit,
        }
    }

    fn poll_request(&self) -> PollRequest {
        let mut query = vec![("limit", self.limit.to_string())];
        if let Some(placement) = self.placement {
            query.push(("placement", placement.as_str().to_string()));
        }
        PollRequest { path: "api/public/banners", query, envelope: "banners" }
    }

    fn item_id<'a>(&self, item: &'a Banner) -> &'a str {
        &item.id
    }

    fn created_at(&self, item: &Banner) -> Option<DateTime<Utc>> {
        item.created_at
    }

    fn accept(&self, item: &Banner, now: DateTime<Utc>) -> bool {
        item.status.is_accepted()
            && item.active_window.contains(now)
            && self.placement.is_none_or(|p| item.placement == p)
    }

    fn compare(&self, a: &Banner, b: &Banner) -> Ordering {
        b.priority.cmp(&a.priority).then_with(|| b.created_at.cmp(&a.created_at))
    }
}

/// Running promotions, optionally for a single storefront.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotions {
    /// Storefront to watch; `None` watches every storefront.
    pub tenant_id: Option<String>,
    /// Maximum number of promotions.
    pub limit: usize,
}

impl Collection for Promotions {
    type Item = Promotion;

    fn name(&self) -> &'static str {
        "promotions"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn subscription(&self) -> SubscriptionQuery {
        let mut filters = vec![FieldFilter::one_of("status", &accepted_statuses())];
        if let Some(tenant) = &self.tenant_id {
            filters.push(FieldFilter::eq("tenantId", tenant.as_str()));
        }
        SubscriptionQuery {
            collection: self.name(),
            filters,
            order_by: "createdAt",
            limit: self.limit,
        }
    }

    fn poll_request(&self) -> PollRequest {
        let mut query = vec![("limit", self.limit.to_string())];
        if let Some(tenant) = &self.tenant_id {
            query.push(("tenantId", tenant.clone()));
        }
        PollRequest { path: "api/public/promotions", query, envelope: "promotions" }
    }

    fn item_id<'a>(&self, item: &'a Promotion) -> &'a str {
        &item.id
    }

    fn created_at(&self, item: &Promotion) -> Option<DateTime<Utc>> {
        item.created_at
    }

    fn accept(&self, item: &Promotion, now: DateTime<Utc>) -> bool {
        item.status.is_accepted()
            && item.active_window.contains(now)
            && match &self.tenant_id {
                Some(tenant) => item.tenant_id.as_deref() == Some(tenant.as_str()),
                None => true,
            }
    }
}

/// Approved reviews of one storefront, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Reviews {
    /// Storefront whose reviews are shown.
    pub tenant_id: String,
    /// Maximum number of reviews.
    pub limit: usize,
}

impl Collection for Reviews {
    type Item = Review;

    fn name(&self) -> &'static str {
        "reviews"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn subscription(&self) -> SubscriptionQuery {
        let statuses: Vec<&str> = ReviewStatus::ACCEPTED.iter().map(|s| s.as_str()).collect();
        SubscriptionQuery {
            collection: self.name(),
            filters: vec![
                FieldFilter::eq("tenantId", self.tenant_id.as_str()),
                FieldFilter::one_of("status", &statuses),
            ],
            order_by: "createdAt",
            limit: self.limit,
        }
    }

    fn poll_request(&self) -> PollRequest {
        PollRequest {
            path: "api/public/reviews",
            query: vec![("tenantId", self.tenant_id.clone()), ("limit", self.limit.to_string())],
            envelope: "reviews",
        }
    }

    fn item_id<'a>(&self, item: &'a Review) -> &'a str {
        &item.id
    }

    fn created_at(&self, item: &Review) -> Option<DateTime<Utc>> {
        item.created_at
    }

    // Reviews have no active window.
    fn accept(&self, item: &Review, _now: DateTime<Utc>) -> bool {
        item.status.is_accepted()
            && item.tenant_id == self.tenant_id
            && (1..=5).contains(&item.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sponsored_query_matches_public_endpoint() {
        let c = SponsoredContent::new(Some(Placement::Hero), 5);

        let poll = c.poll_request();
        assert_eq!(poll.path, "api/public/sponsored-content");
        assert_eq!(poll.envelope, "content");
        assert_eq!(
            poll.query,
            vec![
                ("placement", "hero".to_string()),
                ("limit", "5".to_string()),
                ("includeApproved", "true".to_string()),
            ]
        );

        let sub = serde_json::to_value(c.subscription()).unwrap();
        assert_eq!(
            sub,
            json!({
                "collection": "sponsored_content",
                "where": [
                    { "field": "status", "op": "in", "value": ["active", "approved"] },
                    { "field": "placement", "op": "==", "value": "hero" }
                ],
                "orderBy": "createdAt",
                "limit": 5
            })
        );
    }

    #[test]
    fn unfiltered_sponsored_query_omits_placement() {
        let c = SponsoredContent::new(None, 3);
        assert!(c.poll_request().query.iter().all(|(k, _)| *k != "placement"));
        assert_eq!(c.subscription().filters.len(), 1);
    }

    #[test]
    fn banners_order_by_priority_then_freshness() {
        let c = Banners { placement: None, limit: 10 };
        let banner = |id: &str, priority: i32, secs: i64| -> Banner {
            serde_json::from_value(json!({
                "id": id, "placement": "hero", "status": "active",
                "priority": priority, "createdAt": { "seconds": secs }
            }))
            .unwrap()
        };
        let mut items = vec![banner("a", 1, 10), banner("b", 5, 1), banner("c", 1, 20)];
        items.sort_by(|a, b| c.compare(a, b));
        let ids: Vec<&str> = items.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn reviews_reject_other_tenants_and_bad_ratings() {
        let c = Reviews { tenant_id: "dealer-7".into(), limit: 10 };
        let review = |tenant: &str, rating: u8, status: &str| -> Review {
            serde_json::from_value(json!({
                "id": "r", "tenantId": tenant, "rating": rating,
                "status": status, "createdAt": 0
            }))
            .unwrap()
        };
        let now = Utc::now();
        assert!(c.accept(&review("dealer-7", 4, "published"), now));
        assert!(!c.accept(&review("dealer-8", 4, "published"), now));
        assert!(!c.accept(&review("dealer-7", 0, "approved"), now));
        assert!(!c.accept(&review("dealer-7", 5, "pending"), now));
    }

    fn promotion(id: &str, tenant: Option<&str>, end_at: Option<DateTime<Utc>>) -> Promotion {
        serde_json::from_value(json!({
            "id": id,
            "tenantId": tenant,
            "title": "Winter service -20%",
            "status": "active",
            "endAt": end_at.map(|t| t.to_rfc3339()),
            "createdAt": 0
        }))
        .unwrap()
    }

    #[test]
    fn promotions_filter_by_tenant_when_asked() {
        let now = Utc::now();
        let dealer = Promotions { tenant_id: Some("dealer-7".into()), limit: 5 };
        let everyone = Promotions { tenant_id: None, limit: 5 };

        let own = promotion("p1", Some("dealer-7"), None);
        let other = promotion("p2", Some("dealer-8"), None);
        let marketplace_wide = promotion("p3", None, None);

        assert!(dealer.accept(&own, now));
        assert!(!dealer.accept(&other, now));
        assert!(!dealer.accept(&marketplace_wide, now));

        assert!(everyone.accept(&own, now));
        assert!(everyone.accept(&other, now));
        assert!(everyone.accept(&marketplace_wide, now));
    }

    #[test]
    fn promotions_drop_ended_and_paused_items() {
        let now = Utc::now();
        let c = Promotions { tenant_id: Some("dealer-7".into()), limit: 5 };

        let ended = promotion("p1", Some("dealer-7"), Some(now - chrono::Duration::minutes(1)));
        let running = promotion("p2", Some("dealer-7"), Some(now + chrono::Duration::days(3)));
        let mut paused = promotion("p3", Some("dealer-7"), None);
        paused.status = ContentStatus::Paused;

        assert!(!c.accept(&ended, now));
        assert!(c.accept(&running, now));
        assert!(!c.accept(&paused, now));
    }

    #[test]
    fn promotions_query_carries_tenant() {
        let c = Promotions { tenant_id: Some("dealer-7".into()), limit: 4 };

        let poll = c.poll_request();
        assert_eq!(poll.path, "api/public/promotions");
        assert_eq!(poll.envelope, "promotions");
        assert_eq!(
            poll.query,
            vec![("limit", "4".to_string()), ("tenantId", "dealer-7".to_string())]
        );

        let sub = c.subscription();
        assert_eq!(sub.collection, "promotions");
        assert!(sub.filters.contains(&FieldFilter::eq("tenantId", "dealer-7")));

        let unscoped = Promotions { tenant_id: None, limit: 4 };
        assert!(unscoped.poll_request().query.iter().all(|(k, _)| *k != "tenantId"));
    }

    #[test]
    fn banners_accept_placement_status_and_window() {
        let now = Utc::now();
        let c = Banners { placement: Some(Placement::Sidebar), limit: 2 };
        let banner = |placement: &str, status: &str, start_in_days: i64| -> Banner {
            serde_json::from_value(json!({
                "id": "b", "placement": placement, "status": status,
                "startAt": (now + chrono::Duration::days(start_in_days)).timestamp_millis(),
                "createdAt": 0
            }))
            .unwrap()
        };

        assert!(c.accept(&banner("sidebar", "approved", -1), now));
        assert!(!c.accept(&banner("hero", "approved", -1), now));
        assert!(!c.accept(&banner("sidebar", "rejected", -1), now));
        assert!(!c.accept(&banner("sidebar", "active", 1), now));

        let poll = c.poll_request();
        assert_eq!(poll.path, "api/public/banners");
        assert_eq!(poll.envelope, "banners");
        assert_eq!(
            poll.query,
            vec![("limit", "2".to_string()), ("placement", "sidebar".to_string())]
        );
    }

    #[test]
    fn undated_items_sort_after_dated_ones() {
        let c = SponsoredContent::new(None, 10);
        let item = |id: &str, created: Option<i64>| -> ContentItem {
            let mut doc = json!({ "id": id, "placement": "hero", "status": "active" });
            if let Some(secs) = created {
                doc["createdAt"] = json!({ "seconds": secs });
            }
            serde_json::from_value(doc).unwrap()
        };

        let mut items = vec![item("undated", None), item("old", Some(10)), item("new", Some(20))];
        items.sort_by(|a, b| c.compare(a, b));

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "undated"]);
    }
}
