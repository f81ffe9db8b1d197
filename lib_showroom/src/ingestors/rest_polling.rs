//! # REST Polling Source
//!
//! The fallback read path for a mount whose push subscription is unavailable.
//! Unlike the streaming source, polling is driven from the outside: the
//! subscriber loop owns the interval and the per-request time box, and calls
//! [`RestPoller::fetch`] once per tick.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::PollSource;
use crate::content::collections::PollRequest;
use crate::error::SyncError;
use crate::retrieve::ky_http::ApiClient;

/// Polls the marketplace's public read endpoints.
pub struct RestPoller {
    /// Shared HTTP client. It is reused across all polls to leverage
    /// connection pooling.
    api: Arc<ApiClient>,
}

impl RestPoller {
    /// Creates a poller on top of a shared client.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PollSource for RestPoller {
    async fn fetch(&self, request: &PollRequest) -> Result<Vec<Value>, SyncError> {
        let body = self
            .api
            .get_json::<Value>(request.path, &request.query)
            .await?
            .into_data()?;
        unwrap_envelope(body, request.envelope)
    }
}

/// Extracts the document array from `{ "<envelope>": [...] }`.
///
/// A bare array is accepted too; some older endpoints return one.
pub fn unwrap_envelope(body: Value, envelope: &str) -> Result<Vec<Value>, SyncError> {
    match body {
        Value::Array(docs) => Ok(docs),
        Value::Object(mut map) => match map.remove(envelope) {
            Some(Value::Array(docs)) => Ok(docs),
            Some(Value::Null) | None => Err(SyncError::Payload(format!(
                "response has no '{envelope}' array"
            ))),
            Some(other) => Err(SyncError::Payload(format!(
                "'{envelope}' is not an array: {other}"
            ))),
        },
        other => Err(SyncError::Payload(format!("unexpected response body: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_is_unwrapped() {
        let body = json!({ "content": [{ "id": "a" }], "total": 1 });
        let docs = unwrap_envelope(body, "content").unwrap();
        assert_eq!(docs, vec![json!({ "id": "a" })]);
    }

    #[test]
    fn bare_array_is_accepted() {
        let docs = unwrap_envelope(json!([1, 2]), "content").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn missing_or_wrong_envelope_is_a_payload_error() {
        assert!(matches!(
            unwrap_envelope(json!({ "banners": [] }), "content"),
            Err(SyncError::Payload(_))
        ));
        assert!(matches!(
            unwrap_envelope(json!({ "content": "nope" }), "content"),
            Err(SyncError::Payload(_))
        ));
    }
}
