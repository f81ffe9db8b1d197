//! # Realtime WebSocket Source
//!
//! Push subscription against the document store's realtime gateway.
//!
//! ## Protocol:
//! 1. Connect (time-boxed by `connect_timeout`).
//! 2. Send one subscribe frame: the [`SubscriptionQuery`] tagged with
//!    `"type": "subscribe"`.
//! 3. Receive frames until the socket closes:
//!    - `{"type":"snapshot","docs":[..]}`: full result set of the query.
//!    - `{"type":"error","message":".."}`: error callback.
//!    - `{"type":"ack"}`: subscription accepted, ignored.
//!
//! The returned stream ends when the server closes the socket. Reconnecting
//! is not this source's job: the subscriber treats the end of the stream as a
//! reason to fall back to polling.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};

use super::{SnapshotSource, SnapshotStream};
use crate::content::collections::SubscriptionQuery;
use crate::error::SyncError;

/// Frames pushed by the realtime gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full result set.
    Snapshot {
        /// Raw documents, decoded later by the subscriber.
        docs: Vec<Value>,
    },
    /// The subscription failed server-side.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// The subscribe frame was accepted.
    Ack,
}

#[derive(Serialize)]
struct SubscribeFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    query: &'a SubscriptionQuery,
}

/// Opens push subscriptions over a WebSocket.
#[derive(Debug, Clone)]
pub struct WsSnapshotSource {
    url: String,
    connect_timeout: Duration,
}

impl WsSnapshotSource {
    /// Creates a source for the gateway at `url` (`ws://` or `wss://`).
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl SnapshotSource for WsSnapshotSource {
    async fn subscribe(&self, query: &SubscriptionQuery) -> Result<SnapshotStream, SyncError> {
        tracing::debug!(
            url = %self.url,
            collection = query.collection,
            "opening realtime subscription"
        );

        let connect = connect_async(self.url.as_str());
        let (mut ws, _) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| SyncError::Timeout(self.connect_timeout))??;

        let frame = serde_json::to_string(&SubscribeFrame { kind: "subscribe", query })?;
        ws.send(WsMessage::Text(frame.into())).await?;

        let stream = ws
            .filter_map(|msg| async move {
                match msg {
                    Ok(WsMessage::Text(text)) => decode_frame(text.as_bytes()),
                    Ok(WsMessage::Binary(bin)) => decode_frame(&bin),
                    // Control frames; a Close is followed by the end of the stream.
                    Ok(_) => None,
                    Err(e) => Some(Err(SyncError::from(e))),
                }
            })
            .boxed();

        Ok(stream)
    }
}

/// Maps one gateway frame to a stream item; `None` for frames that carry no data.
pub fn decode_frame(raw: &[u8]) -> Option<Result<Vec<Value>, SyncError>> {
    match serde_json::from_slice::<ServerFrame>(raw) {
        Ok(ServerFrame::Snapshot { docs }) => Some(Ok(docs)),
        Ok(ServerFrame::Error { message }) => Some(Err(SyncError::Subscription(message))),
        Ok(ServerFrame::Ack) => None,
        Err(e) => Some(Err(SyncError::Payload(format!("malformed realtime frame: {e}")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_frame_yields_docs() {
        let raw = br#"{"type":"snapshot","docs":[{"id":"a"},{"id":"b"}]}"#;
        let docs = decode_frame(raw).unwrap().unwrap();
        assert_eq!(docs, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[test]
    fn error_frame_is_a_subscription_error() {
        let raw = br#"{"type":"error","message":"permission denied"}"#;
        match decode_frame(raw) {
            Some(Err(SyncError::Subscription(msg))) => assert_eq!(msg, "permission denied"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ack_is_skipped_and_garbage_is_an_error() {
        assert!(decode_frame(br#"{"type":"ack"}"#).is_none());
        assert!(matches!(decode_frame(b"not json"), Some(Err(SyncError::Payload(_)))));
    }

    #[test]
    fn subscribe_frame_carries_the_query() {
        let query = SubscriptionQuery {
            collection: "sponsored_content",
            filters: vec![],
            order_by: "createdAt",
            limit: 4,
        };
        let frame = SubscribeFrame { kind: "subscribe", query: &query };
        let frame = serde_json::to_value(frame).unwrap();
        assert_eq!(
            frame,
            json!({
                "type": "subscribe",
                "collection": "sponsored_content",
                "where": [],
                "orderBy": "createdAt",
                "limit": 4
            })
        );
    }
}
