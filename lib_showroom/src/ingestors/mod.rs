//! # Data Ingestors Module
//!
//! The two ways a mount gets documents from the backend, behind one trait each
//! so the subscriber loop does not care about transports:
//!
//! - **`realtime_ws`**: the push subscription. Opens a WebSocket, sends a
//!   subscribe frame and yields every snapshot the server pushes.
//! - **`rest_polling`**: the fallback. One `GET` per call against the public
//!   read endpoint.
//!
//! Both hand back raw JSON documents; decoding and filtering happen in the
//! subscriber so that one bad document never poisons a whole snapshot.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::content::collections::{PollRequest, SubscriptionQuery};
use crate::error::SyncError;

/// The WebSocket push subscription source.
#[cfg(feature = "realtime")]
pub mod realtime_ws;
/// The HTTP polling source.
pub mod rest_polling;

#[cfg(feature = "realtime")]
pub use realtime_ws::WsSnapshotSource;
pub use rest_polling::RestPoller;

/// Stream of snapshots from a push subscription.
///
/// `Ok(docs)` is a full snapshot of the query result; `Err` is an error
/// callback. The stream ending means the server closed the subscription.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Value>, SyncError>>;

/// Something that can open a push subscription.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Opens a subscription for `query`.
    async fn subscribe(&self, query: &SubscriptionQuery) -> Result<SnapshotStream, SyncError>;
}

/// Something that can answer a polling request.
#[async_trait]
pub trait PollSource: Send + Sync {
    /// Performs one read and returns the documents of the response envelope.
    async fn fetch(&self, request: &PollRequest) -> Result<Vec<Value>, SyncError>;
}
