//! # Error Types
//!
//! One error enum for the whole library. Nothing in here is ever shown to an
//! end user: the live subscriber and the engagement reporter catch every
//! `SyncError`, classify it with a [`FailureKind`](crate::core::observer::FailureKind)
//! and hand it to the observer.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while talking to the backend or preparing its data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The HTTP request failed at the transport level (after retries).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The response body could not be read or decoded.
    #[error("HTTP body error: {0}")]
    Body(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// The numeric HTTP status code.
        status: u16,
        /// The raw error body, possibly empty.
        body: String,
    },

    /// A URL could not be built from the configured base and a path.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The WebSocket transport failed.
    #[cfg(feature = "realtime")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An operation did not finish within its time box.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The push subscription cannot be used for this mount.
    #[error("realtime subscription unavailable: {0}")]
    Unavailable(String),

    /// The push subscription delivered an error callback.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// A snapshot or response did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O failed (config files, log directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
