//! Operational mode of a mounted live collection.

use serde::Serialize;

/// Where a mount currently gets its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Opening the push subscription.
    Connecting,
    /// Push subscription is live.
    Streaming,
    /// Subscription unavailable or failed: polling the read endpoint.
    FailoverPolling,
    /// Unmounted or the client was shut down.
    Closed,
}

impl SyncMode {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Connecting => "connecting",
            SyncMode::Streaming => "streaming",
            SyncMode::FailoverPolling => "failover_polling",
            SyncMode::Closed => "closed",
        }
    }
}
