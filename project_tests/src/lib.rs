//! # Project Tests Support
//!
//! Shared fixtures for the integration tests under `tests/`:
//!
//! - **`mock_backend`**: an in-process marketplace backend (public read
//!   endpoint, engagement endpoints and a realtime WebSocket gateway) bound to
//!   an ephemeral local port.
//! - **`fixtures`**: document builders and client settings tuned for fast tests.

#![forbid(unsafe_code)]

pub mod fixtures;
pub mod mock_backend;

pub use mock_backend::MockBackend;
