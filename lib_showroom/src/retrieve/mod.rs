//! # Data Retrieval Module
//!
//! This module provides a centralized location for the HTTP client used by
//! both the polling fallback and the engagement reporter.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, featuring automatic retries with exponential
//!   backoff, base-URL joining and optional bearer authentication.

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse};
