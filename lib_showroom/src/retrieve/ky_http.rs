//! # HTTP Retrieval Utilities
//!
//! This module provides a robust, asynchronous API client wrapper around `reqwest`.
//! It includes middleware support for exponential backoff retries and standardized
//! JSON response handling for the marketplace's public API.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::SyncError;

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as the status code.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// Converts a non-2xx response into [`SyncError::Status`] and a 2xx
    /// response into its body.
    pub fn into_data(self) -> Result<T, SyncError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(SyncError::Status {
                status: self.status,
                body: self.error_body.unwrap_or_default(),
            }),
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// authentication tokens, and automatic retries.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined. Always ends in `/`.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance with a retry policy.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL of the marketplace (e.g., "https://cars.example.com/").
    /// * `auth_token` - An optional string for the Authorization header.
    /// * `max_retries` - Transient failures (connect errors, 5xx, 429) are retried this many times.
    /// * `timeout` - Per-attempt request timeout.
    ///
    /// # Errors
    /// Returns [`SyncError::Url`] if `base_url` is not an absolute URL and
    /// [`SyncError::Body`] if the underlying client cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        // A trailing slash keeps the base path when joining relative paths.
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("showroom/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let inner = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner,
            base_url: url,
            auth_token,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base URL and appends `query`.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, SyncError> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Builds `<base>/<path>/<segment>/<segment>...`, percent-encoding each segment.
    pub fn endpoint_with_segments(&self, path: &str, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.endpoint(path, &[])?;
        url.path_segments_mut()
            .map_err(|_| {
                SyncError::Config(format!("base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Performs a request and decodes a JSON body.
    ///
    /// This method manages authentication and response classification. A
    /// non-2xx response is not an error here; callers use
    /// [`ApiResponse::into_data`] when they only care about success.
    ///
    /// # Errors
    /// Returns a [`SyncError`] if network execution or body decoding fails.
    pub async fn request<T>(&self, method: Method, url: Url) -> Result<ApiResponse<T>, SyncError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, url).await?;
        let status = response.status();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
            })
        } else {
            // Capture the error body as a string for debugging
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
            })
        }
    }

    /// `GET path?query` decoded as `T`.
    pub async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, SyncError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, query)?;
        self.request(Method::GET, url).await
    }

    /// Sends a body-less POST and returns the status code; the response body is discarded.
    pub async fn post_empty(&self, url: Url) -> Result<u16, SyncError> {
        let response = self.send(Method::POST, url).await?;
        Ok(response.status().as_u16())
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, SyncError> {
        let mut req = self.inner.request(method, url);

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        Ok(req.send().await?)
    }
}
