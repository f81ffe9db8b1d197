//! # Sync Configuration
//!
//! Settings for a [`ShowroomClient`](crate::client::ShowroomClient) and its
//! logging. Configuration is layered, later layers winning field by field:
//!
//! 1. built-in defaults ([`SyncConfig::defaults`]),
//! 2. a JSON file (camelCase keys, every field optional),
//! 3. overrides, typically built from CLI flags and environment variables.
//!
//! The merged [`SyncConfig`] is then validated into [`SyncSettings`], which is
//! what the rest of the crate consumes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::impressions::DEFAULT_VISIBILITY_THRESHOLD;
use crate::core::live_collection::SyncTimings;
use crate::error::SyncError;

/// File/override form of the configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Absolute base URL of the marketplace API.
    pub api_url: Option<String>,
    /// `ws://` or `wss://` URL of the realtime gateway. Unset means polling only.
    pub realtime_url: Option<String>,
    /// Bearer token sent with every HTTP request.
    pub auth_token: Option<String>,
    /// Delay between polls in failover mode.
    pub poll_interval_ms: Option<u64>,
    /// Time box of one poll request.
    pub request_timeout_ms: Option<u64>,
    /// Upper bound on the loading phase.
    pub safety_timeout_ms: Option<u64>,
    /// Time box of the realtime connection attempt.
    pub connect_timeout_ms: Option<u64>,
    /// Retries of transient HTTP failures.
    pub max_retries: Option<u32>,
    /// Visible fraction at which an impression counts.
    pub visibility_threshold: Option<f64>,
    /// Default log level (`trace` .. `error`); `RUST_LOG` still wins.
    pub log_level: Option<String>,
    /// Directory for daily-rolling log files. Unset means console only.
    pub log_dir: Option<PathBuf>,
    /// Emit JSON log lines instead of plain text.
    pub log_json: Option<bool>,
}

impl SyncConfig {
    /// Built-in defaults. `apiUrl` has none and must be provided.
    pub fn defaults() -> Self {
        let timings = SyncTimings::default();
        Self {
            api_url: None,
            realtime_url: None,
            auth_token: None,
            poll_interval_ms: Some(timings.poll_interval.as_millis() as u64),
            request_timeout_ms: Some(timings.request_timeout.as_millis() as u64),
            safety_timeout_ms: Some(timings.safety_timeout.as_millis() as u64),
            connect_timeout_ms: Some(2_000),
            max_retries: Some(1),
            visibility_threshold: Some(DEFAULT_VISIBILITY_THRESHOLD),
            log_level: Some("info".to_string()),
            log_dir: None,
            log_json: Some(false),
        }
    }

    /// Merges two configs, where `other` overrides `self` for `Some` values.
    pub fn merge(self, other: SyncConfig) -> SyncConfig {
        SyncConfig {
            api_url: other.api_url.or(self.api_url),
            realtime_url: other.realtime_url.or(self.realtime_url),
            auth_token: other.auth_token.or(self.auth_token),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            request_timeout_ms: other.request_timeout_ms.or(self.request_timeout_ms),
            safety_timeout_ms: other.safety_timeout_ms.or(self.safety_timeout_ms),
            connect_timeout_ms: other.connect_timeout_ms.or(self.connect_timeout_ms),
            max_retries: other.max_retries.or(self.max_retries),
            visibility_threshold: other.visibility_threshold.or(self.visibility_threshold),
            log_level: other.log_level.or(self.log_level),
            log_dir: other.log_dir.or(self.log_dir),
            log_json: other.log_json.or(self.log_json),
        }
    }

    /// Reads a JSON config file.
    pub fn from_file(path: &Path) -> Result<SyncConfig, SyncError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            SyncError::Config(format!("failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Layers defaults, the optional file and `overrides`, then validates.
    ///
    /// A missing file is not an error: defaults and overrides are used alone.
    pub fn load(path: Option<&Path>, overrides: SyncConfig) -> Result<SyncSettings, SyncError> {
        let mut config = SyncConfig::defaults();

        if let Some(path) = path {
            if path.exists() {
                config = config.merge(SyncConfig::from_file(path)?);
                tracing::debug!(path = %path.display(), "loaded config file");
            } else {
                tracing::info!(
                    path = %path.display(),
                    "config file not found; using defaults and overrides"
                );
            }
        }

        config.merge(overrides).resolve()
    }

    /// Validates and fills in defaults.
    pub fn resolve(self) -> Result<SyncSettings, SyncError> {
        let defaults = SyncConfig::defaults();
        let merged = defaults.merge(self);

        let api_url = merged
            .api_url
            .ok_or_else(|| SyncError::Config("apiUrl is required".into()))?;
        let parsed = Url::parse(&api_url).map_err(|e| {
            SyncError::Config(format!("apiUrl '{api_url}' is not an absolute URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::Config(format!("apiUrl '{api_url}' must be http or https")));
        }

        if let Some(realtime) = &merged.realtime_url {
            let parsed = Url::parse(realtime).map_err(|e| {
                SyncError::Config(format!("realtimeUrl '{realtime}' is invalid: {e}"))
            })?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(SyncError::Config(format!(
                    "realtimeUrl '{realtime}' must be ws or wss"
                )));
            }
        }

        let millis = |name: &str, value: Option<u64>| -> Result<Duration, SyncError> {
            match value {
                Some(0) | None => {
                    Err(SyncError::Config(format!("{name} must be greater than zero")))
                }
                Some(ms) => Ok(Duration::from_millis(ms)),
            }
        };

        let timings = SyncTimings {
            poll_interval: millis("pollIntervalMs", merged.poll_interval_ms)?,
            request_timeout: millis("requestTimeoutMs", merged.request_timeout_ms)?,
            safety_timeout: millis("safetyTimeoutMs", merged.safety_timeout_ms)?,
        };
        let connect_timeout = millis("connectTimeoutMs", merged.connect_timeout_ms)?;

        let visibility_threshold =
            merged.visibility_threshold.unwrap_or(DEFAULT_VISIBILITY_THRESHOLD);
        if !(visibility_threshold > 0.0 && visibility_threshold <= 1.0) {
            return Err(SyncError::Config(format!(
                "visibilityThreshold must be in (0, 1], got {visibility_threshold}"
            )));
        }

        Ok(SyncSettings {
            api_url,
            realtime_url: merged.realtime_url,
            auth_token: merged.auth_token,
            timings,
            connect_timeout,
            max_retries: merged.max_retries.unwrap_or(1),
            visibility_threshold,
            log: LogSettings {
                level: merged.log_level.unwrap_or_else(|| "info".to_string()),
                dir: merged.log_dir,
                json: merged.log_json.unwrap_or(false),
            },
        })
    }
}

/// Logging part of the validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Default filter directive.
    pub level: String,
    /// Rolling file directory, if any.
    pub dir: Option<PathBuf>,
    /// JSON output.
    pub json: bool,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Absolute API base URL.
    pub api_url: String,
    /// Realtime gateway, if configured.
    pub realtime_url: Option<String>,
    /// Bearer token.
    pub auth_token: Option<String>,
    /// Mount timers.
    pub timings: SyncTimings,
    /// Realtime connection time box.
    pub connect_timeout: Duration,
    /// HTTP retry count.
    pub max_retries: u32,
    /// Impression visibility threshold.
    pub visibility_threshold: f64,
    /// Logging.
    pub log: LogSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_api() -> SyncConfig {
        SyncConfig {
            api_url: Some("https://cars.example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_the_sync_contract() {
        let settings = with_api().resolve().unwrap();
        assert_eq!(settings.timings, SyncTimings::default());
        assert_eq!(settings.timings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.timings.request_timeout, Duration::from_secs(2));
        assert_eq!(settings.timings.safety_timeout, Duration::from_secs(2));
        assert_eq!(settings.visibility_threshold, 0.5);
        assert!(settings.realtime_url.is_none());
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn later_layers_win() {
        let file = SyncConfig {
            poll_interval_ms: Some(10_000),
            log_level: Some("debug".into()),
            ..with_api()
        };
        let cli = SyncConfig {
            poll_interval_ms: Some(1_000),
            ..Default::default()
        };

        let merged = SyncConfig::defaults().merge(file).merge(cli);

        assert_eq!(merged.poll_interval_ms, Some(1_000));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.api_url.as_deref(), Some("https://cars.example.com"));
    }

    #[test]
    fn load_reads_camel_case_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "apiUrl": "http://localhost:3000",
                "realtimeUrl": "ws://localhost:3001/realtime",
                "safetyTimeoutMs": 1500
            }}"#
        )
        .unwrap();

        let settings = SyncConfig::load(Some(file.path()), SyncConfig::default()).unwrap();

        assert_eq!(settings.api_url, "http://localhost:3000");
        assert_eq!(settings.realtime_url.as_deref(), Some("ws://localhost:3001/realtime"));
        assert_eq!(settings.timings.safety_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn missing_file_falls_back_to_overrides() {
        let settings =
            SyncConfig::load(Some(Path::new("/definitely/not/here.json")), with_api()).unwrap();
        assert_eq!(settings.api_url, "https://cars.example.com");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SyncConfig::default().resolve().is_err(), "apiUrl is required");
        let relative = SyncConfig { api_url: Some("/relative".into()), ..Default::default() };
        assert!(relative.resolve().is_err());
        let https_socket =
            SyncConfig { realtime_url: Some("https://not-a-socket".into()), ..with_api() };
        assert!(https_socket.resolve().is_err());
        assert!(SyncConfig { poll_interval_ms: Some(0), ..with_api() }.resolve().is_err());
        assert!(SyncConfig { visibility_threshold: Some(0.0), ..with_api() }.resolve().is_err());
        assert!(SyncConfig { visibility_threshold: Some(1.5), ..with_api() }.resolve().is_err());
    }
}
