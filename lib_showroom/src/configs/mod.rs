//! # Configuration Modules
//!
//! Layered configuration for the sync client: defaults, an optional JSON
//! file, and CLI/environment overrides.

/// Sync client and logging configuration.
pub mod config_sync;

pub use config_sync::{LogSettings, SyncConfig, SyncSettings};
