//! # Logging
//!
//! Structured logging through `tracing`, with console and rolling-file output.

/// Global subscriber installation.
pub mod tracing_setup;

pub use tracing_setup::init_tracing;
