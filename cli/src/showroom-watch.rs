//! # showroom-watch
//!
//! Mounts one live collection against a marketplace backend and prints every
//! published state as a JSON line on stdout. Logs go to stderr (and to a
//! rolling file when a log directory is configured).
//!
//! Useful for checking a placement from a terminal:
//!
//! ```text
//! showroom-watch --api-url https://cars.example.com \
//!     --realtime-url wss://cars.example.com/realtime \
//!     sponsored --placement hero --limit 3
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;

use lib_showroom::{
    init_tracing, Banners, LiveCollection, Placement, Promotions, Reviews, ShowroomClient,
    SponsoredContent, SyncConfig,
};

/// CLI arguments for showroom-watch.
#[derive(Parser, Debug)]
#[clap(
    name = "showroom-watch",
    version,
    author = "ckir",
    about = "Watches a live storefront collection and prints its state as JSON lines."
)]
struct Cli {
    /// JSON config file. Missing files are ignored.
    #[clap(long, env = "SHOWROOM_CONFIG", default_value = "showroom.json")]
    config: PathBuf,

    /// Base URL of the marketplace API.
    #[clap(long, env = "SHOWROOM_API_URL")]
    api_url: Option<String>,

    /// WebSocket URL of the realtime gateway. Without it the collection is polled.
    #[clap(long, env = "SHOWROOM_REALTIME_URL")]
    realtime_url: Option<String>,

    /// Bearer token for the API.
    #[clap(long, env = "SHOWROOM_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Polling interval in milliseconds.
    #[clap(long, env = "SHOWROOM_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Default log level; `RUST_LOG` takes precedence.
    #[clap(long, env = "SHOWROOM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for daily-rolling JSON log files.
    #[clap(long, env = "SHOWROOM_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log to stderr as JSON.
    #[clap(long)]
    log_json: bool,

    #[clap(subcommand)]
    watch: Watch,
}

/// The collection to mount.
#[derive(Subcommand, Debug)]
enum Watch {
    /// Sponsored content for a placement.
    Sponsored {
        /// hero, sidebar, sponsors_section or between_content. All placements if omitted.
        #[clap(long)]
        placement: Option<Placement>,
        /// Maximum number of items.
        #[clap(long, default_value_t = 3)]
        limit: usize,
    },
    /// Banners for a placement, highest priority first.
    Banners {
        #[clap(long)]
        placement: Option<Placement>,
        #[clap(long, default_value_t = 5)]
        limit: usize,
    },
    /// Running promotions.
    Promotions {
        /// Storefront id. Every storefront if omitted.
        #[clap(long)]
        tenant: Option<String>,
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },
    /// Approved reviews of a storefront.
    Reviews {
        /// Storefront id.
        #[clap(long)]
        tenant: String,
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },
}

impl Cli {
    fn overrides(&self) -> SyncConfig {
        SyncConfig {
            api_url: self.api_url.clone(),
            realtime_url: self.realtime_url.clone(),
            auth_token: self.auth_token.clone(),
            poll_interval_ms: self.poll_interval_ms,
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            log_json: self.log_json.then_some(true),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings =
        SyncConfig::load(Some(&cli.config), cli.overrides()).context("invalid configuration")?;
    let _guard = init_tracing(&settings.log)?;

    let client = ShowroomClient::connect(&settings)?;

    let result = match cli.watch {
        Watch::Sponsored { placement, limit } => {
            print_states(client.mount(SponsoredContent::new(placement, limit))).await
        }
        Watch::Banners { placement, limit } => {
            print_states(client.mount(Banners { placement, limit })).await
        }
        Watch::Promotions { tenant, limit } => {
            print_states(client.mount(Promotions { tenant_id: tenant, limit })).await
        }
        Watch::Reviews { tenant, limit } => {
            print_states(client.mount(Reviews { tenant_id: tenant, limit })).await
        }
    };

    client.shutdown();
    result
}

/// Prints the current state, then every change, until a shutdown signal.
async fn print_states<T>(mut live: LiveCollection<T>) -> anyhow::Result<()>
where
    T: Clone + serde::Serialize + Send + Sync + 'static,
{
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    print_line(&live.state())?;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(collection = live.collection(), "shutdown signal received");
                break;
            }
            alive = live.changed() => {
                if !alive {
                    break;
                }
                print_line(&live.state())?;
            }
        }
    }

    live.unmount();
    Ok(())
}

fn print_line<S: serde::Serialize>(state: &S) -> anyhow::Result<()> {
    let line = serde_json::to_string(state)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
