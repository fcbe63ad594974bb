//! Board widget: entry point.
//!
//! Runs one widget instance behind a WebSocket listener.  Host pages
//! connect to `/host` and exchange protocol envelopes; a renderer connects
//! to `/surface`, receives board state and reports user gestures.
//!
//! # Usage
//!
//! ```text
//! board-widget [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>               Listener IP address [default: 127.0.0.1]
//!   --port <PORT>               Listener port [default: 24850]
//!   --config <PATH>             TOML configuration file
//!   --init-fallback-ms <MS>     Self-init delay when no host init arrives
//! ```
//!
//! Values given on the command line (or through the matching
//! `BOARD_WIDGET_*` environment variables) override the configuration
//! file, which overrides the built-in defaults.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use board_widget::domain::WidgetConfig;
use board_widget::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Embedded board widget with a WebSocket host transport.
#[derive(Debug, Parser)]
#[command(
    name = "board-widget",
    about = "Board state reconciler served over WebSocket",
    version
)]
struct Cli {
    /// IP address to bind the listener to.
    #[arg(long, env = "BOARD_WIDGET_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "BOARD_WIDGET_PORT")]
    port: Option<u16>,

    /// Optional TOML configuration file.
    #[arg(long, env = "BOARD_WIDGET_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds to wait for a host `init` before self-initialising.
    #[arg(long, env = "BOARD_WIDGET_INIT_FALLBACK_MS")]
    init_fallback_ms: Option<u64>,
}

impl Cli {
    /// Builds the effective configuration: defaults, then the file, then
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    fn into_widget_config(self) -> anyhow::Result<WidgetConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => WidgetConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ms) = self.init_fallback_ms {
            config.timing.init_fallback_ms = ms;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_widget_config()?;

    info!(
        "board widget starting: bind={}:{}, init fallback {} ms",
        config.server.bind_address, config.server.port, config.timing.init_fallback_ms
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("board widget stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
