//! WebSocket Connection Monitor
//!
//! Opens a single WebSocket connection, logs every lifecycle event and keeps
//! all received messages in memory for inspection from an interactive console.

mod config;
mod console;
mod monitor;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::MonitorConfig;
use console::ConsoleExit;
use monitor::{ConnectionMonitor, MonitorContext};

/// How long to wait for the peer to acknowledge a close on shutdown
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// WebSocket Connection Monitor
///
/// Connects to a WebSocket endpoint and records every message it receives
#[derive(Parser, Debug)]
#[command(name = "ws-monitor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Endpoint to connect to (overrides the config file)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log message lengths only, not payloads
    #[arg(long)]
    quiet_payloads: bool,

    /// Do not read commands from stdin; exit when the connection closes
    #[arg(long)]
    no_console: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("WebSocket Monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MonitorConfig::load_or_default(args.config.as_deref())?.with_endpoint(args.url);
    if args.quiet_payloads {
        config = config.with_log_payloads(false);
    }
    config.validate()?;

    let context = ConnectionMonitor::initialize(&config);
    info!(
        connection = %context.connection_id(),
        endpoint = context.endpoint(),
        "Monitoring connection"
    );

    let mut stop_requested = false;
    if !args.no_console {
        tokio::select! {
            exit = console::run_stdin(context.clone()) => match exit {
                ConsoleExit::Quit => stop_requested = true,
                ConsoleExit::InputClosed => {
                    info!("Console input closed, waiting for the connection to close");
                }
            },
            _ = shutdown_signal() => {
                info!("Initiating graceful shutdown...");
                stop_requested = true;
            }
        }
    }

    if stop_requested {
        close_gracefully(&context).await;
    } else {
        tokio::select! {
            _ = context.wait_closed() => {}
            _ = shutdown_signal() => {
                info!("Initiating graceful shutdown...");
                close_gracefully(&context).await;
            }
        }
    }

    let counts = context.counts().await;
    let messages = context.messages().await;
    info!(
        connection = %context.connection_id(),
        state = %context.state(),
        messages = messages.len(),
        opened = counts.opened,
        closed = counts.closed,
        failed = counts.failed,
        discarded = counts.discarded,
        "Monitor stopped"
    );
    Ok(())
}

/// Ask the peer to close and wait a bounded time for the acknowledgement
async fn close_gracefully(context: &MonitorContext) {
    if let Err(e) = context.close() {
        warn!("Failed to request close: {}", e);
        return;
    }
    if tokio::time::timeout(CLOSE_GRACE_PERIOD, context.wait_closed())
        .await
        .is_err()
    {
        warn!(
            "No close acknowledgement from {} after {:?}",
            context.endpoint(),
            CLOSE_GRACE_PERIOD
        );
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
