//! Agent multiplexer server.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                 AGENT MULTIPLEXER                 │
//!                     │                                                   │
//!   Client Request    │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ dispatcher │───▶│ method_map │──┼──▶ Agent
//!   /api/agents/x/... │  │ server  │    │  (routing) │    │ (JSON-RPC) │  │    (sees /...)
//!                     │  └─────────┘    └─────┬──────┘    └────────────┘  │
//!                     │                       │ GET /.well-known/         │
//!                     │                       │     agent.json            │
//!                     │                       └───────────────────────────┼──▶ Agent
//!                     │                                                   │
//!                     │  config + watcher · admin API · tracing · metrics │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use agent_mux::config::{load_config, ConfigWatcher, MuxConfig};
use agent_mux::lifecycle::Shutdown;
use agent_mux::observability::{init_logging, metrics};
use agent_mux::HttpServer;

#[derive(Parser)]
#[command(name = "agent-mux")]
#[command(about = "Path-based multiplexer for JSON-RPC agents", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload agent routes when the configuration file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };

    init_logging(&config.observability.log_level, config.observability.log_format);
    tracing::info!("agent-mux v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.base_path,
        agents = config.agents.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_requires_config() {
        assert!(Args::try_parse_from(["agent-mux", "--watch"]).is_err());

        let args = Args::try_parse_from(["agent-mux", "--watch", "--config", "mux.toml"]).unwrap();
        assert!(args.watch);
        assert_eq!(args.config, Some(PathBuf::from("mux.toml")));
    }
}
