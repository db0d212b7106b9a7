//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide the pluggable `MuxLogger` capability used by the multiplexer
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (environment wins)
//! - The multiplexer never logs through a global; it is handed a `MuxLogger`

use axum::http::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogFormat;

/// A routing or rewriting decision worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxEvent<'a> {
    RouteAdded { route: &'a str },
    RouteRemoved { route: &'a str },
    RequestReceived {
        method: &'a Method,
        path: &'a str,
        mapped: &'a str,
    },
    RouteNotFound {
        segment: &'a str,
        available: &'a [String],
    },
    AgentCard {
        segment: &'a str,
        from: &'a str,
        to: &'a str,
    },
    Routing {
        segment: &'a str,
        from: &'a str,
        to: &'a str,
    },
    MethodMapped { from: &'a str, to: &'a str },
    MetadataInjected { method: &'a str },
    MetadataCreated { method: &'a str },
}

/// Logging capability injected into the multiplexer.
pub trait MuxLogger: Send + Sync + std::fmt::Debug {
    fn log(&self, event: &MuxEvent<'_>);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MuxLogger for TracingLogger {
    fn log(&self, event: &MuxEvent<'_>) {
        match *event {
            MuxEvent::RouteAdded { route } => {
                tracing::info!(route = %route, "Added agent route");
            }
            MuxEvent::RouteRemoved { route } => {
                tracing::info!(route = %route, "Removed agent route");
            }
            MuxEvent::RequestReceived { method, path, mapped } => {
                tracing::debug!(method = %method, path = %path, mapped = %mapped, "Multiplexer received request");
            }
            MuxEvent::RouteNotFound { segment, available } => {
                tracing::warn!(segment = %segment, available = ?available, "No route found for agent");
            }
            MuxEvent::AgentCard { segment, from, to } => {
                tracing::debug!(agent = %segment, from = %from, to = %to, "Serving agent card");
            }
            MuxEvent::Routing { segment, from, to } => {
                tracing::debug!(agent = %segment, from = %from, to = %to, "Routing request");
            }
            MuxEvent::MethodMapped { from, to } => {
                tracing::debug!(from = %from, to = %to, "Mapped JSON-RPC method");
            }
            MuxEvent::MetadataInjected { method } => {
                tracing::debug!(method = %method, "Injected method into message.metadata");
            }
            MuxEvent::MetadataCreated { method } => {
                tracing::debug!(method = %method, "Created message.metadata with method");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl MuxLogger for NoopLogger {
    fn log(&self, _event: &MuxEvent<'_>) {}
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("agent_mux={level},tower_http={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
