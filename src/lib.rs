//! Path-based JSON-RPC agent multiplexer.
//!
//! Serves many protocol agents from one HTTP endpoint. Each agent is reachable
//! under `<base_path>/<segment>/`; the multiplexer strips that prefix so every
//! agent sees requests as if mounted at `/`, and renames JSON-RPC methods on the
//! way in according to the agent's method map.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::MuxConfig;
pub use http::{handler_fn, AgentHandler, HttpServer, Multiplexer};
pub use lifecycle::Shutdown;
pub use routing::{AgentRoute, MethodMap, RouteError};
