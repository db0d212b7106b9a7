//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → dispatcher.rs (strip base path, pick agent, rewrite path)
//!     → method_map.rs (rename JSON-RPC method, inject metadata)
//!     → handler.rs (AgentHandler: in-process app or upstream agent)
//!     → response returned unmodified
//!
//! Multiplexer-detected failures
//!     → error.rs (JSON-RPC 2.0 error envelope)
//! ```

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod method_map;
pub mod request;
pub mod server;

pub use dispatcher::Multiplexer;
pub use error::{JsonRpcError, JsonRpcErrorResponse, MuxError};
pub use handler::{handler_fn, AgentHandler, HandlerFn};
pub use method_map::MethodMapping;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
