//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Multiplexer decisions (register, remove, dispatch, rewrite):
//!     → MuxEvent
//!     → MuxLogger (TracingLogger in production, NoopLogger in tests)
//!
//! Host adapter:
//!     → metrics.rs (counters, histograms)
//!     → TraceLayer spans carrying x-request-id
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The logger is a capability passed in, never a global
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, MuxEvent, MuxLogger, NoopLogger, TracingLogger};
