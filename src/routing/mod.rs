//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → path.rs (percent-decode, strip base path, split first segment, compute agent path)
//!     → table.rs (segment lookup)
//!     → Return: RouteEntry or NoMatch
//!
//! Registration (startup, admin API, config reload):
//!     AgentRoute
//!     → normalize segment, validate handler, seed default method map
//!     → RouteTable (last writer wins)
//! ```
//!
//! # Design Decisions
//! - One segment, one agent: no prefix trees, no regex
//! - Routes can change at runtime; the table is safe for concurrent access
//! - Explicit NoMatch rather than silent default

pub mod path;
pub mod table;

pub use path::{
    decode_path, encode_path, normalize_base_path, normalize_segment, resolve, Resolution,
    AGENT_CARD_PATH,
};
pub use table::{default_method_map, AgentRoute, MethodMap, RouteEntry, RouteError, RouteTable};
