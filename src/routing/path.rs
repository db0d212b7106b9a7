//! Path normalization and resolution.
//!
//! # Responsibilities
//! - Normalize the configured base path and route segments
//! - Strip the base path from an inbound request path
//! - Split off the routing segment and compute the path the agent sees
//! - Percent-decode inbound paths and re-encode the path handed to the agent
//!
//! # Design Decisions
//! - Pure functions over `&str`, no allocation for the segment itself
//! - Routing runs on the decoded path, so `my%20agent` reaches `my agent`
//! - Base-path stripping is a plain prefix match, as configured
//! - Agents are always addressed as if mounted at `/`

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Path every agent serves its discovery document on.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// Bytes escaped when a decoded path goes back on the wire.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode a request path. Invalid UTF-8 is replaced, not rejected.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Percent-encode a decoded path so it is valid in a URI again.
pub fn encode_path(decoded: &str) -> Cow<'_, str> {
    utf8_percent_encode(decoded, PATH_ESCAPE).into()
}

/// Normalize a base path: leading `/` when non-empty, never a trailing `/`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Trim leading and trailing `/` from a route segment.
pub fn normalize_segment(raw: &str) -> &str {
    raw.trim_matches('/')
}

/// Outcome of resolving a request path against the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Path relative to the base path, without its leading `/`.
    pub relative: &'a str,
    /// First path component, used as the route key.
    pub segment: &'a str,
    /// Path forwarded to the agent.
    pub target_path: String,
}

/// Strip the base path and the leading `/` from a request path.
pub fn strip_base<'a>(base_path: &str, path: &'a str) -> &'a str {
    let path = if base_path.is_empty() {
        path
    } else {
        path.strip_prefix(base_path).unwrap_or(path)
    };
    path.strip_prefix('/').unwrap_or(path)
}

/// Resolve a request path.
///
/// Returns `None` when nothing follows the base path.
pub fn resolve<'a>(base_path: &str, path: &'a str) -> Option<Resolution<'a>> {
    let relative = strip_base(base_path, path);
    let (segment, rest) = match relative.split_once('/') {
        Some((segment, rest)) => (segment, Some(rest)),
        None => (relative, None),
    };
    if segment.is_empty() {
        return None;
    }

    let target_path = match rest {
        None => "/".to_string(),
        Some(rest) => format!("/{rest}"),
    };

    Some(Resolution {
        relative,
        segment,
        target_path,
    })
}
