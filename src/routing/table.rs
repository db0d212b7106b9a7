//! Route storage and lookup.
//!
//! # Responsibilities
//! - Store one entry per normalized segment
//! - Look up the entry for a request's first path segment
//! - Validate registration requests
//!
//! # Design Decisions
//! - DashMap gives shard-level locking; lookups clone the `Arc` out and drop
//!   the guard before any handler runs
//! - Re-registering a segment replaces the previous entry
//! - Removing an unknown segment is a no-op

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::http::AgentHandler;
use crate::routing::path::normalize_segment;

/// Inbound JSON-RPC method name → method name the agent understands.
pub type MethodMap = HashMap<String, String>;

/// The mapping installed when a route does not bring its own.
pub fn default_method_map() -> MethodMap {
    HashMap::from([("message/send".to_string(), "tasks/send".to_string())])
}

/// Registration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route path must not be empty")]
    EmptySegment,

    #[error("route '{0}' has no handler")]
    MissingHandler(String),
}

/// A registration request, built up before being handed to the multiplexer.
pub struct AgentRoute {
    path: String,
    handler: Option<Arc<dyn AgentHandler>>,
    method_map: Option<MethodMap>,
}

impl AgentRoute {
    /// Start a route for `path` (e.g., "uppercaser").
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handler: None,
            method_map: None,
        }
    }

    /// Handler the route dispatches to.
    pub fn handler<H: AgentHandler>(self, handler: H) -> Self {
        self.shared_handler(Arc::new(handler))
    }

    /// Handler shared with other owners.
    pub fn shared_handler(mut self, handler: Arc<dyn AgentHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Replace the default method map.
    pub fn method_map(mut self, method_map: MethodMap) -> Self {
        self.method_map = Some(method_map);
        self
    }

    /// Normalize and validate into a table entry.
    pub fn into_entry(self) -> Result<RouteEntry, RouteError> {
        let segment = normalize_segment(&self.path);
        if segment.is_empty() {
            return Err(RouteError::EmptySegment);
        }
        let handler = self
            .handler
            .ok_or_else(|| RouteError::MissingHandler(segment.to_string()))?;

        Ok(RouteEntry {
            segment: segment.to_string(),
            handler,
            method_map: Arc::new(self.method_map.unwrap_or_else(default_method_map)),
        })
    }
}

impl std::fmt::Debug for AgentRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRoute")
            .field("path", &self.path)
            .field("has_handler", &self.handler.is_some())
            .field("method_map", &self.method_map)
            .finish()
    }
}

/// A registered agent.
pub struct RouteEntry {
    segment: String,
    handler: Arc<dyn AgentHandler>,
    method_map: Arc<MethodMap>,
}

impl RouteEntry {
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn handler(&self) -> &Arc<dyn AgentHandler> {
        &self.handler
    }

    pub fn method_map(&self) -> &Arc<MethodMap> {
        &self.method_map
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("segment", &self.segment)
            .field("method_map", &self.method_map)
            .finish_non_exhaustive()
    }
}

/// Concurrent segment → entry map.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: DashMap<String, Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(&self, entry: RouteEntry) -> Option<Arc<RouteEntry>> {
        self.routes.insert(entry.segment.clone(), Arc::new(entry))
    }

    /// Remove the entry for `segment` (normalized first).
    pub fn remove(&self, segment: &str) -> Option<Arc<RouteEntry>> {
        self.routes
            .remove(normalize_segment(segment))
            .map(|(_, entry)| entry)
    }

    /// Look up the entry for an already-normalized segment.
    pub fn get(&self, segment: &str) -> Option<Arc<RouteEntry>> {
        self.routes.get(segment).map(|entry| entry.value().clone())
    }

    /// Registered segments, in no particular order.
    pub fn segments(&self) -> Vec<String> {
        self.routes.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
