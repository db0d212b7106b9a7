//! Path-based agent multiplexer.
//!
//! # Responsibilities
//! - Own the route table and the immutable base path
//! - Resolve each request to an agent by its first path segment
//! - Rewrite the request path to what the agent expects
//! - Hand off to the agent, through method mapping unless it is an agent card fetch
//!
//! # Design Decisions
//! - Agents are written as if mounted at `/`; prefix translation happens here once
//! - Dispatch never mutates the table
//! - The route entry is cloned out of the table before the agent is called
//! - The query string survives the path rewrite
//! - Segments are matched on the percent-decoded path; the agent receives the
//!   remainder re-encoded

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, Method, Request, Uri},
    response::{IntoResponse, Response},
    Router,
};

use crate::config::LimitsConfig;
use crate::http::error::MuxError;
use crate::http::handler::AgentHandler;
use crate::http::method_map::MethodMapping;
use crate::observability::{MuxEvent, MuxLogger, TracingLogger};
use crate::routing::{
    decode_path, encode_path, normalize_base_path, normalize_segment, resolve, AgentRoute,
    RouteEntry, RouteError, RouteTable, AGENT_CARD_PATH,
};

/// Routes requests under `base_path/<segment>/...` to registered agents.
#[derive(Debug)]
pub struct Multiplexer {
    routes: RouteTable,
    logger: Arc<dyn MuxLogger>,
    base_path: String,
    body_limit: usize,
}

impl Multiplexer {
    /// Create an empty multiplexer mounted at `base_path`.
    pub fn new(base_path: &str) -> Self {
        Self {
            routes: RouteTable::new(),
            logger: Arc::new(TracingLogger),
            base_path: normalize_base_path(base_path),
            body_limit: LimitsConfig::default().max_body_size,
        }
    }

    /// Replace the logging capability.
    pub fn with_logger(mut self, logger: Arc<dyn MuxLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Maximum body size read when mapping JSON-RPC methods.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Register an agent, replacing any agent on the same segment.
    pub fn add_route(&self, route: AgentRoute) -> Result<(), RouteError> {
        let entry = route.into_entry()?;
        let full = self.full_path(entry.segment());
        self.routes.insert(entry);
        self.logger.log(&MuxEvent::RouteAdded { route: &full });
        Ok(())
    }

    /// Remove an agent. Unknown segments are ignored.
    pub fn remove_route(&self, path: &str) {
        let full = self.full_path(normalize_segment(path));
        self.routes.remove(path);
        self.logger.log(&MuxEvent::RouteRemoved { route: &full });
    }

    /// Fully-qualified paths of all registered agents, in no particular order.
    pub fn list_routes(&self) -> Vec<String> {
        self.routes
            .segments()
            .iter()
            .map(|segment| self.full_path(segment))
            .collect()
    }

    /// Registered segments, in no particular order.
    pub fn segments(&self) -> Vec<String> {
        self.routes.segments()
    }

    pub fn lookup(&self, segment: &str) -> Option<Arc<RouteEntry>> {
        self.routes.get(normalize_segment(segment))
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    fn full_path(&self, segment: &str) -> String {
        format!("{}/{}", self.base_path, segment)
    }

    /// Dispatch a request to the agent its path names.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let original = decode_path(request.uri().path()).into_owned();

        let Some(resolution) = resolve(&self.base_path, &original) else {
            self.logger.log(&MuxEvent::RequestReceived {
                method: request.method(),
                path: &original,
                mapped: "",
            });
            return self.not_found("");
        };

        self.logger.log(&MuxEvent::RequestReceived {
            method: request.method(),
            path: &original,
            mapped: resolution.relative,
        });

        let Some(entry) = self.routes.get(resolution.segment) else {
            return self.not_found(resolution.segment);
        };

        let target = resolution.target_path;
        let agent_card = target == AGENT_CARD_PATH && request.method() == Method::GET;
        if agent_card {
            self.logger.log(&MuxEvent::AgentCard {
                segment: entry.segment(),
                from: &original,
                to: &target,
            });
        } else {
            self.logger.log(&MuxEvent::Routing {
                segment: entry.segment(),
                from: &original,
                to: &target,
            });
        }

        let request = match rewrite_path(request, &encode_path(&target)) {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };

        if agent_card {
            entry.handler().serve(request).await
        } else {
            MethodMapping::new(
                entry.handler().clone(),
                entry.method_map().clone(),
                self.logger.clone(),
                self.body_limit,
            )
            .serve(request)
            .await
        }
    }

    fn not_found(&self, segment: &str) -> Response {
        let available = self.routes.segments();
        self.logger.log(&MuxEvent::RouteNotFound {
            segment,
            available: &available,
        });
        MuxError::AgentNotFound.into_response()
    }

    /// Host adapter: an Axum router that sends every request to this multiplexer.
    pub fn into_router(self: Arc<Self>) -> Router {
        Router::new().fallback(dispatch).with_state(self)
    }
}

async fn dispatch(State(mux): State<Arc<Multiplexer>>, request: Request<Body>) -> Response {
    mux.handle(request).await
}

/// Replace the request path, keeping the query string.
fn rewrite_path(request: Request<Body>, path: &str) -> Result<Request<Body>, MuxError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let path_and_query =
        PathAndQuery::try_from(path_and_query).map_err(|e| MuxError::InvalidPath(e.into()))?;

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(path_and_query);
    parts.uri = Uri::from_parts(uri_parts).map_err(|e| MuxError::InvalidPath(e.into()))?;

    Ok(Request::from_parts(parts, body))
}
