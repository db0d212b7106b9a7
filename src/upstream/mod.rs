//! Remote agents reached over HTTP.
//!
//! # Data Flow
//! ```text
//! [[agents]] config (segment, upstream URL, method_map)
//!     → sync_agents (register new/changed, remove stale)
//!     → UpstreamAgent per segment
//!
//! Request (path already rewritten by the multiplexer)
//!     → UpstreamAgent::serve
//!     → scheme/authority swapped for the agent's, base path prefixed
//!     → hyper-util pooled client
//!     → response streamed back untouched
//! ```
//!
//! # Design Decisions
//! - One shared client (connection pool) for all agents
//! - Agent errors are the agent's business; only connection failures become 502

use std::collections::HashSet;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, Uri,
    },
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::validation::validate_upstream;
use crate::config::AgentConfig;
use crate::http::error::MuxError;
use crate::http::{AgentHandler, Multiplexer};
use crate::routing::{normalize_segment, AgentRoute, RouteError};

/// HTTP client shared by every upstream agent.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the shared client.
pub fn build_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// An agent hosted by another process.
#[derive(Clone)]
pub struct UpstreamAgent {
    authority: Authority,
    prefix: String,
    client: UpstreamClient,
}

impl UpstreamAgent {
    /// Create an agent for an `http://host:port[/prefix]` base URL.
    pub fn new(upstream: &str, client: UpstreamClient) -> Result<Self, String> {
        let url = validate_upstream(upstream)?;
        let host = url.host_str().ok_or("missing host")?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::try_from(authority).map_err(|e| e.to_string())?;

        Ok(Self {
            authority,
            prefix: url.path().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn upstream_uri(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = uri
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/");
        let path_and_query = PathAndQuery::try_from(format!("{}{}", self.prefix, path_and_query))?;

        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?;
        Ok(uri)
    }

    async fn forward(self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        parts.uri = match self.upstream_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => return MuxError::InvalidPath(e).into_response(),
        };
        if let Ok(host) = HeaderValue::from_str(self.authority.as_str()) {
            parts.headers.insert(header::HOST, host);
        }

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => MuxError::Upstream(e.to_string()).into_response(),
        }
    }
}

impl AgentHandler for UpstreamAgent {
    fn serve(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(self.clone().forward(request))
    }
}

impl std::fmt::Debug for UpstreamAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamAgent")
            .field("authority", &self.authority)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Error registering a configured agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentSetupError {
    #[error("agent '{segment}': invalid upstream: {reason}")]
    Upstream { segment: String, reason: String },

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Build the registration for one configured agent.
pub fn agent_route(
    agent: &AgentConfig,
    client: &UpstreamClient,
) -> Result<AgentRoute, AgentSetupError> {
    let segment = normalize_segment(&agent.segment).to_string();
    let upstream = agent.upstream.as_deref().ok_or_else(|| {
        AgentSetupError::Route(RouteError::MissingHandler(segment.clone()))
    })?;
    let handler = UpstreamAgent::new(upstream, client.clone()).map_err(|reason| {
        AgentSetupError::Upstream {
            segment: segment.clone(),
            reason,
        }
    })?;

    let mut route = AgentRoute::new(segment).handler(handler);
    if let Some(map) = &agent.method_map {
        route = route.method_map(map.clone());
    }
    Ok(route)
}

/// Make the multiplexer's routes match `agents`.
///
/// Every configured agent is (re-)registered; registered segments missing from
/// `agents` are removed. Stops at the first agent that cannot be registered.
pub fn sync_agents(
    mux: &Multiplexer,
    agents: &[AgentConfig],
    client: &UpstreamClient,
) -> Result<(), AgentSetupError> {
    let mut wanted = HashSet::new();
    for agent in agents {
        let route = agent_route(agent, client)?;
        mux.add_route(route)?;
        wanted.insert(normalize_segment(&agent.segment).to_string());
    }

    for segment in mux.segments() {
        if !wanted.contains(&segment) {
            mux.remove_route(&segment);
        }
    }

    crate::observability::metrics::record_route_count(mux.route_count());
    Ok(())
}
