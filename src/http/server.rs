//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: the multiplexer's own router plus a liveness route
//! - Wire up middleware (request ID, tracing, timeout)
//! - Register configured agents and keep them in sync with config reloads
//! - Start the admin API next to the main listener
//! - Record request metrics

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::MuxConfig;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::Multiplexer;
use crate::observability::metrics;
use crate::upstream::{build_client, sync_agents, AgentSetupError, UpstreamClient};

/// Liveness probe path. Takes precedence over an agent of the same name.
pub const HEALTH_PATH: &str = "/healthz";

/// HTTP server for the agent multiplexer.
pub struct HttpServer {
    router: Router,
    config: MuxConfig,
    mux: Arc<Multiplexer>,
    client: UpstreamClient,
}

impl HttpServer {
    /// Create a server and register the configured agents.
    pub fn new(config: MuxConfig) -> Result<Self, AgentSetupError> {
        let mux = Arc::new(
            Multiplexer::new(&config.base_path).with_body_limit(config.limits.max_body_size),
        );
        let server = Self::with_multiplexer(config, mux);
        sync_agents(&server.mux, &server.config.agents, &server.client)?;
        Ok(server)
    }

    /// Create a server around an existing multiplexer (e.g., one with in-process agents).
    ///
    /// `config.agents` is not applied here; a config reload replaces the route
    /// set with the reloaded agents.
    pub fn with_multiplexer(config: MuxConfig, mux: Arc<Multiplexer>) -> Self {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let router = Self::build_router(&config, mux.clone());
        Self {
            router,
            config,
            mux,
            client,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MuxConfig, mux: Arc<Multiplexer>) -> Router {
        mux.into_router()
            .layer(middleware::from_fn(record_metrics))
            .route(HEALTH_PATH, get(|| async { "ok" }))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = request_id(request).unwrap_or("unknown")
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The router, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn multiplexer(&self) -> Arc<Multiplexer> {
        self.mux.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Agent routes follow every config received on `config_updates`. Returns
    /// once `shutdown` fires and in-flight requests have drained.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<MuxConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.mux.base_path(),
            routes = ?self.mux.list_routes(),
            "HTTP server starting"
        );

        tokio::spawn(apply_config_updates(
            self.mux.clone(),
            self.client.clone(),
            config_updates,
        ));

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin = setup_admin_router(AdminState {
                mux: self.mux.clone(),
                client: self.client.clone(),
            });
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API starting");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Records request metrics for agent traffic. The health route is not counted.
async fn record_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn apply_config_updates(
    mux: Arc<Multiplexer>,
    client: UpstreamClient,
    mut updates: mpsc::UnboundedReceiver<MuxConfig>,
) {
    while let Some(config) = updates.recv().await {
        let base_path = crate::routing::normalize_base_path(&config.base_path);
        if base_path != mux.base_path() {
            tracing::warn!(
                current = %mux.base_path(),
                requested = %base_path,
                "base_path cannot change at runtime; restart to apply"
            );
        }

        match sync_agents(&mux, &config.agents, &client) {
            Ok(()) => tracing::info!(routes = ?mux.list_routes(), "Agent routes reloaded"),
            Err(e) => tracing::error!(error = %e, "Failed to apply agent routes"),
        }
    }
}
