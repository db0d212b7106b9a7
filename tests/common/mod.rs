//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;

use agent_mux::config::AgentConfig;
use agent_mux::{HttpServer, MuxConfig, Shutdown};

/// What a mock agent received.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub uri: String,
    pub content_length: Option<String>,
    pub body: Bytes,
}

pub type Inbox = Arc<Mutex<Vec<Received>>>;

/// Start a mock agent on a free local port that records every request and
/// answers `200 {"agent": name}`.
pub async fn start_mock_agent(name: &'static str) -> (SocketAddr, Inbox) {
    let inbox = Inbox::default();
    let app = Router::new()
        .fallback(record)
        .with_state((name, inbox.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, inbox)
}

async fn record(
    State((name, inbox)): State<(&'static str, Inbox)>,
    request: Request<Body>,
) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let content_length = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    inbox.lock().unwrap().push(Received {
        method,
        uri,
        content_length,
        body,
    });

    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "agent": name })),
    )
        .into_response()
}

pub fn agent(segment: &str, addr: SocketAddr) -> AgentConfig {
    AgentConfig {
        segment: segment.to_string(),
        upstream: Some(format!("http://{addr}")),
        method_map: None,
    }
}

/// Run a multiplexer server for `config` on a free local port.
pub async fn start_mux(mut config: MuxConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (_, config_updates) = tokio::sync::mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
