//! Two toy agents served in-process behind one multiplexer.
//!
//! ```text
//! cargo run --example uppercaser
//! curl localhost:8080/api/agents/uppercaser/.well-known/agent.json
//! curl -XPOST localhost:8080/api/agents/uppercaser/ -d \
//!   '{"jsonrpc":"2.0","id":1,"method":"message/send","params":{"message":{"parts":[{"type":"text","text":"hi"}]}}}'
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use agent_mux::observability::init_logging;
use agent_mux::{AgentRoute, HttpServer, Multiplexer, MuxConfig, Shutdown};

/// A minimal JSON-RPC agent applying `transform` to the first text part.
fn text_agent(name: &'static str, transform: fn(&str) -> String) -> Router {
    Router::new()
        .route(
            "/.well-known/agent.json",
            get(move || async move {
                Json(json!({
                    "name": name,
                    "version": "1.0.0",
                    "capabilities": { "streaming": false },
                }))
            }),
        )
        .route(
            "/",
            post(move |Json(request): Json<Value>| async move {
                let text = request["params"]["message"]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default();
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "result": {
                        "method": request["method"],
                        "metadata": request["params"]["message"]["metadata"],
                        "artifact": transform(text),
                    },
                }))
            }),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MuxConfig::default();
    init_logging("debug", config.observability.log_format);

    let mux = Arc::new(Multiplexer::new(&config.base_path));
    mux.add_route(AgentRoute::new("reverser").handler(text_agent("Reverser", |t| {
        t.chars().rev().collect()
    })))?;
    mux.add_route(
        AgentRoute::new("uppercaser")
            .handler(text_agent("Uppercaser", str::to_uppercase))
            .method_map(HashMap::from([(
                "message/send".to_string(),
                "tasks/send".to_string(),
            )])),
    )?;
    tracing::info!(routes = ?mux.list_routes(), "Agents configured");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    // No config file, so no reloads: the in-process routes stay as registered.
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    let server = HttpServer::with_multiplexer(config, mux);
    server.run(listener, updates, shutdown.subscribe()).await?;
    Ok(())
}
