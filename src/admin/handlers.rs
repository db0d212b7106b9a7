use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::AgentConfig;
use crate::observability::metrics;
use crate::upstream::agent_route;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub base_path: String,
    pub routes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteInfo {
    pub segment: String,
    pub path: String,
    pub method_map: HashMap<String, String>,
}

/// Body of `POST /admin/routes`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewRoute {
    pub segment: String,
    pub upstream: String,
    #[serde(default)]
    pub method_map: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminError {
    pub error: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        base_path: state.mux.base_path().to_string(),
        routes: state.mux.route_count(),
    })
}

pub async fn list_routes(State(state): State<AdminState>) -> Json<Vec<RouteInfo>> {
    let mut routes: Vec<RouteInfo> = state
        .mux
        .segments()
        .into_iter()
        .filter_map(|segment| state.mux.lookup(&segment))
        .map(|entry| RouteInfo {
            segment: entry.segment().to_string(),
            path: format!("{}/{}", state.mux.base_path(), entry.segment()),
            method_map: (**entry.method_map()).clone(),
        })
        .collect();
    routes.sort_by(|a, b| a.segment.cmp(&b.segment));
    Json(routes)
}

pub async fn add_route(State(state): State<AdminState>, Json(new): Json<NewRoute>) -> Response {
    let config = AgentConfig {
        segment: new.segment,
        upstream: Some(new.upstream),
        method_map: new.method_map,
    };

    let result = agent_route(&config, &state.client)
        .and_then(|route| state.mux.add_route(route).map_err(Into::into));

    match result {
        Ok(()) => {
            metrics::record_route_count(state.mux.route_count());
            StatusCode::CREATED.into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(AdminError {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

pub async fn remove_route(
    State(state): State<AdminState>,
    Path(segment): Path<String>,
) -> StatusCode {
    state.mux.remove_route(&segment);
    metrics::record_route_count(state.mux.route_count());
    StatusCode::NO_CONTENT
}
