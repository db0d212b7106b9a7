//! Admin API for runtime route management.
//!
//! # Endpoints
//! - `GET /admin/status`: version, base path, route count
//! - `GET /admin/routes`: registered agents with their method maps
//! - `POST /admin/routes`: register (or replace) an upstream agent
//! - `DELETE /admin/routes/{segment}`: remove an agent (idempotent)
//!
//! # Design Decisions
//! - Served on its own listener, meant to stay on loopback
//! - No authentication layer

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use self::handlers::*;
use crate::http::Multiplexer;
use crate::upstream::UpstreamClient;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub mux: Arc<Multiplexer>,
    pub client: UpstreamClient,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(list_routes).post(add_route))
        .route("/admin/routes/{segment}", delete(remove_route))
        .with_state(state)
}
