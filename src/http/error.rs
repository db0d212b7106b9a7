//! Multiplexer-originated errors and their JSON-RPC 2.0 envelope.
//!
//! Errors produced by the agents themselves never pass through here; only
//! failures detected by the multiplexer are answered with this shape:
//!
//! ```text
//! {"jsonrpc":"2.0","error":{"code":<int>,"message":<string>},"id":null}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid JSON was received or the body could not be read.
pub const PARSE_ERROR: i32 = -32700;
/// The requested agent does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// JSON-RPC 2.0 error response. `id` is always null at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: String,
    pub error: JsonRpcError,
    pub id: Option<serde_json::Value>,
}

impl JsonRpcErrorResponse {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            error: JsonRpcError {
                code,
                message: message.into(),
            },
            id: None,
        }
    }
}

/// Failures the multiplexer answers on the agent's behalf.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Agent not found")]
    AgentNotFound,

    #[error("Failed to read request body")]
    BodyRead(#[source] axum::Error),

    #[error("Failed to marshal modified request")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid rewritten request path")]
    InvalidPath(#[source] axum::http::Error),

    #[error("Upstream agent unavailable")]
    Upstream(String),
}

impl MuxError {
    pub fn status(&self) -> StatusCode {
        match self {
            MuxError::AgentNotFound => StatusCode::NOT_FOUND,
            MuxError::BodyRead(_) => StatusCode::BAD_REQUEST,
            MuxError::Serialize(_) | MuxError::InvalidPath(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MuxError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            MuxError::AgentNotFound => METHOD_NOT_FOUND,
            MuxError::BodyRead(_) => PARSE_ERROR,
            MuxError::Serialize(_) | MuxError::InvalidPath(_) | MuxError::Upstream(_) => {
                INTERNAL_ERROR
            }
        }
    }

    pub fn to_envelope(&self) -> JsonRpcErrorResponse {
        JsonRpcErrorResponse::new(self.code(), self.to_string())
    }
}

impl IntoResponse for MuxError {
    fn into_response(self) -> Response {
        match &self {
            MuxError::AgentNotFound => {}
            MuxError::BodyRead(e) => tracing::warn!(error = %e, "Failed to read request body"),
            MuxError::Serialize(e) => tracing::error!(error = %e, "Failed to re-serialize request"),
            MuxError::InvalidPath(e) => tracing::error!(error = %e, "Failed to rewrite request path"),
            MuxError::Upstream(e) => tracing::error!(error = %e, "Upstream agent request failed"),
        }
        (self.status(), Json(self.to_envelope())).into_response()
    }
}
