//! JSON-RPC method mapping.
//!
//! # Responsibilities
//! - Intercept POSTs aimed at an agent's root (`/` or any path ending in `/`)
//! - Rename the JSON-RPC `method` according to the route's method map
//! - Record the original method under `params.message.metadata.method`
//! - Forward everything else untouched
//!
//! # Design Decisions
//! - Renaming and metadata injection are independent and best-effort: a body
//!   of an unexpected shape is forwarded, never rejected
//! - Bodies that are not a JSON object are forwarded byte for byte
//! - Body read and re-serialization failures stop the request here

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::http::error::MuxError;
use crate::http::handler::AgentHandler;
use crate::observability::{MuxEvent, MuxLogger};
use crate::routing::MethodMap;

/// Decorates an agent handler with JSON-RPC method mapping.
#[derive(Clone)]
pub struct MethodMapping {
    inner: Arc<dyn AgentHandler>,
    method_map: Arc<MethodMap>,
    logger: Arc<dyn MuxLogger>,
    body_limit: usize,
}

impl MethodMapping {
    pub fn new(
        inner: Arc<dyn AgentHandler>,
        method_map: Arc<MethodMap>,
        logger: Arc<dyn MuxLogger>,
        body_limit: usize,
    ) -> Self {
        Self {
            inner,
            method_map,
            logger,
            body_limit,
        }
    }

    async fn map_and_forward(self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, self.body_limit).await {
            Ok(bytes) => bytes,
            Err(e) => return MuxError::BodyRead(e).into_response(),
        };

        let body = match rewrite_body(body, &self.method_map, self.logger.as_ref()) {
            Ok(body) => body,
            Err(e) => return e.into_response(),
        };

        parts.headers.remove(header::TRANSFER_ENCODING);
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        self.inner
            .serve(Request::from_parts(parts, Body::from(body)))
            .await
    }
}

impl AgentHandler for MethodMapping {
    fn serve(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        if !should_map_method(&request) {
            return self.inner.serve(request);
        }
        Box::pin(self.clone().map_and_forward(request))
    }
}

impl std::fmt::Debug for MethodMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodMapping")
            .field("method_map", &self.method_map)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

/// POSTs to the agent root carry JSON-RPC calls; sub-resources do not.
pub fn should_map_method<B>(request: &Request<B>) -> bool {
    request.method() == Method::POST && request.uri().path().ends_with('/')
}

/// Rewrite a JSON-RPC request body.
///
/// Returns the original bytes when the body is not a JSON object.
pub fn rewrite_body(
    body: Bytes,
    method_map: &MethodMap,
    logger: &dyn MuxLogger,
) -> Result<Bytes, MuxError> {
    let Ok(mut request) = serde_json::from_slice::<Map<String, Value>>(&body) else {
        return Ok(body);
    };

    let original_method = map_method(&mut request, method_map, logger);
    inject_metadata(&mut request, original_method.as_deref().unwrap_or(""), logger);

    serde_json::to_vec(&request)
        .map(Bytes::from)
        .map_err(MuxError::Serialize)
}

/// Rename `method` when the map has an entry for it. Returns the inbound name.
fn map_method(
    request: &mut Map<String, Value>,
    method_map: &MethodMap,
    logger: &dyn MuxLogger,
) -> Option<String> {
    let Some(Value::String(method)) = request.get_mut("method") else {
        return None;
    };
    let original = method.clone();

    if let Some(mapped) = method_map.get(&original) {
        logger.log(&MuxEvent::MethodMapped {
            from: &original,
            to: mapped,
        });
        *method = mapped.clone();
    }
    Some(original)
}

/// Ensure `params.message.metadata.method` is set.
///
/// An existing `metadata.method` is left alone; a missing or non-object
/// `metadata` is replaced. Without an object `params.message` nothing changes.
fn inject_metadata(request: &mut Map<String, Value>, method: &str, logger: &dyn MuxLogger) {
    let Some(Value::Object(params)) = request.get_mut("params") else {
        return;
    };
    let Some(Value::Object(message)) = params.get_mut("message") else {
        return;
    };

    match message.get_mut("metadata") {
        Some(Value::Object(metadata)) => {
            if !metadata.contains_key("method") {
                metadata.insert("method".to_string(), Value::String(method.to_string()));
                logger.log(&MuxEvent::MetadataInjected { method });
            }
        }
        _ => {
            let mut metadata = Map::new();
            metadata.insert("method".to_string(), Value::String(method.to_string()));
            message.insert("metadata".to_string(), Value::Object(metadata));
            logger.log(&MuxEvent::MetadataCreated { method });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler_fn;
    use crate::observability::NoopLogger;
    use crate::routing::default_method_map;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Mutex;

    fn rewrite(value: Value) -> Value {
        let body = Bytes::from(serde_json::to_vec(&value).unwrap());
        let out = rewrite_body(body, &default_method_map(), &NoopLogger).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_maps_method_and_creates_metadata() {
        let out = rewrite(json!({
            "jsonrpc": "2.0",
            "method": "message/send",
            "id": 1,
            "params": { "message": { "parts": [{ "type": "text", "text": "hi" }] } }
        }));

        assert_eq!(out["method"], "tasks/send");
        assert_eq!(out["params"]["message"]["metadata"]["method"], "message/send");
        assert_eq!(out["params"]["message"]["parts"][0]["text"], "hi");
        assert_eq!(out["id"], 1);
    }

    #[test]
    fn test_unmapped_method_still_injects_metadata() {
        let out = rewrite(json!({
            "method": "tasks/get",
            "params": { "message": { "metadata": { "trace": "abc" } } }
        }));

        assert_eq!(out["method"], "tasks/get");
        assert_eq!(out["params"]["message"]["metadata"]["method"], "tasks/get");
        assert_eq!(out["params"]["message"]["metadata"]["trace"], "abc");
    }

    #[test]
    fn test_existing_metadata_method_is_kept() {
        let out = rewrite(json!({
            "method": "message/send",
            "params": { "message": { "metadata": { "method": "custom" } } }
        }));

        assert_eq!(out["method"], "tasks/send");
        assert_eq!(out["params"]["message"]["metadata"]["method"], "custom");
    }

    #[test]
    fn test_non_object_metadata_is_replaced() {
        let out = rewrite(json!({
            "method": "message/send",
            "params": { "message": { "metadata": null } }
        }));
        assert_eq!(out["params"]["message"]["metadata"], json!({ "method": "message/send" }));
    }

    #[test]
    fn test_missing_method_injects_empty_string() {
        let out = rewrite(json!({ "params": { "message": {} } }));
        assert!(out.get("method").is_none());
        assert_eq!(out["params"]["message"]["metadata"]["method"], "");
    }

    #[test]
    fn test_shape_mismatches_are_left_alone() {
        let out = rewrite(json!({ "method": "message/send", "params": [1, 2] }));
        assert_eq!(out["method"], "tasks/send");
        assert_eq!(out["params"], json!([1, 2]));

        let out = rewrite(json!({ "method": "message/send", "params": { "message": "hi" } }));
        assert_eq!(out["params"]["message"], "hi");

        let out = rewrite(json!({ "method": 7, "params": {} }));
        assert_eq!(out["method"], 7);
        assert_eq!(out["params"], json!({}));
    }

    #[test]
    fn test_non_json_body_is_byte_identical() {
        let map = default_method_map();
        let bodies: [&[u8]; 4] = [b"not json", b"{\"method\": \"message/send\"", b"[1,2,3]", b""];
        for raw in bodies {
            let out = rewrite_body(Bytes::copy_from_slice(raw), &map, &NoopLogger).unwrap();
            assert_eq!(&out[..], raw);
        }
    }

    #[test]
    fn test_should_map_method() {
        let post = |uri: &str| Request::post(uri).body(()).unwrap();
        assert!(should_map_method(&post("/")));
        assert!(should_map_method(&post("/tasks/")));
        assert!(!should_map_method(&post("/tasks")));
        assert!(!should_map_method(&Request::get("/").body(()).unwrap()));
    }

    type Seen = Arc<Mutex<Vec<(String, Option<String>, Bytes)>>>;

    fn recording_agent(seen: Seen) -> Arc<dyn AgentHandler> {
        Arc::new(handler_fn(move |req: Request<Body>| {
            let seen = seen.clone();
            async move {
                let path = req.uri().path().to_string();
                let length = req
                    .headers()
                    .get(header::CONTENT_LENGTH)
                    .map(|v| v.to_str().unwrap().to_string());
                let body = req.into_body().collect().await.unwrap().to_bytes();
                seen.lock().unwrap().push((path, length, body));
                StatusCode::OK.into_response()
            }
        }))
    }

    fn wrapper(seen: Seen, body_limit: usize) -> MethodMapping {
        MethodMapping::new(
            recording_agent(seen),
            Arc::new(default_method_map()),
            Arc::new(NoopLogger),
            body_limit,
        )
    }

    #[tokio::test]
    async fn test_forwards_rewritten_body_with_length() {
        let seen = Seen::default();
        let request = Request::post("/")
            .body(Body::from(r#"{"method":"message/send","params":{"message":{}}}"#))
            .unwrap();

        let response = wrapper(seen.clone(), 1024).serve(request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let seen = seen.lock().unwrap();
        let (path, length, body) = &seen[0];
        assert_eq!(path, "/");
        assert_eq!(length.as_deref(), Some(body.len().to_string().as_str()));
        let value: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["method"], "tasks/send");
    }

    #[tokio::test]
    async fn test_sub_resource_passes_through() {
        let seen = Seen::default();
        let raw = r#"{"method":"message/send"}"#;
        let request = Request::post("/tasks").body(Body::from(raw)).unwrap();

        wrapper(seen.clone(), 1024).serve(request).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/tasks");
        assert_eq!(&seen[0].2[..], raw.as_bytes());
    }

    #[tokio::test]
    async fn test_oversized_body_is_parse_error() {
        let seen = Seen::default();
        let request = Request::post("/").body(Body::from(vec![b'x'; 64])).unwrap();

        let response = wrapper(seen.clone(), 16).serve(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["error"]["message"], "Failed to read request body");
        assert!(seen.lock().unwrap().is_empty());
    }
}
