//! The handler capability agents are mounted with.
//!
//! Anything that can turn a `Request<Body>` into a `Response` can sit behind a
//! route: an in-process Axum app, a closure, or a remote agent reached over HTTP
//! (see `crate::upstream`).

use std::future::Future;

use axum::{body::Body, http::Request, response::Response, Router};
use futures_util::future::BoxFuture;
use tower::ServiceExt;

/// A request-serving agent endpoint.
///
/// The multiplexer rewrites `request.uri()` before calling `serve`, so
/// implementations see paths relative to their own root.
pub trait AgentHandler: Send + Sync + 'static {
    fn serve(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

impl AgentHandler for Router {
    fn serve(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let router = self.clone();
        Box::pin(async move {
            match router.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    }
}

/// Handler backed by an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Build an [`AgentHandler`] from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> AgentHandler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn serve(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin((self.f)(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get};

    #[tokio::test]
    async fn test_router_serves_as_agent() {
        let agent = Router::new().route("/ping", get(|| async { "pong" }));
        let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();

        let response = AgentHandler::serve(&agent, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let agent = handler_fn(|req: Request<Body>| async move {
            Response::builder()
                .status(StatusCode::ACCEPTED)
                .body(Body::from(req.uri().path().to_string()))
                .unwrap()
        });
        let request = Request::builder().uri("/x").body(Body::empty()).unwrap();

        let response = agent.serve(request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
