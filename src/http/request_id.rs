//! Request ID layer.
//!
//! # Responsibilities
//! - Ensure every inbound request carries an `x-request-id` header
//! - Preserve IDs supplied by the caller (for cross-service correlation)
//!
//! # Design Decisions
//! - UUID v4, generated as early as possible so every log line can carry it

use axum::{body::Body, http::Request};
use tower::{Layer, Service};
use uuid::Uuid;

/// Correlation header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer attaching a request ID to every inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        if !req.headers().contains_key(X_REQUEST_ID) {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = id.parse() {
                req.headers_mut().insert(X_REQUEST_ID, value);
            }
        }
        self.inner.call(req)
    }
}
