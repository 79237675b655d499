//! Downstream HTTP client with retry.
//!
//! # Responsibilities
//! - Issue the one logical downstream call for a request
//! - Retry transient failures (connect errors, 5xx) per the route's policy
//! - Log and count every attempt; surface exhaustion as a distinct error
//!
//! # Design Decisions
//! - Backoff delays are async sleeps, never blocking other requests
//! - Non-5xx downstream responses are relayed verbatim, even errors: the
//!   service rejecting a request is not the gateway failing to reach it
//! - 5xx responses and connect errors that outlive the retry budget become
//!   a downstream-unavailable failure, not a relayed body

use axum::body::Body;
use hyper::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::observability::metrics;
use crate::pipeline::context::{DownstreamRequest, GatewayResponse};
use crate::resilience::RetryPolicy;

/// Failure of the downstream call after the retry policy is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("invalid downstream URL '{0}'")]
    InvalidUrl(String),

    #[error("downstream unavailable after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },
}

/// Client wrapper issuing retried downstream calls.
#[derive(Clone)]
pub struct DownstreamClient {
    client: Client<HttpConnector, Body>,
    max_body_size: usize,
}

impl DownstreamClient {
    pub fn new(max_body_size: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_body_size,
        }
    }

    /// Send the assembled downstream request under the route's retry policy.
    pub async fn send(
        &self,
        request: DownstreamRequest,
        policy: &RetryPolicy,
        request_id: &str,
        route_id: &str,
    ) -> Result<GatewayResponse, DownstreamError> {
        let uri: Uri = request
            .url
            .parse()
            .map_err(|_| DownstreamError::InvalidUrl(request.url.clone()))?;

        let max_attempts = policy.max_attempts();
        let mut attempt = 0;
        let mut last_failure;

        loop {
            attempt += 1;
            if attempt > 1 {
                let delay = policy.delay_before(attempt);
                tracing::info!(
                    request_id = %request_id,
                    route = %route_id,
                    attempt,
                    delay = ?delay,
                    "Retrying downstream call"
                );
                metrics::record_retry(route_id);
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&request, &uri).await {
                Ok(response) if response.status.is_server_error() => {
                    last_failure = format!("downstream responded {}", response.status);
                    tracing::warn!(
                        request_id = %request_id,
                        route = %route_id,
                        attempt,
                        status = %response.status,
                        "Transient downstream failure"
                    );
                }
                Ok(response) => return Ok(response),
                Err(reason) => {
                    last_failure = reason;
                    tracing::warn!(
                        request_id = %request_id,
                        route = %route_id,
                        attempt,
                        error = %last_failure,
                        "Downstream call failed"
                    );
                }
            }

            if attempt >= max_attempts {
                return Err(DownstreamError::Exhausted {
                    attempts: attempt,
                    reason: last_failure,
                });
            }
        }
    }

    /// One downstream attempt, buffering the response body.
    async fn attempt(
        &self,
        request: &DownstreamRequest,
        uri: &Uri,
    ) -> Result<GatewayResponse, String> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(uri.clone());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in &request.headers {
                headers.append(name.clone(), value.clone());
            }
        }
        let outbound = builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| e.to_string())?;

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), self.max_body_size)
            .await
            .map_err(|e| e.to_string())?;

        Ok(GatewayResponse {
            status: parts.status,
            headers: parts.headers,
            body: bytes,
        })
    }
}
