//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Compile the route table from configuration at startup
//! - Create the axum router with the catch-all gateway handler
//! - Wire up middleware (timeout, request ID, identity, tracing)
//! - Dispatch matched requests into the pipeline
//!
//! # Design Decisions
//! - Compilation failures abort construction; the server never starts with
//!   a route the configuration author could not have validated
//! - The route table and processor are shared via Arc, read-only, lock-free
//! - Request cancellation (client disconnect, timeout) drops the in-flight
//!   pipeline future, abandoning remaining stages and retries

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AuthStrategy, CorsConfig, GatewayConfig};
use crate::extensions::ExtensionRegistry;
use crate::http::request_id::{RequestIdLayer, X_REQUEST_ID};
use crate::observability::metrics;
use crate::pipeline::{ExecutionContext, RequestProcessor};
use crate::routing::{compile, CompileError, RouteTable};
use crate::security::{trusted_header_identity, Identity};

/// Application state injected into the gateway handler.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub processor: Arc<RequestProcessor>,
    pub max_body_size: usize,
}

/// The gateway: a compiled route table behind an axum server.
pub struct Gateway {
    router: Router,
    config: GatewayConfig,
}

impl Gateway {
    /// Compile the configuration and build the server. Fails fast on any
    /// malformed route.
    pub fn new(config: GatewayConfig, registry: &ExtensionRegistry) -> Result<Self, CompileError> {
        let table = Arc::new(compile(&config, registry)?);
        tracing::info!(routes = table.len(), "Route table compiled");

        let state = AppState {
            table,
            processor: Arc::new(RequestProcessor::new(&config)),
            max_body_size: config.listener.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state);

        if config.authentication.strategy == AuthStrategy::TrustedHeaders {
            router = router.layer(axum::middleware::from_fn(trusted_header_identity));
        }

        if config.cors.enabled {
            router = router.layer(cors_layer(&config.cors));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Build the CORS layer from configuration. An empty allow-list means any;
/// entries that fail to parse are skipped rather than aborting startup.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: AllowOrigin = if config.allowed_origins.is_empty() {
        Any.into()
    } else {
        config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect::<Vec<_>>()
            .into()
    };
    let methods: AllowMethods = if config.allowed_methods.is_empty() {
        Any.into()
    } else {
        config
            .allowed_methods
            .iter()
            .filter_map(|m| m.to_ascii_uppercase().parse::<axum::http::Method>().ok())
            .collect::<Vec<_>>()
            .into()
    };
    let headers: AllowHeaders = if config.allowed_headers.is_empty() {
        Any.into()
    } else {
        config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse::<axum::http::HeaderName>().ok())
            .collect::<Vec<_>>()
            .into()
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// Catch-all handler: match the route table, build the per-request context,
/// run the pipeline, relay the outcome.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let Some(matched) = state.table.match_route(&method, &path) else {
        tracing::debug!(request_id = %request_id, method = %method, path = %path, "No route matched");
        let response = (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"code": "route_not_found", "path": path})),
        )
            .into_response();
        metrics::record_request(method.as_str(), response.status().as_u16(), "none", start);
        return response;
    };
    let route_id = matched.route.id.clone();

    let body_bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let response = (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(serde_json::json!({"code": "body_too_large"})),
            )
                .into_response();
            metrics::record_request(method.as_str(), response.status().as_u16(), &route_id, start);
            return response;
        }
    };

    let identity = parts.extensions.get::<Identity>().cloned();
    let ctx = ExecutionContext::new(
        request_id.clone(),
        matched.route,
        matched.params,
        method.clone(),
        parts.uri.clone(),
        parts.headers.clone(),
        body_bytes,
        identity,
    );

    let response = match state.processor.process(ctx).await {
        Ok(gateway_response) => gateway_response.into_axum(),
        Err(error) => {
            tracing::debug!(
                request_id = %request_id,
                route = %route_id,
                error = %error,
                "Pipeline rejected request"
            );
            error.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), &route_id, start);
    response
}
