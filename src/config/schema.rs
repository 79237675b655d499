//! Configuration schema definitions.
//!
//! This module defines the declarative route description the compiler
//! consumes. All types derive Serde traits for deserialization from YAML.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Upstream authentication strategy and claims-matching mode.
    pub authentication: AuthConfig,

    /// Modules declared inline in the base file.
    pub modules: Vec<ModuleConfig>,

    /// Optional directory scanned for additional module files (`*.yml`).
    pub modules_dir: Option<String>,

    /// Global default retry policy for downstream calls.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound header names propagated to downstream calls.
    /// Empty = forward everything except hop-by-hop headers and `host`.
    pub forward_headers: Vec<String>,

    /// Cross-origin resource sharing, off unless enabled.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request/response body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Upstream authentication configuration.
///
/// Authentication itself happens in front of the gateway; this only selects
/// how the caller's identity reaches the pipeline and how claim sets are
/// compared against a route's requirements.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity source strategy, fixed at startup.
    pub strategy: AuthStrategy,

    /// Claims-matching mode for protected routes.
    pub claims_match: ClaimsMatch,
}

/// How caller identity is attached to inbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Every caller is anonymous; protected routes always deny.
    #[default]
    None,
    /// Trust `x-identity-sub` / `x-identity-claims` headers set by the
    /// authenticating proxy in front of the gateway.
    TrustedHeaders,
}

/// How a caller's claim set is compared to a route's required set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsMatch {
    /// Caller must hold every required claim (superset).
    #[default]
    All,
    /// Caller must hold at least one required claim (intersection).
    Any,
}

/// A named bundle of routes plus shared defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleConfig {
    /// Module identity; duplicates across files dedupe by this name.
    pub name: String,

    /// Base path prefix resolved against each route's upstream path.
    #[serde(default)]
    pub path: String,

    /// Routes declared by this module.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Module-level default retry policy (overrides the global default).
    #[serde(default)]
    pub retries: Option<RetryConfig>,
}

/// Declarative description of a single route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Upstream path pattern, may contain named placeholders (`/users/{id}`).
    pub upstream: String,

    /// Upstream HTTP method; empty defaults to `get`.
    #[serde(default)]
    pub method: String,

    /// Downstream URL template; may reference placeholders and extracted
    /// values (`http://svc/users/{id}?tenant={header:x-tenant}`).
    pub downstream: String,

    /// Downstream HTTP method; defaults to the upstream method.
    #[serde(default)]
    pub downstream_method: Option<String>,

    /// Required access claims; empty = public route.
    #[serde(default)]
    pub claims: Vec<String>,

    /// Optional inline JSON Schema for the request body.
    #[serde(default)]
    pub schema: Option<serde_json::Value>,

    /// Ordered list of extension names to invoke.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Per-route retry override (replaces module/global defaults wholly).
    #[serde(default)]
    pub retries: Option<RetryConfig>,

    /// Optional downstream body template; absent = forward the inbound body.
    #[serde(default)]
    pub body: Option<String>,

    /// Per-route override of the propagated header subset.
    #[serde(default)]
    pub forward_headers: Option<Vec<String>>,
}

/// Cross-origin resource sharing configuration.
///
/// Selected once at startup: when disabled no CORS layer is mounted at all.
/// Empty allow-lists mean "any".
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Exact origins allowed; empty = any origin.
    pub allowed_origins: Vec<String>,

    /// Methods allowed; empty = any method.
    pub allowed_methods: Vec<String>,

    /// Request headers allowed; empty = any header.
    pub allowed_headers: Vec<String>,
}

/// Retry policy configuration for downstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub retries: u32,

    /// Base interval in seconds (fractional allowed).
    pub interval: f64,

    /// Exponential backoff (`interval^attempt`) instead of a fixed interval.
    pub exponential: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            interval: 1.0,
            exponential: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds; covers retries and backoff delays.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
