//! Per-request execution state.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use bytes::Bytes;
use serde_json::Value;

use crate::extract::{ExtractError, ValueSpec};
use crate::routing::CompiledRoute;
use crate::security::Identity;

/// The downstream call being assembled for one request.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A buffered response, either from the downstream service or supplied by
/// an extension.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    /// Convert into the response relayed to the caller. Hop-by-hop headers
    /// are stripped; status and body pass through unchanged.
    pub fn into_axum(self) -> axum::response::Response {
        let mut builder = axum::response::Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in &self.headers {
                if !is_hop_by_hop(name.as_str()) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
    }
}

/// Headers that must not be relayed or forwarded.
pub(crate) fn is_hop_by_hop(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "content-length"
    )
}

/// State owned by one in-flight request.
///
/// Created at dispatch, discarded when the response is written; never shared
/// across requests.
pub struct ExecutionContext {
    pub request_id: String,
    pub route: Arc<CompiledRoute>,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub identity: Option<Identity>,

    /// The in-progress downstream request; populated during assembly,
    /// visible to extension hooks.
    pub downstream: Option<DownstreamRequest>,

    /// Short-circuit/eventual response; an extension setting this skips the
    /// downstream call.
    pub response: Option<GatewayResponse>,

    params: HashMap<String, String>,
    query: HashMap<String, String>,
    parsed_body: Option<Result<Value, String>>,
    values: HashMap<ValueSpec, String>,
}

impl ExecutionContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: String,
        route: Arc<CompiledRoute>,
        params: HashMap<String, String>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        identity: Option<Identity>,
    ) -> Self {
        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            request_id,
            route,
            method,
            uri,
            headers,
            body,
            identity,
            downstream: None,
            response: None,
            params,
            query,
            parsed_body: None,
            values: HashMap::new(),
        }
    }

    /// Placeholder value captured by the route pattern.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decoded query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// The request body parsed as JSON, cached after the first call. An
    /// unparseable body is a distinguishable error on every access.
    pub fn body_json(&mut self) -> Result<&Value, ExtractError> {
        let body = &self.body;
        let parsed = self
            .parsed_body
            .get_or_insert_with(|| serde_json::from_slice(body).map_err(|e| e.to_string()));
        parsed.as_ref().map_err(|_| ExtractError::BodyNotJson)
    }

    /// Previously extracted value for a spec, if any.
    pub fn cached_value(&self, spec: &ValueSpec) -> Option<String> {
        self.values.get(spec).cloned()
    }

    /// Memoize an extracted value for the rest of this request.
    pub fn cache_value(&mut self, spec: &ValueSpec, value: String) {
        self.values.insert(spec.clone(), value);
    }
}
