//! The pipeline orchestrator.

use axum::http::{HeaderMap, Method};
use bytes::Bytes;

use crate::config::{ClaimsMatch, GatewayConfig};
use crate::error::PipelineError;
use crate::http::downstream::{DownstreamClient, DownstreamError};
use crate::pipeline::context::{
    is_hop_by_hop, DownstreamRequest, ExecutionContext, GatewayResponse,
};
use crate::security::{self, AccessDecision};

/// Composes access checks, validation, extraction, extensions and the
/// retried downstream call into one response per request.
///
/// Holds no per-request state; safe to share across all in-flight requests.
pub struct RequestProcessor {
    client: DownstreamClient,
    claims_match: ClaimsMatch,
    forward_headers: Vec<String>,
}

impl RequestProcessor {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: DownstreamClient::new(config.listener.max_body_size),
            claims_match: config.authentication.claims_match,
            forward_headers: config.forward_headers.clone(),
        }
    }

    /// Run the pipeline stages, each short-circuiting the remainder on
    /// failure. Extension init/close are lifecycle events handled outside
    /// this per-request path.
    pub async fn process(
        &self,
        mut ctx: ExecutionContext,
    ) -> Result<GatewayResponse, PipelineError> {
        let route = ctx.route.clone();

        // Access check runs first: denied requests incur no downstream cost.
        match security::authorize(
            ctx.identity.as_ref(),
            &route.required_claims,
            self.claims_match,
        ) {
            AccessDecision::Allow => {}
            AccessDecision::Unauthenticated => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    route = %route.id,
                    "Denied: no identity"
                );
                return Err(PipelineError::Unauthenticated);
            }
            AccessDecision::Forbidden { reason } => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    route = %route.id,
                    reason = %reason,
                    "Denied: insufficient claims"
                );
                return Err(PipelineError::Forbidden { reason });
            }
        }

        // Schema check, for body-carrying methods only.
        if let Some(schema) = &route.schema {
            if method_carries_body(&ctx.method) {
                let payload = ctx.body_json()?.clone();
                let violations = schema.validate(&payload);
                if !violations.is_empty() {
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        route = %route.id,
                        violations = violations.len(),
                        "Schema validation rejected request"
                    );
                    return Err(PipelineError::SchemaRejected(violations));
                }
            }
        }

        // Extraction precedes rendering: every referenced value is resolved
        // (and cached) while the templates substitute.
        let url = route.downstream.render_url(&mut ctx)?;
        let body = match &route.body {
            Some(template) => Bytes::from(template.render(&mut ctx)?),
            None => ctx.body.clone(),
        };
        let headers = self.propagated_headers(&ctx);

        ctx.downstream = Some(DownstreamRequest {
            method: route.downstream_method.clone(),
            url,
            headers,
            body,
        });

        // Execute hooks in declared order; a hook that supplies a response
        // short-circuits the downstream call.
        for extension in &route.extensions {
            extension.execute(&mut ctx).await?;
            if ctx.response.is_some() {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    route = %route.id,
                    extension = extension.name(),
                    "Extension short-circuited the pipeline"
                );
                break;
            }
        }
        let mut response = match ctx.response.take() {
            Some(response) => response,
            None => {
                let downstream = ctx.downstream.take().ok_or_else(|| {
                    // An extension removed the assembled request without
                    // answering.
                    PipelineError::InvalidDownstreamUrl(
                        "downstream request dropped".to_string(),
                    )
                })?;

                match self
                    .client
                    .send(downstream, &route.retry, &ctx.request_id, &route.id)
                    .await
                {
                    Ok(response) => response,
                    Err(DownstreamError::InvalidUrl(url)) => {
                        return Err(PipelineError::InvalidDownstreamUrl(url))
                    }
                    Err(DownstreamError::Exhausted { attempts, reason }) => {
                        return Err(PipelineError::DownstreamUnavailable { attempts, reason })
                    }
                }
            }
        };

        // Response-phase hooks run in declared order on whatever response
        // is about to be relayed, downstream reply and short-circuit alike.
        for extension in &route.extensions {
            extension.on_response(&ctx, &mut response).await?;
        }
        Ok(response)
    }

    /// Select the inbound headers propagated downstream: the configured
    /// subset (route override, else global), or everything minus hop-by-hop
    /// headers and `host` when no subset is configured.
    fn propagated_headers(&self, ctx: &ExecutionContext) -> HeaderMap {
        let subset = ctx
            .route
            .forward_headers
            .as_deref()
            .unwrap_or(&self.forward_headers);

        let mut headers = HeaderMap::new();
        if subset.is_empty() {
            for (name, value) in &ctx.headers {
                if !is_hop_by_hop(name.as_str()) && name != "host" {
                    headers.append(name.clone(), value.clone());
                }
            }
        } else {
            for name in subset {
                let lowered = name.to_ascii_lowercase();
                if let Some(value) = ctx.headers.get(lowered.as_str()) {
                    if let Ok(header_name) =
                        axum::http::HeaderName::from_bytes(lowered.as_bytes())
                    {
                        headers.append(header_name, value.clone());
                    }
                }
            }
        }
        headers
    }
}

/// Whether the method is expected to carry a request body worth validating.
fn method_carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}
