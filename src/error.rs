//! Per-request error taxonomy and response mapping.
//!
//! # Design Decisions
//! - Startup errors (`ConfigError`, `CompileError`) abort the process and
//!   never appear here
//! - Every per-request failure becomes a structured JSON response; nothing
//!   leaks to the caller as an unhandled internal failure
//! - Gateway-side failures (`downstream_unavailable`) are distinguishable
//!   from the downstream service's own error responses, which are relayed
//!   verbatim

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::extensions::ExtensionError;
use crate::extract::ExtractError;
use crate::validation::SchemaViolation;

/// A request-fatal pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Protected route, no authenticated identity.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but claims are insufficient.
    #[error("access denied: {reason}")]
    Forbidden { reason: String },

    /// Request body violates the route's declared schema.
    #[error("schema validation failed ({} violations)", .0.len())]
    SchemaRejected(Vec<SchemaViolation>),

    /// A referenced value could not be extracted from the request.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// An extension failed during its execute hook.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// The rendered downstream URL was not a valid URI.
    #[error("invalid downstream URL: {0}")]
    InvalidDownstreamUrl(String),

    /// Retries exhausted against the downstream service.
    #[error("downstream unavailable after {attempts} attempts: {reason}")]
    DownstreamUnavailable { attempts: u32, reason: String },
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PipelineError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PipelineError::SchemaRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Extract(_) => StatusCode::BAD_REQUEST,
            PipelineError::Extension(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::InvalidDownstreamUrl(_) | PipelineError::DownstreamUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            PipelineError::Unauthenticated => json!({
                "code": "unauthenticated",
                "message": "authentication required",
            }),
            PipelineError::Forbidden { reason } => json!({
                "code": "access_denied",
                "reason": reason,
            }),
            // The violation list is relayed verbatim: order preserved,
            // not deduplicated.
            PipelineError::SchemaRejected(violations) => json!({
                "code": "validation_failed",
                "errors": violations,
            }),
            PipelineError::Extract(e) => json!({
                "code": match e {
                    ExtractError::Missing { .. } => "missing_value",
                    ExtractError::BodyNotJson => "invalid_body",
                },
                "message": e.to_string(),
            }),
            PipelineError::Extension(e) => json!({
                "code": "extension_failure",
                "extension": e.extension,
                "message": e.message,
            }),
            PipelineError::InvalidDownstreamUrl(url) => json!({
                "code": "invalid_downstream_url",
                "url": url,
            }),
            PipelineError::DownstreamUnavailable { attempts, reason } => json!({
                "code": "downstream_unavailable",
                "attempts": attempts,
                "reason": reason,
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PipelineError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            PipelineError::Forbidden { reason: "x".into() }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PipelineError::SchemaRejected(Vec::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PipelineError::DownstreamUnavailable {
                attempts: 3,
                reason: "connect refused".into()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PipelineError::Extract(ExtractError::BodyNotJson).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
