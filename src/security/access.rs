//! Claims-based access validation.

use std::collections::HashSet;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::config::ClaimsMatch;

/// Header carrying the authenticated subject, set by the fronting auth layer.
pub const IDENTITY_SUBJECT_HEADER: &str = "x-identity-sub";

/// Header carrying the caller's claims, comma-separated.
pub const IDENTITY_CLAIMS_HEADER: &str = "x-identity-claims";

/// The caller's authenticated identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub claims: HashSet<String>,
}

/// Outcome of the access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Protected route, no authenticated identity.
    Unauthenticated,
    /// Authenticated but claims are insufficient.
    Forbidden { reason: String },
}

/// Decide whether the caller may proceed against a route's required claims.
///
/// Runs before schema validation and before any downstream call, so denied
/// requests incur no downstream cost.
pub fn authorize(
    identity: Option<&Identity>,
    required: &[String],
    mode: ClaimsMatch,
) -> AccessDecision {
    if required.is_empty() {
        return AccessDecision::Allow;
    }

    let Some(identity) = identity else {
        return AccessDecision::Unauthenticated;
    };

    let satisfied = match mode {
        ClaimsMatch::All => required.iter().all(|c| identity.claims.contains(c)),
        ClaimsMatch::Any => required.iter().any(|c| identity.claims.contains(c)),
    };

    if satisfied {
        AccessDecision::Allow
    } else {
        AccessDecision::Forbidden {
            reason: format!(
                "subject '{}' lacks required claims ({})",
                identity.subject,
                required.join(", ")
            ),
        }
    }
}

/// Identity middleware for the `trusted_headers` strategy.
///
/// The terminating auth proxy is trusted to have validated the caller and to
/// set the identity headers; requests without them stay anonymous.
pub async fn trusted_header_identity(mut req: Request<Body>, next: Next) -> Response {
    let subject = req
        .headers()
        .get(IDENTITY_SUBJECT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if let Some(subject) = subject {
        let claims = req
            .headers()
            .get(IDENTITY_CLAIMS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        req.extensions_mut().insert(Identity { subject, claims });
    }

    next.run(req).await
}
