//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for (method, path), capturing placeholders
//! - Return an explicit no-match rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over same-method routes; specificity decides overlaps
//! - Literal segments beat placeholders; declaration order breaks ties

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::compiler::CompiledRoute;

/// A matched route plus the path placeholder values it captured.
pub struct RouteMatch {
    pub route: Arc<CompiledRoute>,
    pub params: HashMap<String, String>,
}

/// The registry mapping (method, path pattern) to compiled routes.
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field(
                "routes",
                &self.routes.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RouteTable {
    pub(crate) fn new(routes: Vec<Arc<CompiledRoute>>) -> Self {
        Self { routes }
    }

    /// Find the most specific route matching the request.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut best: Option<RouteMatch> = None;

        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };

            let candidate = RouteMatch {
                route: route.clone(),
                params,
            };
            // Declaration order is the tie-break: only a strictly more
            // specific pattern displaces an earlier match.
            best = match best {
                Some(current)
                    if !candidate.route.pattern.more_specific_than(&current.route.pattern) =>
                {
                    Some(current)
                }
                _ => Some(candidate),
            };
        }
        best
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate routes in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<CompiledRoute>> {
        self.routes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, ModuleConfig, RouteConfig};
    use crate::extensions::ExtensionRegistry;
    use crate::routing::compiler::compile;

    fn table_for(routes: Vec<(&str, &str)>) -> RouteTable {
        let config = GatewayConfig {
            modules: vec![ModuleConfig {
                name: "test".to_string(),
                path: String::new(),
                routes: routes
                    .into_iter()
                    .map(|(method, upstream)| RouteConfig {
                        upstream: upstream.to_string(),
                        method: method.to_string(),
                        downstream: "http://svc/".to_string(),
                        downstream_method: None,
                        claims: Vec::new(),
                        schema: None,
                        extensions: Vec::new(),
                        retries: None,
                        body: None,
                        forward_headers: None,
                    })
                    .collect(),
                retries: None,
            }],
            ..GatewayConfig::default()
        };
        compile(&config, &ExtensionRegistry::new()).unwrap()
    }

    #[test]
    fn test_literal_wins_regardless_of_declaration_order() {
        // Placeholder route declared first; the literal must still win.
        let table = table_for(vec![("get", "/users/{id}"), ("get", "/users/me")]);
        let matched = table.match_route(&Method::GET, "/users/me").unwrap();
        assert_eq!(matched.route.pattern.raw(), "/users/me");

        let matched = table.match_route(&Method::GET, "/users/42").unwrap();
        assert_eq!(matched.route.pattern.raw(), "/users/{id}");
        assert_eq!(matched.params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn test_method_must_match_exactly() {
        let table = table_for(vec![("post", "/users")]);
        assert!(table.match_route(&Method::GET, "/users").is_none());
        assert!(table.match_route(&Method::POST, "/users").is_some());
    }

    #[test]
    fn test_no_match_is_explicit() {
        let table = table_for(vec![("get", "/users")]);
        assert!(table.match_route(&Method::GET, "/orders").is_none());
    }
}
