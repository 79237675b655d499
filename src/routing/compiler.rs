//! Route compilation.
//!
//! Turns declarative module/route configuration into executable
//! `CompiledRoute` entries. Compilation is a one-time, fail-fast step: any
//! malformed route aborts startup rather than being tolerated at request
//! time.

use std::sync::Arc;

use axum::http::Method;

use crate::config::GatewayConfig;
use crate::extensions::{Extension, ExtensionRegistry};
use crate::extract::{Template, TemplateError, ValueSpec};
use crate::resilience::RetryPolicy;
use crate::routing::pattern::{PathPattern, PatternError};
use crate::routing::table::RouteTable;
use crate::validation::CompiledSchema;

/// Startup-fatal route compilation error.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("route '{route}': invalid method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("route '{route}': invalid path pattern: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: PatternError,
    },

    #[error("route '{route}': invalid template: {source}")]
    InvalidTemplate {
        route: String,
        #[source]
        source: TemplateError,
    },

    #[error("route '{route}': invalid schema: {message}")]
    InvalidSchema { route: String, message: String },

    #[error("route '{route}': unknown extension '{name}'")]
    UnknownExtension { route: String, name: String },

    #[error("ambiguous route: '{method} {pattern}' is declared more than once")]
    DuplicateRoute { method: String, pattern: String },
}

/// A route definition compiled into its executable form.
///
/// Built once at startup, read-only thereafter; shared across all in-flight
/// requests without synchronization.
pub struct CompiledRoute {
    /// Identifier for logs and metrics: `module:METHOD pattern`.
    pub id: String,
    pub method: Method,
    pub downstream_method: Method,
    pub pattern: PathPattern,
    pub downstream: Template,
    pub body: Option<Template>,
    pub required_claims: Vec<String>,
    pub schema: Option<CompiledSchema>,
    pub extensions: Vec<Arc<dyn Extension>>,
    pub retry: RetryPolicy,
    /// Per-route override of the propagated header subset.
    pub forward_headers: Option<Vec<String>>,
}

/// Compile every module's routes into a route table.
pub fn compile(
    config: &GatewayConfig,
    registry: &ExtensionRegistry,
) -> Result<RouteTable, CompileError> {
    let global_retry = RetryPolicy::from_config(&config.retries);
    let mut routes = Vec::new();
    let mut shapes = std::collections::HashSet::new();

    for module in &config.modules {
        let module_retry = module
            .retries
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or(global_retry);

        for route_config in &module.routes {
            let full_path = join_paths(&module.path, &route_config.upstream);
            let route_id = format!(
                "{}:{} {}",
                module.name,
                normalize_method(&route_config.method),
                full_path
            );
            let method = parse_method(&route_config.method, &route_id)?;
            let downstream_method = match &route_config.downstream_method {
                Some(m) => parse_method(m, &route_id)?,
                None => method.clone(),
            };

            let pattern =
                PathPattern::parse(&full_path).map_err(|source| CompileError::InvalidPattern {
                    route: route_id.clone(),
                    source,
                })?;

            if !shapes.insert((method.clone(), pattern.shape_key())) {
                return Err(CompileError::DuplicateRoute {
                    method: method.to_string(),
                    pattern: full_path,
                });
            }

            let downstream = parse_template(&route_config.downstream, &pattern, &route_id)?;
            let body = route_config
                .body
                .as_deref()
                .map(|t| parse_template(t, &pattern, &route_id))
                .transpose()?;

            let schema = route_config
                .schema
                .as_ref()
                .map(|s| {
                    CompiledSchema::compile(s).map_err(|e| CompileError::InvalidSchema {
                        route: route_id.clone(),
                        message: e.message,
                    })
                })
                .transpose()?;

            let extensions = route_config
                .extensions
                .iter()
                .map(|name| {
                    registry
                        .get(name)
                        .ok_or_else(|| CompileError::UnknownExtension {
                            route: route_id.clone(),
                            name: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let retry = route_config
                .retries
                .as_ref()
                .map(RetryPolicy::from_config)
                .unwrap_or(module_retry);

            routes.push(Arc::new(CompiledRoute {
                id: route_id,
                method,
                downstream_method,
                pattern,
                downstream,
                body,
                required_claims: route_config.claims.clone(),
                schema,
                extensions,
                retry,
                forward_headers: route_config.forward_headers.clone(),
            }));
        }
    }

    Ok(RouteTable::new(routes))
}

/// Methods are case-insensitive in configuration; empty defaults to GET.
fn normalize_method(method: &str) -> String {
    if method.trim().is_empty() {
        "GET".to_string()
    } else {
        method.trim().to_ascii_uppercase()
    }
}

fn parse_method(method: &str, route_id: &str) -> Result<Method, CompileError> {
    let normalized = normalize_method(method);
    Method::from_bytes(normalized.as_bytes()).map_err(|_| CompileError::InvalidMethod {
        route: route_id.to_string(),
        method: method.to_string(),
    })
}

/// Parse a downstream URL/body template and check that every bare
/// placeholder it references is declared by the route's path pattern.
fn parse_template(
    template: &str,
    pattern: &PathPattern,
    route_id: &str,
) -> Result<Template, CompileError> {
    let parsed = Template::parse(template).map_err(|source| CompileError::InvalidTemplate {
        route: route_id.to_string(),
        source,
    })?;

    for spec in parsed.specs() {
        if let ValueSpec::Path(name) = spec {
            if !pattern.param_names().any(|p| p == name) {
                return Err(CompileError::InvalidTemplate {
                    route: route_id.to_string(),
                    source: TemplateError::UnknownPlaceholder { name: name.clone() },
                });
            }
        }
    }
    Ok(parsed)
}

/// Join a module prefix and a route path into one normalized pattern.
fn join_paths(prefix: &str, path: &str) -> String {
    let mut joined = String::from("/");
    for part in prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|p| !p.is_empty())
    {
        if !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(part);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModuleConfig, RetryConfig, RouteConfig};
    use crate::extensions::{BoxFuture, ExtensionError};
    use crate::pipeline::context::ExecutionContext;

    struct Noop(&'static str);

    impl Extension for Noop {
        fn name(&self) -> &str {
            self.0
        }

        fn execute<'a>(
            &'a self,
            _ctx: &'a mut ExecutionContext,
        ) -> BoxFuture<'a, Result<(), ExtensionError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn route(upstream: &str, downstream: &str) -> RouteConfig {
        RouteConfig {
            upstream: upstream.to_string(),
            method: String::new(),
            downstream: downstream.to_string(),
            downstream_method: None,
            claims: Vec::new(),
            schema: None,
            extensions: Vec::new(),
            retries: None,
            body: None,
            forward_headers: None,
        }
    }

    fn config_with(module: ModuleConfig) -> GatewayConfig {
        GatewayConfig {
            modules: vec![module],
            ..GatewayConfig::default()
        }
    }

    fn module(routes: Vec<RouteConfig>) -> ModuleConfig {
        ModuleConfig {
            name: "users".to_string(),
            path: "/api".to_string(),
            routes,
            retries: None,
        }
    }

    #[test]
    fn test_method_defaults_and_prefix_join() {
        let config = config_with(module(vec![route(
            "/users/{id}",
            "http://svc/users/{id}",
        )]));
        let table = compile(&config, &ExtensionRegistry::new()).unwrap();

        let matched = table.match_route(&Method::GET, "/api/users/42").unwrap();
        assert_eq!(matched.route.method, Method::GET);
        assert_eq!(matched.route.downstream_method, Method::GET);
        assert_eq!(matched.params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn test_downstream_method_defaults_to_upstream() {
        let mut r = route("/users", "http://svc/users");
        r.method = "post".to_string();
        let table = compile(&config_with(module(vec![r])), &ExtensionRegistry::new()).unwrap();
        let matched = table.match_route(&Method::POST, "/api/users").unwrap();
        assert_eq!(matched.route.downstream_method, Method::POST);
    }

    #[test]
    fn test_unknown_extension_fails_fast() {
        let mut r = route("/users", "http://svc/users");
        r.extensions = vec!["missing".to_string()];
        let err = compile(&config_with(module(vec![r])), &ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownExtension { name, .. } if name == "missing"));
    }

    #[test]
    fn test_registered_extension_resolved() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(Noop("audit"))).unwrap();

        let mut r = route("/users", "http://svc/users");
        r.extensions = vec!["audit".to_string()];
        let table = compile(&config_with(module(vec![r])), &registry).unwrap();
        let matched = table.match_route(&Method::GET, "/api/users").unwrap();
        assert_eq!(matched.route.extensions.len(), 1);
    }

    #[test]
    fn test_duplicate_route_detected_at_build_time() {
        // Same shape even though the placeholder names differ.
        let config = config_with(module(vec![
            route("/users/{id}", "http://svc/users/{id}"),
            route("/users/{uid}", "http://svc/accounts/{uid}"),
        ]));
        let err = compile(&config, &ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_template_placeholder_must_exist() {
        let config = config_with(module(vec![route("/users", "http://svc/users/{id}")]));
        let err = compile(&config, &ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_retry_resolution_route_module_global() {
        let mut with_override = route("/a", "http://svc/a");
        with_override.retries = Some(RetryConfig {
            retries: 7,
            interval: 0.1,
            exponential: true,
        });
        let plain = route("/b", "http://svc/b");

        let mut m = module(vec![with_override, plain]);
        m.retries = Some(RetryConfig {
            retries: 4,
            interval: 2.0,
            exponential: false,
        });
        let table = compile(&config_with(m), &ExtensionRegistry::new()).unwrap();

        let a = table.match_route(&Method::GET, "/api/a").unwrap();
        assert_eq!(a.route.retry.retries, 7);
        let b = table.match_route(&Method::GET, "/api/b").unwrap();
        assert_eq!(b.route.retry.retries, 4);
    }

    #[test]
    fn test_invalid_schema_aborts_compile() {
        let mut r = route("/users", "http://svc/users");
        r.schema = Some(serde_json::json!({"type": "not-a-type"}));
        let err = compile(&config_with(module(vec![r])), &ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidSchema { .. }));
    }

    #[test]
    fn test_join_paths_normalizes_slashes() {
        assert_eq!(join_paths("/api/", "/users"), "/api/users");
        assert_eq!(join_paths("", "users"), "/users");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("", ""), "/");
    }
}
