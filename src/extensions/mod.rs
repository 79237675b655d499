//! Extension hooks.
//!
//! # Responsibilities
//! - Define the extension contract (name, init, execute, on_response, close)
//! - Hold the name-keyed registry resolved at route compile time
//! - Drive the one-time init/close lifecycle
//!
//! # Design Decisions
//! - Extensions are process-wide singletons: init runs once at startup,
//!   close once at shutdown, never per request
//! - `execute` must be safe under concurrent invocation; the pipeline gives
//!   each call exclusive access to that request's context only
//! - Routes reference extensions by name; an unknown name is a compile error

use std::collections::HashMap;
use std::sync::Arc;

pub use futures_util::future::BoxFuture;

use crate::pipeline::context::{ExecutionContext, GatewayResponse};

/// Error raised by an extension hook, tagged with the extension's name.
#[derive(Debug, thiserror::Error)]
#[error("extension '{extension}' failed: {message}")]
pub struct ExtensionError {
    pub extension: String,
    pub message: String,
}

impl ExtensionError {
    pub fn new(extension: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            message: message.into(),
        }
    }
}

/// A named unit invoked at defined pipeline lifecycle points.
pub trait Extension: Send + Sync {
    /// Registry key; route configs reference this name.
    fn name(&self) -> &str;

    /// One-time initialization at startup.
    fn init(&self) -> BoxFuture<'_, Result<(), ExtensionError>> {
        Box::pin(async { Ok(()) })
    }

    /// Per-request hook, before the downstream call. May mutate the
    /// assembled downstream request or short-circuit the pipeline by
    /// setting a response on the context.
    fn execute<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), ExtensionError>>;

    /// Per-request hook, after a response exists (downstream reply or a
    /// short-circuit). May reshape status, headers or body before relay.
    fn on_response<'a>(
        &'a self,
        _ctx: &'a ExecutionContext,
        _response: &'a mut GatewayResponse,
    ) -> BoxFuture<'a, Result<(), ExtensionError>> {
        Box::pin(async { Ok(()) })
    }

    /// One-time teardown at shutdown.
    fn close(&self) -> BoxFuture<'_, Result<(), ExtensionError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Name-keyed registry of loaded extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    by_name: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. Duplicate names are rejected: two units
    /// competing for one name is a wiring mistake.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<(), ExtensionError> {
        let name = extension.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ExtensionError::new(name, "already registered"));
        }
        self.by_name.insert(name, extension);
        Ok(())
    }

    /// Look up an extension by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.by_name.get(name).cloned()
    }

    /// Run every extension's init hook, serialized, failing fast.
    pub async fn init_all(&self) -> Result<(), ExtensionError> {
        for extension in self.by_name.values() {
            extension.init().await?;
            tracing::debug!(extension = extension.name(), "Extension initialized");
        }
        Ok(())
    }

    /// Run every extension's close hook at shutdown; failures are logged,
    /// not propagated, so one extension cannot block teardown of the rest.
    pub async fn close_all(&self) {
        for extension in self.by_name.values() {
            if let Err(e) = extension.close().await {
                tracing::warn!(extension = extension.name(), error = %e, "Extension close failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(Noop("cache"))).unwrap();
        assert!(registry.get("cache").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(Noop("cache"))).unwrap();
        assert!(registry.register(Arc::new(Noop("cache"))).is_err());
    }
}
