//! Configuration-driven API gateway.
//!
//! Declarative routes (YAML modules) are compiled once at startup into an
//! immutable route table; every inbound request is dispatched through a
//! per-request pipeline that authorizes the caller, validates the body,
//! extracts named values, renders the downstream call and relays the
//! downstream response.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (base file + module dirs)
//!       → routing::compiler (fail-fast compile)
//!       → routing::table (immutable, lock-free lookups)
//!
//!   per request:
//!       http::server (axum catch-all)
//!       → routing::table (match method + path, capture params)
//!       → pipeline::processor
//!           → security::access   (claims vs required set)
//!           → validation         (JSON Schema, all violations)
//!           → extract            (path/query/header/body values)
//!           → extensions         (execute hooks, may short-circuit)
//!           → http::downstream   (retried call, bounded backoff)
//!           → extensions         (response hooks, may reshape)
//!       → response relayed to caller
//! ```

// Core subsystems
pub mod config;
pub mod extract;
pub mod http;
pub mod pipeline;
pub mod routing;

// Gating and plugins
pub mod extensions;
pub mod security;
pub mod validation;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use extensions::{Extension, ExtensionRegistry};
pub use http::server::Gateway;
pub use lifecycle::Shutdown;
pub use routing::{CompiledRoute, RouteTable};
