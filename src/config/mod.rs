//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! base config file (YAML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (discover module directories, dedupe by name)
//!     → GatewayConfig (immutable)
//!     → routing::compiler (semantic checks happen at compile time)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Syntactic validation is serde's job; semantic validation (unknown
//!   extensions, ambiguous routes) is the route compiler's job, so the
//!   pipeline itself never consumes an unvalidated route

pub mod loader;
pub mod schema;

pub use loader::{load_config, resolve_config_path, ConfigError};
pub use schema::{
    AuthConfig, AuthStrategy, ClaimsMatch, CorsConfig, GatewayConfig, ListenerConfig,
    ModuleConfig, ObservabilityConfig, RetryConfig, RouteConfig, TimeoutConfig,
};
