//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     GatewayConfig modules
//!     → compiler.rs (normalize methods, join prefixes, parse patterns,
//!       resolve extensions, compile schemas, resolve retry policies)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (method, path):
//!     → table.rs (scan candidates, literal beats placeholder)
//!     → Return: RouteMatch with captured params, or no match
//! ```
//!
//! # Design Decisions
//! - Compilation is fail-fast: a malformed route aborts startup, never
//!   surfaces at request time
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: literal segments beat placeholders, first-declared wins
//!   remaining ties; exact duplicates are a compile error

pub mod compiler;
pub mod pattern;
pub mod table;

pub use compiler::{compile, CompileError, CompiledRoute};
pub use pattern::{PathPattern, PatternError, Segment};
pub use table::{RouteMatch, RouteTable};
