//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Register extensions → Compile routes
//!     → Extension init hooks (once, serialized) → Bind listener
//!
//! Shutdown:
//!     Ctrl+C → trigger shutdown → drain connections
//!     → Extension close hooks (once) → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Extension init/close are one-time, serialized lifecycle events, never
//!   per-request

pub mod shutdown;

pub use shutdown::Shutdown;
