//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! RouteMatch + inbound request
//!     → context.rs (per-request ExecutionContext, owned by one request)
//!     → processor.rs stages, each short-circuiting on failure:
//!         access check → schema check → value extraction
//!         → downstream assembly → extension execute hooks
//!         → retried downstream call → extension response hooks
//!         → response relay
//! ```
//!
//! # Design Decisions
//! - The processor holds no per-request state; everything lives in the
//!   context, so concurrent requests never contend inside the pipeline
//! - Denied/invalid requests never reach the downstream client
//! - Extension execute hooks run before the downstream call; a hook that
//!   supplies a response short-circuits the call entirely. Response hooks
//!   run afterwards and may reshape whatever response is relayed

pub mod context;
pub mod processor;

pub use context::{DownstreamRequest, ExecutionContext, GatewayResponse};
pub use processor::RequestProcessor;
