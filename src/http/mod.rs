//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum catch-all, request-id, timeout, identity layers)
//!     → routing::table (dispatch)
//!     → pipeline::processor
//!     → downstream.rs (retried call to the backend service)
//!     → response relayed to the caller
//! ```

pub mod downstream;
pub mod request_id;
pub mod server;

pub use downstream::{DownstreamClient, DownstreamError};
pub use request_id::{RequestIdLayer, X_REQUEST_ID};
pub use server::Gateway;
