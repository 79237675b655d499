//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream call:
//!     → retry.rs (bounded attempts, fixed or exponential backoff)
//!     → transient failure (connect error, 5xx): sleep, try again
//!     → retries exhausted: surface downstream-unavailable to the caller
//! ```
//!
//! # Design Decisions
//! - Retries apply only to transient failures, never to authorization or
//!   validation outcomes
//! - Backoff delays are async sleeps; they never block other requests
//! - The attempt bound is absolute: retries + 1 calls, then escalate

pub mod retry;

pub use retry::RetryPolicy;
