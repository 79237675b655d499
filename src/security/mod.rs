//! Access control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity middleware (strategy fixed at startup)
//!     → Identity attached as a request extension, or absent (anonymous)
//!     → pipeline: access.rs (claims vs route requirements)
//!     → Allow, or deny before any downstream cost
//! ```
//!
//! # Design Decisions
//! - Authentication itself is external; the gateway consumes attached claims
//! - Deny-closed: protected route + anonymous caller = 401, never "no rules"
//! - Claim comparison is pure set containment, no per-request branching on
//!   configuration

pub mod access;

pub use access::{authorize, trusted_header_identity, AccessDecision, Identity};
