//! Invariant evaluation diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the
//! invariant evaluator crates: error codes, the top-level error type and
//! diagnostic reporting.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for invariant evaluation
pub type Result<T> = std::result::Result<T, InvariantError>;
