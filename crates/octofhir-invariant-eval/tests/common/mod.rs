//! Common test utilities for batch evaluation
//!
//! - A recording mock engine with scripted replies
//! - FHIR fixtures for the usual scenarios

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
