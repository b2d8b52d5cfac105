//! CLI functionality for the invariant tool
//!
//! This module contains the command implementations (evaluate, collect,
//! validate) together with input resolution and output formatting.

pub mod collect;
pub mod engine;
pub mod evaluate;
pub mod output;
pub mod resolver;
pub mod validate;
