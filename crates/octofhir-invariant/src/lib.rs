//! FHIR invariant evaluation for Rust
//!
//! Evaluates the FHIRPath constraints declared in FHIR StructureDefinitions
//! against resource instances:
//! - Collecting the constraints that apply to each fragment of a resource
//! - Dispatching every constraint to a FHIRPath engine with the right context
//! - Aggregating per-constraint results in request order
//! - Rendering failures as an `OperationOutcome`
//!
//! # Example
//!
//! ```ignore
//! use octofhir_invariant::{BatchEvaluator, EvaluatorConfig, ProcessEngine};
//!
//! let evaluator = BatchEvaluator::new(ProcessEngine::default(), EvaluatorConfig::default());
//! let results = evaluator.evaluate_json(&batch)?;
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_invariant_diagnostics as diagnostics;
pub use octofhir_invariant_eval as eval;
pub use octofhir_invariant_model as model;

// Convenience re-exports
pub use octofhir_invariant_diagnostics::{InvariantError, Result};
pub use octofhir_invariant_eval::{
    BatchEvaluator, CollectingTraceObserver, EvaluatorConfig, ExpressionEngine, FailurePolicy,
    OperationOutcome, OutcomeBuilder, ProcessEngine, ProcessEngineConfig,
};
pub use octofhir_invariant_model::{
    ConstraintCollector, ConstraintRequest, ConstraintResult, DefinitionRegistry, FhirVersion,
    parse_batch,
};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
