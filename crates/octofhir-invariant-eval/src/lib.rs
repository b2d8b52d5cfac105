//! FHIR invariant batch evaluation
//!
//! This crate evaluates batches of FHIRPath constraints against FHIR JSON
//! fragments. The FHIRPath interpreter itself is external and reached through
//! the [`ExpressionEngine`] trait.
//!
//! # Pipeline
//!
//! For every request, in order:
//!
//! 1. [`ConstraintKind::classify`] spots the generic contained-reference rule
//!    (`dom-3`) and swaps in [`CONTAINED_REFERENCE_TEMPLATE`]
//! 2. [`resolve`] picks the expression shape (bare text or `{base, expression}`
//!    directive) and the binding for the whole resource (`%resource` or
//!    `%rootResource`)
//! 3. the engine evaluates the call and only its first value is kept
//! 4. [`ResultAggregator`] packages the outcome with the request's provenance
//!
//! # Example
//!
//! ```ignore
//! use octofhir_invariant_eval::{BatchEvaluator, EvaluatorConfig, ProcessEngine};
//!
//! let evaluator = BatchEvaluator::new(ProcessEngine::default(), EvaluatorConfig::default());
//! let results = evaluator.evaluate_json(batch_json)?;
//! ```

pub mod classify;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod outcome;
pub mod process;
pub mod trace;

pub use classify::{CONTAINED_REFERENCE_PREFIX, CONTAINED_REFERENCE_TEMPLATE, ConstraintKind};
pub use context::{BindingContext, ExpressionInput, ResolvedExpression, resolve};
pub use engine::{CallSite, EngineCall, ExpressionEngine};
pub use error::EngineError;
pub use evaluator::{BatchEvaluator, EvaluatorConfig, FailurePolicy, ResultAggregator};
pub use outcome::{Issue, IssueDetails, OperationOutcome, OutcomeBuilder};
pub use process::{ProcessEngine, ProcessEngineConfig};
pub use trace::{
    CollectingTraceObserver, LogTraceObserver, TraceEvent, TraceObserver, TraceRecord,
    UNMATCHED_LABEL,
};
