//! Batch evaluation and result aggregation

use crate::classify::ConstraintKind;
use crate::context::resolve;
use crate::engine::{CallSite, EngineCall, ExpressionEngine};
use crate::error::EngineError;
use crate::trace::TraceObserver;
use log::{debug, warn};
use octofhir_invariant_diagnostics::Result;
use octofhir_invariant_model::{ConstraintRequest, ConstraintResult, FhirVersion, parse_batch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// What to do when the engine fails on one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch; no partial results
    #[default]
    Abort,
    /// Record the failure on that request's result and carry on
    Isolate,
}

/// Evaluator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Type model passed on every engine call
    pub model: FhirVersion,
    pub failure_policy: FailurePolicy,
}

impl EvaluatorConfig {
    pub fn with_model(mut self, model: FhirVersion) -> Self {
        self.model = model;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

/// Collects results in request order
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<ConstraintResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    /// Record the outcome of `request`; `None` means the engine returned nothing
    pub fn push(&mut self, request: &ConstraintRequest, outcome: Option<Value>) {
        self.results
            .push(ConstraintResult::from_request(request, outcome));
    }

    /// Record an isolated failure for `request`
    pub fn push_failure(&mut self, request: &ConstraintRequest, error: impl Into<String>) {
        self.results.push(ConstraintResult::failed(request, error));
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn finish(self) -> Vec<ConstraintResult> {
        self.results
    }
}

/// Evaluates constraint batches one request at a time
pub struct BatchEvaluator<E> {
    engine: E,
    config: EvaluatorConfig,
    observer: Option<Arc<dyn TraceObserver>>,
}

impl<E: ExpressionEngine> BatchEvaluator<E> {
    pub fn new(engine: E, config: EvaluatorConfig) -> Self {
        Self {
            engine,
            config,
            observer: None,
        }
    }

    /// Route engine `trace()` output to `observer`
    pub fn with_trace_observer(mut self, observer: Arc<dyn TraceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parse a JSON batch and evaluate it
    ///
    /// A malformed batch fails before the engine is called at all.
    pub fn evaluate_json(&self, input: &str) -> Result<Vec<ConstraintResult>> {
        let requests = parse_batch(input)?;
        self.evaluate(&requests)
    }

    /// Evaluate every request in order
    ///
    /// Returns one result per request, in request order. Under
    /// [`FailurePolicy::Abort`] the first engine failure is returned instead.
    pub fn evaluate(&self, requests: &[ConstraintRequest]) -> Result<Vec<ConstraintResult>> {
        debug!(
            "Evaluating {} constraints with {} (model {})",
            requests.len(),
            self.engine.name(),
            self.config.model
        );

        let mut aggregator = ResultAggregator::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            match self.evaluate_one(index, request) {
                Ok(outcome) => aggregator.push(request, outcome),
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::Abort => return Err(err.for_request(index, request)),
                    FailurePolicy::Isolate => {
                        warn!("Constraint '{}' (request {}) failed: {}", request.key, index, err);
                        aggregator.push_failure(request, err.to_string());
                    }
                },
            }
        }
        Ok(aggregator.finish())
    }

    fn evaluate_one(
        &self,
        index: usize,
        request: &ConstraintRequest,
    ) -> std::result::Result<Option<Value>, EngineError> {
        let kind = ConstraintKind::classify(&request.expression);
        let resolved = resolve(request, kind);
        debug!(
            "Dispatching '{}' (request {}, {:?}) at '{}'",
            request.key, index, kind, request.parent_path
        );

        let call = EngineCall {
            document: &request.data,
            input: resolved.input,
            context: resolved.context,
            model: self.config.model,
            site: CallSite {
                index,
                key: &request.key,
                path: &request.parent_path,
            },
            trace: self.observer.as_deref(),
        };
        let values = self.engine.evaluate(&call)?;
        Ok(values.into_iter().next())
    }
}
