//! Expression engine interface
//!
//! The engine is the FHIRPath interpreter. It receives one fully resolved call
//! at a time and returns the evaluated sequence.

use crate::context::{BindingContext, ExpressionInput};
use crate::error::EngineError;
use crate::trace::{TraceEvent, TraceObserver};
use octofhir_invariant_model::FhirVersion;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Which request a call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'a> {
    /// Position of the request in its batch
    pub index: usize,
    pub key: &'a str,
    pub path: &'a str,
}

/// One evaluation handed to the engine
pub struct EngineCall<'a> {
    /// Fragment the expression is evaluated against
    pub document: &'a Value,
    pub input: ExpressionInput<'a>,
    pub context: BindingContext<'a>,
    pub model: FhirVersion,
    pub site: CallSite<'a>,
    /// Receives `trace()` output, if anyone is listening
    pub trace: Option<&'a dyn TraceObserver>,
}

impl EngineCall<'_> {
    /// Forward one trace to the observer
    pub fn emit_trace(&self, label: &str, values: &[Value]) {
        if let Some(observer) = self.trace {
            observer.on_trace(&TraceEvent {
                site: self.site,
                label,
                values,
            });
        }
    }
}

impl fmt::Debug for EngineCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCall")
            .field("input", &self.input)
            .field("context", &self.context.variable())
            .field("model", &self.model)
            .field("site", &self.site)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

/// A FHIRPath interpreter
///
/// Implementations must be usable from several threads so that independent
/// batches can run side by side; a single batch calls the engine sequentially.
pub trait ExpressionEngine: Send + Sync {
    /// Evaluate one call, returning the result sequence (possibly empty)
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "engine"
    }
}

impl<T: ExpressionEngine + ?Sized> ExpressionEngine for &T {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        (**self).evaluate(call)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: ExpressionEngine + ?Sized> ExpressionEngine for Arc<T> {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        (**self).evaluate(call)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: ExpressionEngine + ?Sized> ExpressionEngine for Box<T> {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        (**self).evaluate(call)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
