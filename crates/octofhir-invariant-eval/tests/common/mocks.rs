//! Mock expression engine
//!
//! Records every call it receives and answers from a script keyed by the
//! dispatched expression text.

use octofhir_invariant_eval::{EngineCall, EngineError, ExpressionEngine};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One call as seen by the engine, in owned wire form
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub document: Value,
    pub expression: Value,
    pub context: Value,
    pub model: String,
    pub index: usize,
    pub key: String,
}

/// A scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Values(Vec<Value>),
    Traced(Vec<Value>, String, Vec<Value>),
    Fail(EngineError),
}

/// Mock engine with configurable replies
#[derive(Clone, Default)]
pub struct MockEngine {
    replies: Arc<RwLock<HashMap<String, Reply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `expression` with `values`
    pub fn returns(self, expression: impl Into<String>, values: Vec<Value>) -> Self {
        self.replies
            .write()
            .insert(expression.into(), Reply::Values(values));
        self
    }

    /// Answer `expression` with `values` and emit one trace
    pub fn traces(
        self,
        expression: impl Into<String>,
        values: Vec<Value>,
        label: impl Into<String>,
        traced: Vec<Value>,
    ) -> Self {
        self.replies.write().insert(
            expression.into(),
            Reply::Traced(values, label.into(), traced),
        );
        self
    }

    /// Fail on `expression`
    pub fn fails(self, expression: impl Into<String>, error: EngineError) -> Self {
        self.replies
            .write()
            .insert(expression.into(), Reply::Fail(error));
        self
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl ExpressionEngine for MockEngine {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        self.calls.lock().push(RecordedCall {
            document: call.document.clone(),
            expression: serde_json::to_value(call.input).unwrap(),
            context: serde_json::to_value(call.context).unwrap(),
            model: call.model.to_string(),
            index: call.site.index,
            key: call.site.key.to_string(),
        });

        let reply = self.replies.read().get(call.input.expression()).cloned();
        match reply {
            Some(Reply::Values(values)) => Ok(values),
            Some(Reply::Traced(values, label, traced)) => {
                call.emit_trace(&label, &traced);
                Ok(values)
            }
            Some(Reply::Fail(error)) => Err(error),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
