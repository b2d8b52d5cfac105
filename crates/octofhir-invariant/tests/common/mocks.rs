//! Mock expression engine answering by constraint key

use octofhir_invariant::eval::{EngineCall, EngineError, ExpressionEngine};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Answers every call from a table keyed by constraint key
///
/// Keys without an entry evaluate to `true`.
#[derive(Clone, Default)]
pub struct KeyedEngine {
    answers: HashMap<String, Result<Vec<Value>, EngineError>>,
    traces: HashMap<String, (String, Vec<Value>)>,
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl KeyedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, key: &str, values: Vec<Value>) -> Self {
        self.answers.insert(key.to_string(), Ok(values));
        self
    }

    pub fn fail(mut self, key: &str, error: EngineError) -> Self {
        self.answers.insert(key.to_string(), Err(error));
        self
    }

    pub fn trace(mut self, key: &str, label: &str, values: Vec<Value>) -> Self {
        self.traces
            .insert(key.to_string(), (label.to_string(), values));
        self
    }

    /// `(key, parent path)` for every call, in order
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().clone()
    }
}

impl ExpressionEngine for KeyedEngine {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        self.seen
            .lock()
            .push((call.site.key.to_string(), call.site.path.to_string()));
        if let Some((label, values)) = self.traces.get(call.site.key) {
            call.emit_trace(label, values);
        }
        self.answers
            .get(call.site.key)
            .cloned()
            .unwrap_or_else(|| Ok(vec![Value::Bool(true)]))
    }

    fn name(&self) -> &str {
        "keyed-mock"
    }
}
