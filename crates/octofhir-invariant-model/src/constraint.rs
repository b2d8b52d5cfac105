//! Constraint requests and results
//!
//! The wire names follow the batch format produced by resource walkers:
//! requests use `constraintKey`, `constraintExpression` and friends, results
//! use the short `key`/`path`/`human` names.

use octofhir_invariant_diagnostics::{INV0001, INV0002, INV0003, InvariantError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field whose value names the type of a JSON fragment
pub const DISCRIMINATOR: &str = "resourceType";

/// Get the `resourceType` of a fragment, if it has a non-empty one
pub fn resource_type(value: &Value) -> Option<&str> {
    value
        .get(DISCRIMINATOR)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// One constraint to evaluate against one fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRequest {
    /// Fragment the expression is evaluated against
    pub data: Value,
    /// Top-level resource the fragment is embedded in (may equal `data`)
    pub root_data: Value,
    /// FHIRPath source text
    #[serde(rename = "constraintExpression")]
    pub expression: String,
    /// Rule identifier (e.g. `dom-3`)
    #[serde(rename = "constraintKey")]
    pub key: String,
    /// Dotted element path of `data` within `root_data`, empty for the root
    #[serde(default)]
    pub parent_path: String,
    /// Human-readable rule description
    #[serde(rename = "constraintHuman", default)]
    pub human: String,
    /// Provenance of the rule
    #[serde(
        rename = "constraintSource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    /// Severity classification (error, warning)
    #[serde(
        rename = "constraintSeverity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
}

impl ConstraintRequest {
    /// Create a request for a root resource
    pub fn new(
        data: Value,
        root_data: Value,
        key: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            data,
            root_data,
            expression: expression.into(),
            key: key.into(),
            parent_path: String::new(),
            human: String::new(),
            source: None,
            severity: None,
        }
    }

    /// Set the parent path
    pub fn with_parent_path(mut self, parent_path: impl Into<String>) -> Self {
        self.parent_path = parent_path.into();
        self
    }

    /// Set the human-readable description
    pub fn with_human(mut self, human: impl Into<String>) -> Self {
        self.human = human.into();
        self
    }

    /// Set the rule source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Whether `data` is the document root
    pub fn is_root(&self) -> bool {
        self.parent_path.is_empty()
    }

    /// Whether `data` carries its own type discriminator
    pub fn has_discriminator(&self) -> bool {
        resource_type(&self.data).is_some()
    }
}

/// How a result reads once evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The constraint holds
    Pass,
    /// The constraint does not hold
    Fail,
    /// The engine produced no value
    Absent,
    /// The request failed and was isolated
    Error,
}

/// Outcome of one constraint request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// First value returned by the engine; absent when it returned nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub key: String,
    pub path: String,
    pub human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Engine failure message when failures are isolated per request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConstraintResult {
    /// Build a result for `request` carrying `outcome`
    pub fn from_request(request: &ConstraintRequest, outcome: Option<Value>) -> Self {
        Self {
            result: outcome,
            key: request.key.clone(),
            path: request.parent_path.clone(),
            human: request.human.clone(),
            source: request.source.clone(),
            severity: request.severity.clone(),
            error: None,
        }
    }

    /// Build an isolated failure for `request`
    pub fn failed(request: &ConstraintRequest, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::from_request(request, None)
        }
    }

    /// Boolean outcome, if the engine returned a boolean
    pub fn passed(&self) -> Option<bool> {
        self.result.as_ref().and_then(Value::as_bool)
    }

    /// Classify the outcome
    ///
    /// Only an empty engine output is absent. Any other non-boolean value,
    /// `null` included, counts as a pass, as it does when FHIRPath evaluates
    /// a singleton in a boolean context.
    pub fn verdict(&self) -> Verdict {
        if self.error.is_some() {
            return Verdict::Error;
        }
        match &self.result {
            None => Verdict::Absent,
            Some(Value::Bool(true)) => Verdict::Pass,
            Some(Value::Bool(false)) => Verdict::Fail,
            Some(_) => Verdict::Pass,
        }
    }
}

/// Parse a JSON batch of constraint requests
///
/// Fails before anything is evaluated when the input is not well-formed,
/// is not an array, or an entry misses a required field.
pub fn parse_batch(input: &str) -> Result<Vec<ConstraintRequest>> {
    let value: Value = serde_json::from_str(input).map_err(|e| {
        InvariantError::parse(INV0001, format!("Malformed batch JSON: {}", e))
            .with_context(format!("line {} column {}", e.line(), e.column()))
    })?;
    batch_from_value(value)
}

/// Convert an already-parsed JSON value into a batch
pub fn batch_from_value(value: Value) -> Result<Vec<ConstraintRequest>> {
    let Value::Array(items) = value else {
        return Err(InvariantError::parse(
            INV0002,
            format!("Expected a JSON array of constraint requests, found {}", kind_of(&value)),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                InvariantError::parse(INV0003, format!("Invalid constraint request {}: {}", index, e))
            })
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
