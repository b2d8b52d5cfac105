//! OperationOutcome rendering
//!
//! Turns a result list into a FHIR `OperationOutcome`. Passing constraints
//! produce nothing; an outcome without issues carries a single informational
//! "Validation successful" issue.

use crate::trace::TraceRecord;
use octofhir_invariant_model::{ConstraintResult, Verdict};
use serde::{Deserialize, Serialize};

/// Key whose failures are informational only
const INFORMATIONAL_KEY: &str = "dom-6";

/// Key whose diagnostics list unreferenced contained ids
const CONTAINED_REFERENCE_KEY: &str = "dom-3";

/// A FHIR OperationOutcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    pub issue: Vec<Issue>,
}

/// `OperationOutcome.issue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<IssueDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<String>,
}

/// `OperationOutcome.issue.details` (text only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub text: String,
}

impl OperationOutcome {
    /// Whether any issue is an error or fatal
    pub fn has_errors(&self) -> bool {
        self.issue
            .iter()
            .any(|i| i.severity == "error" || i.severity == "fatal")
    }

    /// Issues with the given severity
    pub fn count(&self, severity: &str) -> usize {
        self.issue.iter().filter(|i| i.severity == severity).count()
    }
}

/// Builds an [`OperationOutcome`] from evaluation results
#[derive(Debug, Clone, Default)]
pub struct OutcomeBuilder {
    treat_absent_as_failure: bool,
    traces: Vec<TraceRecord>,
}

impl OutcomeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report constraints that produced no value as failures
    pub fn treat_absent_as_failure(mut self, yes: bool) -> Self {
        self.treat_absent_as_failure = yes;
        self
    }

    /// Traces collected while evaluating the same batch
    pub fn with_traces(mut self, traces: Vec<TraceRecord>) -> Self {
        self.traces = traces;
        self
    }

    pub fn build(&self, results: &[ConstraintResult]) -> OperationOutcome {
        let mut issues = Vec::new();

        for (index, result) in results.iter().enumerate() {
            match result.verdict() {
                Verdict::Pass => {}
                Verdict::Absent if !self.treat_absent_as_failure => {}
                Verdict::Fail | Verdict::Absent => issues.push(self.failure(index, result)),
                Verdict::Error => issues.push(Issue {
                    severity: "fatal".to_string(),
                    code: "exception".to_string(),
                    details: details(result),
                    diagnostics: Some(format!(
                        "Could not evaluate constraint '{}': {}",
                        result.key,
                        result.error.as_deref().unwrap_or_default()
                    )),
                    expression: expression(result),
                }),
            }
        }

        if issues.is_empty() {
            issues.push(Issue {
                severity: "information".to_string(),
                code: "informational".to_string(),
                details: None,
                diagnostics: Some("Validation successful".to_string()),
                expression: Vec::new(),
            });
        }

        OperationOutcome {
            resource_type: "OperationOutcome".to_string(),
            issue: issues,
        }
    }

    fn failure(&self, index: usize, result: &ConstraintResult) -> Issue {
        let mut diagnostics = format!("Failed constraint '{}'", result.key);
        if let Some(source) = result.source.as_deref().filter(|s| !s.is_empty()) {
            diagnostics.push_str(&format!(" (source: {})", source));
        }
        if result.key == CONTAINED_REFERENCE_KEY {
            let ids: Vec<String> = self
                .traces
                .iter()
                .filter(|t| t.index == index && t.label == crate::trace::UNMATCHED_LABEL)
                .flat_map(TraceRecord::value_strings)
                .collect();
            if !ids.is_empty() {
                diagnostics.push_str(&format!("; unreferenced contained ids: {}", ids.join(", ")));
            }
        }

        let code = if result.key == INFORMATIONAL_KEY {
            "informational"
        } else {
            "invariant"
        };

        Issue {
            severity: severity(result.severity.as_deref()),
            code: code.to_string(),
            details: details(result),
            diagnostics: Some(diagnostics),
            expression: expression(result),
        }
    }
}

fn severity(declared: Option<&str>) -> String {
    let severity = match declared.map(str::to_ascii_lowercase).as_deref() {
        Some("warning") => "warning",
        Some("information") | Some("info") => "information",
        Some("fatal") => "fatal",
        _ => "error",
    };
    severity.to_string()
}

fn details(result: &ConstraintResult) -> Option<IssueDetails> {
    if result.human.is_empty() {
        return None;
    }
    Some(IssueDetails {
        text: format!("{}: {}", result.key, result.human),
    })
}

fn expression(result: &ConstraintResult) -> Vec<String> {
    if result.path.is_empty() {
        Vec::new()
    } else {
        vec![result.path.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn result(key: &str, outcome: Option<Value>) -> ConstraintResult {
        ConstraintResult {
            result: outcome,
            key: key.to_string(),
            path: String::new(),
            human: format!("{} must hold", key),
            source: None,
            severity: None,
            error: None,
        }
    }

    #[test]
    fn test_all_passing_is_successful() {
        let outcome = OutcomeBuilder::new().build(&[result("dom-2", Some(json!(true)))]);

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "resourceType": "OperationOutcome",
                "issue": [{
                    "severity": "information",
                    "code": "informational",
                    "diagnostics": "Validation successful"
                }]
            })
        );
        assert!(!outcome.has_errors());
    }

    #[test]
    fn test_failure_issue() {
        let mut failed = result("pat-1", Some(json!(false)));
        failed.path = "Patient.contact".to_string();
        failed.source = Some("http://hl7.org/fhir/StructureDefinition/Patient".to_string());

        let outcome = OutcomeBuilder::new().build(&[failed]);

        assert_eq!(
            serde_json::to_value(&outcome.issue[0]).unwrap(),
            json!({
                "severity": "error",
                "code": "invariant",
                "details": {"text": "pat-1: pat-1 must hold"},
                "diagnostics": "Failed constraint 'pat-1' (source: http://hl7.org/fhir/StructureDefinition/Patient)",
                "expression": ["Patient.contact"]
            })
        );
        assert!(outcome.has_errors());
    }

    #[test]
    fn test_dom_6_is_informational_warning() {
        let mut failed = result("dom-6", Some(json!(false)));
        failed.severity = Some("warning".to_string());

        let outcome = OutcomeBuilder::new().build(&[failed]);

        assert_eq!(outcome.issue[0].code, "informational");
        assert_eq!(outcome.issue[0].severity, "warning");
        assert!(!outcome.has_errors());
    }

    #[test]
    fn test_absent_outcomes() {
        let results = [result("txt-x", None)];

        let lenient = OutcomeBuilder::new().build(&results);
        assert_eq!(lenient.count("information"), 1);

        let strict = OutcomeBuilder::new()
            .treat_absent_as_failure(true)
            .build(&results);
        assert_eq!(strict.count("error"), 1);
    }

    #[test]
    fn test_isolated_error_is_fatal() {
        let mut failed = result("pat-1", None);
        failed.error = Some("Unexpected token".to_string());

        let outcome = OutcomeBuilder::new().build(&[failed]);

        assert_eq!(outcome.issue[0].severity, "fatal");
        assert_eq!(outcome.issue[0].code, "exception");
        assert_eq!(
            outcome.issue[0].diagnostics.as_deref(),
            Some("Could not evaluate constraint 'pat-1': Unexpected token")
        );
    }

    #[test]
    fn test_unmatched_ids_are_listed() {
        let traces = vec![
            TraceRecord {
                index: 1,
                key: "dom-3".to_string(),
                path: String::new(),
                label: "unmatched".to_string(),
                values: vec![json!("o1"), json!("o2")],
            },
            TraceRecord {
                index: 0,
                key: "dom-2".to_string(),
                path: String::new(),
                label: "unmatched".to_string(),
                values: vec![json!("ignored")],
            },
        ];
        let results = [
            result("dom-2", Some(json!(true))),
            result("dom-3", Some(json!(false))),
        ];

        let outcome = OutcomeBuilder::new().with_traces(traces).build(&results);

        assert_eq!(outcome.issue.len(), 1);
        assert_eq!(
            outcome.issue[0].diagnostics.as_deref(),
            Some("Failed constraint 'dom-3'; unreferenced contained ids: o1, o2")
        );
    }
}
