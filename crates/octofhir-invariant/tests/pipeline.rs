//! End-to-end pipeline tests
//!
//! Loads definitions and a resource from disk, collects the constraint batch
//! and renders the outcome against a scripted engine.

mod common;

use common::*;
use octofhir_invariant::cli::collect::collect_requests;
use octofhir_invariant::cli::evaluate::run;
use octofhir_invariant::cli::resolver::{BatchSource, load_registry, load_resource};
use octofhir_invariant::cli::validate::check;
use octofhir_invariant::eval::EngineError;
use octofhir_invariant::{
    BatchEvaluator, CollectingTraceObserver, EvaluatorConfig, FailurePolicy, OutcomeBuilder,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

fn constraint(key: &str, severity: &str, expression: &str) -> Value {
    json!({
        "key": key,
        "severity": severity,
        "human": format!("{} holds", key),
        "expression": expression,
        "source": "http://hl7.org/fhir/StructureDefinition/Patient"
    })
}

fn definitions_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {"resource": {
                "resourceType": "StructureDefinition",
                "id": "Patient",
                "kind": "resource",
                "type": "Patient",
                "snapshot": {"element": [
                    {"path": "Patient", "constraint": [
                        constraint("dom-3", "error", "contained.where((('#'+id in (%resource.descendants().reference | %resource.descendants().as(canonical))) or descendants().where(reference = '#').exists()).not()).trace('unmatched', id).empty()"),
                        constraint("dom-6", "warning", "text.`div`.exists()")
                    ]},
                    {"path": "Patient.contained", "type": [{"code": "Resource"}]},
                    {"path": "Patient.contact", "type": [{"code": "BackboneElement"}], "constraint": [
                        constraint("pat-1", "error", "name.exists() or telecom.exists()")
                    ]},
                    {"path": "Patient.contact.gender", "type": [{"code": "code"}]}
                ]}
            }},
            {"resource": {"resourceType": "SearchParameter", "id": "ignored"}}
        ]
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "contained": [{"resourceType": "Organization", "id": "o1"}],
        "contact": [{"gender": "female"}, {"name": {"family": "Chalmers"}}]
    })
}

struct Workspace {
    _dir: tempfile::TempDir,
    definitions: PathBuf,
    resource: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let definitions = write_json(dir.path(), "profiles-resources.json", &definitions_bundle());
    let resource = write_json(dir.path(), "patient.json", &patient());
    Workspace {
        _dir: dir,
        definitions,
        resource,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_collect_from_disk() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();

    let requests = collect_requests(registry, &[], &resource).unwrap();

    let collected: Vec<_> = requests
        .iter()
        .map(|r| (r.key.as_str(), r.parent_path.as_str()))
        .collect();
    assert_eq!(
        collected,
        vec![
            ("dom-3", ""),
            ("dom-6", ""),
            ("pat-1", "Patient.contact"),
            ("pat-1", "Patient.contact"),
        ]
    );
}

#[test]
fn test_extra_excluded_key() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();

    let requests = collect_requests(registry, &["dom-6".to_string()], &resource).unwrap();

    assert!(requests.iter().all(|r| r.key != "dom-6"));
}

#[test]
fn test_validate_reports_failures() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();
    let requests = collect_requests(registry, &[], &resource).unwrap();

    let engine = KeyedEngine::new()
        .answer("dom-3", vec![json!(false)])
        .trace("dom-3", "unmatched", vec![json!("o1")])
        .answer("dom-6", vec![json!(false)]);
    let observer = Arc::new(CollectingTraceObserver::new());
    let evaluator = BatchEvaluator::new(engine.clone(), EvaluatorConfig::default())
        .with_trace_observer(observer.clone());

    let outcome = check(&evaluator, &requests, OutcomeBuilder::new(), &observer).unwrap();

    let summary: Vec<_> = outcome
        .issue
        .iter()
        .map(|i| (i.severity.as_str(), i.code.as_str()))
        .collect();
    assert_eq!(summary, vec![("error", "invariant"), ("warning", "informational")]);
    assert_eq!(
        outcome.issue[0].diagnostics.as_deref(),
        Some("Failed constraint 'dom-3' (source: http://hl7.org/fhir/StructureDefinition/Patient); unreferenced contained ids: o1")
    );
    assert!(outcome.has_errors());
    assert_eq!(engine.seen().len(), 4);
}

#[test]
fn test_validate_successful() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();
    let requests = collect_requests(registry, &[], &resource).unwrap();
    let observer = CollectingTraceObserver::new();
    let evaluator = BatchEvaluator::new(KeyedEngine::new(), EvaluatorConfig::default());

    let outcome = check(&evaluator, &requests, OutcomeBuilder::new(), &observer).unwrap();

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
}

#[test]
fn test_isolated_failure_in_outcome() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();
    let requests = collect_requests(registry, &[], &resource).unwrap();
    let engine = KeyedEngine::new().fail("pat-1", EngineError::rejected("Unexpected token"));
    let evaluator = BatchEvaluator::new(
        engine,
        EvaluatorConfig::default().with_failure_policy(FailurePolicy::Isolate),
    );

    let outcome = check(
        &evaluator,
        &requests,
        OutcomeBuilder::new(),
        &CollectingTraceObserver::new(),
    )
    .unwrap();

    assert_eq!(outcome.count("fatal"), 2);
    assert_eq!(outcome.issue[0].expression, vec!["Patient.contact".to_string()]);
}

#[test]
fn test_evaluate_collected_batch_file() {
    let ws = workspace();
    let registry = load_registry(&[ws.definitions.clone()]).unwrap();
    let resource = load_resource(&ws.resource).unwrap();
    let requests = collect_requests(registry, &[], &resource).unwrap();
    let batch = write_json(
        ws.definitions.parent().unwrap(),
        "batch.json",
        &serde_json::to_value(&requests).unwrap(),
    );

    let loaded = BatchSource::File(batch).load().unwrap();
    let evaluator = BatchEvaluator::new(KeyedEngine::new(), EvaluatorConfig::default());
    let mut echo = Vec::new();
    let results = run(&evaluator, &loaded, &mut echo).unwrap();

    assert_eq!(loaded, requests);
    assert_eq!(results.len(), 4);
    assert_eq!(
        String::from_utf8(echo).unwrap().lines().collect::<Vec<_>>(),
        vec![
            "parentPath: ",
            "parentPath: ",
            "parentPath: Patient.contact",
            "parentPath: Patient.contact"
        ]
    );
}
