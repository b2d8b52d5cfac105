//! FHIR fixtures

use octofhir_invariant_model::ConstraintRequest;
use serde_json::{Value, json};

pub fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "example",
        "identifier": [{"system": "urn:oid:1.2.36.146.595.217.0.1", "value": "12345"}],
        "text": {"status": "generated", "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\">Peter</div>"}
    })
}

pub fn patient_with_contained() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "example",
        "contained": [{"resourceType": "Organization", "id": "o1", "name": "Clinic"}],
        "managingOrganization": {"reference": "#o1"}
    })
}

/// Root-level request against the patient itself
pub fn root_request(resource: &Value, key: &str, expression: &str) -> ConstraintRequest {
    ConstraintRequest::new(resource.clone(), resource.clone(), key, expression)
        .with_human(format!("{} holds", key))
}

/// Request against an element embedded in `root`
pub fn embedded_request(
    root: &Value,
    path: &str,
    data: Value,
    key: &str,
    expression: &str,
) -> ConstraintRequest {
    ConstraintRequest::new(data, root.clone(), key, expression)
        .with_parent_path(path)
        .with_human(format!("{} holds", key))
}
