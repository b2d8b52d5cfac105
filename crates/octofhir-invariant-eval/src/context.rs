//! Expression context resolution
//!
//! A fragment embedded in a larger resource has no type of its own as far as
//! the engine is concerned, so it is sent with its element path as the base.
//! The root resource is sent as bare text.

use crate::classify::ConstraintKind;
use log::warn;
use octofhir_invariant_model::ConstraintRequest;
use serde::Serialize;
use serde_json::Value;

/// Expression as handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExpressionInput<'a> {
    /// Bare FHIRPath text
    Text(&'a str),
    /// Text evaluated relative to the element at `base`
    Directive { base: &'a str, expression: &'a str },
}

impl<'a> ExpressionInput<'a> {
    pub fn expression(&self) -> &'a str {
        match *self {
            ExpressionInput::Text(expression) => expression,
            ExpressionInput::Directive { expression, .. } => expression,
        }
    }

    pub fn base(&self) -> Option<&'a str> {
        match *self {
            ExpressionInput::Text(_) => None,
            ExpressionInput::Directive { base, .. } => Some(base),
        }
    }
}

/// Environment binding for the whole resource
///
/// Serializes as `{"resource": ...}` or `{"rootResource": ...}`, never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BindingContext<'a> {
    /// Visible as `%resource`
    #[serde(rename = "resource")]
    ByResource(&'a Value),
    /// Visible as `%rootResource`
    #[serde(rename = "rootResource")]
    ByRootResource(&'a Value),
}

impl<'a> BindingContext<'a> {
    /// Variable name the binding is exposed under
    pub fn variable(&self) -> &'static str {
        match self {
            BindingContext::ByResource(_) => "resource",
            BindingContext::ByRootResource(_) => "rootResource",
        }
    }

    pub fn value(&self) -> &'a Value {
        match *self {
            BindingContext::ByResource(value) | BindingContext::ByRootResource(value) => value,
        }
    }
}

/// Expression shape and binding chosen for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedExpression<'a> {
    pub input: ExpressionInput<'a>,
    pub context: BindingContext<'a>,
}

/// Choose the expression shape and binding for `request`
pub fn resolve(request: &ConstraintRequest, kind: ConstraintKind) -> ResolvedExpression<'_> {
    let expression = kind.dispatched_expression(&request.expression);

    let input = if request.is_root() {
        if !request.has_discriminator() {
            warn!(
                "Constraint '{}' targets a root fragment without resourceType; sending bare text",
                request.key
            );
        }
        ExpressionInput::Text(expression)
    } else {
        ExpressionInput::Directive {
            base: &request.parent_path,
            expression,
        }
    };

    let context = if kind.binds_resource() {
        BindingContext::ByResource(&request.root_data)
    } else {
        BindingContext::ByRootResource(&request.root_data)
    };

    ResolvedExpression { input, context }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CONTAINED_REFERENCE_TEMPLATE;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn patient() -> Value {
        json!({"resourceType": "Patient", "text": {"status": "generated", "div": "<div/>"}})
    }

    #[test]
    fn test_root_is_bare_text_with_root_resource() {
        let request = ConstraintRequest::new(patient(), patient(), "pat-x", "identifier.exists()");
        let resolved = resolve(&request, ConstraintKind::Standard);

        assert_eq!(resolved.input, ExpressionInput::Text("identifier.exists()"));
        assert_eq!(resolved.context.variable(), "rootResource");
        assert_eq!(resolved.context.value(), &patient());
    }

    #[test]
    fn test_embedded_fragment_uses_directive() {
        let text = json!({"status": "generated", "div": "<div/>"});
        let request = ConstraintRequest::new(text, patient(), "txt-x", "children().count()")
            .with_parent_path("Patient.text");
        let resolved = resolve(&request, ConstraintKind::Standard);

        assert_eq!(
            resolved.input,
            ExpressionInput::Directive {
                base: "Patient.text",
                expression: "children().count()"
            }
        );
        assert_eq!(resolved.input.base(), Some("Patient.text"));
    }

    #[test]
    fn test_embedded_resource_still_uses_directive() {
        let contained = json!({"resourceType": "Organization", "id": "o1"});
        let request = ConstraintRequest::new(contained, patient(), "org-1", "name.exists()")
            .with_parent_path("Patient.contained");
        let resolved = resolve(&request, ConstraintKind::Standard);

        assert_eq!(resolved.input.base(), Some("Patient.contained"));
    }

    #[test]
    fn test_root_without_discriminator_is_bare_text() {
        let request = ConstraintRequest::new(json!({"a": 1}), json!({"a": 1}), "k", "a.exists()");
        let resolved = resolve(&request, ConstraintKind::Standard);

        assert_eq!(resolved.input, ExpressionInput::Text("a.exists()"));
    }

    #[test]
    fn test_contained_check_binds_resource() {
        let request = ConstraintRequest::new(patient(), patient(), "dom-3", "contained.where(x)");
        let resolved = resolve(&request, ConstraintKind::ContainedReferenceCheck);

        assert_eq!(resolved.input.expression(), CONTAINED_REFERENCE_TEMPLATE);
        assert_eq!(resolved.context.variable(), "resource");
    }

    #[test]
    fn test_wire_shapes() {
        let root = patient();
        let directive = ExpressionInput::Directive {
            base: "Patient.text",
            expression: "div.exists()",
        };

        assert_eq!(
            serde_json::to_value(directive).unwrap(),
            json!({"base": "Patient.text", "expression": "div.exists()"})
        );
        assert_eq!(
            serde_json::to_value(ExpressionInput::Text("a")).unwrap(),
            json!("a")
        );
        assert_eq!(
            serde_json::to_value(BindingContext::ByRootResource(&root)).unwrap(),
            json!({"rootResource": root.clone()})
        );
        assert_eq!(
            serde_json::to_value(BindingContext::ByResource(&root)).unwrap(),
            json!({"resource": root.clone()})
        );
    }
}
