//! Constraint collection
//!
//! Walks a resource alongside its StructureDefinition snapshot and emits one
//! [`ConstraintRequest`] per applicable constraint per fragment. Backbone
//! elements are followed inside the same definition; data types are followed
//! through their own definition; nested resources are left alone.

use crate::constraint::{ConstraintRequest, DISCRIMINATOR, resource_type};
use crate::registry::DefinitionRegistry;
use crate::structure_definition::{
    ElementConstraint, ElementDefinition, StructureDefinition, StructureKind,
};
use log::debug;
use octofhir_invariant_diagnostics::{INV0300, INV0302, InvariantError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Keys skipped by default: element presence and narrative checks
pub const DEFAULT_EXCLUDED_KEYS: [&str; 3] = ["ele-1", "txt-1", "txt-2"];

/// Collection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    #[error("Resource has no resourceType")]
    MissingResourceType,

    #[error("No StructureDefinition registered for '{0}'")]
    UnknownResourceType(String),
}

impl From<CollectError> for InvariantError {
    fn from(err: CollectError) -> Self {
        let message = err.to_string();
        match err {
            CollectError::MissingResourceType => InvariantError::model(INV0302, message),
            CollectError::UnknownResourceType(rt) => InvariantError::model_for(INV0300, message, rt),
        }
    }
}

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Constraint keys never collected
    pub excluded_keys: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            excluded_keys: DEFAULT_EXCLUDED_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl CollectorConfig {
    /// Exclude one more key
    pub fn with_excluded_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.is_excluded(&key) {
            self.excluded_keys.push(key);
        }
        self
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded_keys.iter().any(|k| k == key)
    }
}

/// Builds constraint batches from resources
#[derive(Debug, Clone)]
pub struct ConstraintCollector {
    registry: DefinitionRegistry,
    config: CollectorConfig,
}

impl ConstraintCollector {
    /// Create a collector with the default configuration
    pub fn new(registry: DefinitionRegistry) -> Self {
        Self::with_config(registry, CollectorConfig::default())
    }

    pub fn with_config(registry: DefinitionRegistry, config: CollectorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every constraint that applies to `resource`
    ///
    /// The root contributes requests with an empty `parentPath`; nested
    /// fragments carry their dotted element path without indexes.
    pub fn collect(&self, resource: &Value) -> Result<Vec<ConstraintRequest>, CollectError> {
        let resource_type = resource_type(resource).ok_or(CollectError::MissingResourceType)?;
        let definition = self
            .registry
            .get(resource_type)
            .ok_or_else(|| CollectError::UnknownResourceType(resource_type.to_string()))?;

        let mut walk = Walk {
            collector: self,
            root: resource,
            requests: Vec::new(),
        };
        walk.visit(resource, &definition, &definition.type_name, "", &[]);

        debug!(
            "Collected {} constraint requests for {}",
            walk.requests.len(),
            resource_type
        );
        Ok(walk.requests)
    }
}

/// Where a field's children are defined
enum Child {
    /// Inline element of the current definition
    Backbone { element_path: String },
    /// Data type with its own definition, plus constraints declared on the
    /// referencing element
    Typed {
        definition: Arc<StructureDefinition>,
        constraints: Vec<ElementConstraint>,
    },
}

struct Walk<'a> {
    collector: &'a ConstraintCollector,
    root: &'a Value,
    requests: Vec<ConstraintRequest>,
}

impl Walk<'_> {
    fn visit(
        &mut self,
        node: &Value,
        definition: &StructureDefinition,
        element_path: &str,
        parent_path: &str,
        inherited: &[ElementConstraint],
    ) {
        let Some(fields) = node.as_object() else {
            return;
        };

        self.push_constraints(node, definition.element(element_path), parent_path, inherited);

        let location = if parent_path.is_empty() {
            definition.type_name.as_str()
        } else {
            parent_path
        };

        for (field, value) in fields {
            if field == DISCRIMINATOR || field.starts_with('_') {
                continue;
            }
            let Some(child) = self.resolve(definition, element_path, field) else {
                continue;
            };
            let child_path = format!("{}.{}", location, field);

            let items = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            };
            for item in items.into_iter().filter(|item| item.is_object()) {
                match &child {
                    Child::Backbone { element_path } => {
                        self.visit(item, definition, element_path, &child_path, &[]);
                    }
                    Child::Typed {
                        definition: typed,
                        constraints,
                    } => {
                        let typed = self.extension_profile(item, typed);
                        self.visit(item, &typed, &typed.type_name, &child_path, constraints);
                    }
                }
            }
        }
    }

    fn push_constraints(
        &mut self,
        node: &Value,
        element: Option<&ElementDefinition>,
        parent_path: &str,
        inherited: &[ElementConstraint],
    ) {
        let config = &self.collector.config;
        let own = element.map(|e| e.constraint.as_slice()).unwrap_or(&[]);
        let mut seen = HashSet::new();

        for constraint in own.iter().chain(inherited) {
            if config.is_excluded(&constraint.key) || !seen.insert(constraint.key.as_str()) {
                continue;
            }
            let Some(expression) = constraint
                .expression
                .as_deref()
                .filter(|e| !e.trim().is_empty())
            else {
                debug!("Constraint {} has no expression, skipped", constraint.key);
                continue;
            };

            let mut request = ConstraintRequest::new(
                node.clone(),
                self.root.clone(),
                &constraint.key,
                expression,
            )
            .with_parent_path(parent_path)
            .with_human(&constraint.human);
            if let Some(source) = &constraint.source {
                request = request.with_source(source);
            }
            if let Some(severity) = &constraint.severity {
                request = request.with_severity(severity);
            }
            self.requests.push(request);
        }
    }

    fn resolve(&self, definition: &StructureDefinition, element_path: &str, field: &str) -> Option<Child> {
        let path = format!("{}.{}", element_path, field);
        let (element, type_code) = match definition.element(&path) {
            Some(element) => (element, element.type_code().map(str::to_string)),
            None => {
                let (element, code) = choice_element(definition, element_path, field)?;
                (element, Some(code))
            }
        };

        if let Some((_, target)) = element
            .content_reference
            .as_deref()
            .and_then(|r| r.rsplit_once('#'))
        {
            return Some(Child::Backbone {
                element_path: target.to_string(),
            });
        }
        if !element.is_choice() && definition.has_children(&element.path) {
            return Some(Child::Backbone {
                element_path: element.path.clone(),
            });
        }

        let code = type_code?;
        let Some(typed) = self.collector.registry.get(&code) else {
            if !code.contains('/') {
                debug!("No definition for type '{}' at {}, skipped", code, path);
            }
            return None;
        };
        match typed.kind {
            StructureKind::ComplexType => Some(Child::Typed {
                definition: typed,
                constraints: element.constraint.clone(),
            }),
            _ => None,
        }
    }

    /// Prefer a registered Extension profile matching the item's url
    fn extension_profile(&self, item: &Value, typed: &Arc<StructureDefinition>) -> Arc<StructureDefinition> {
        if typed.type_name != "Extension" {
            return Arc::clone(typed);
        }
        item.get("url")
            .and_then(Value::as_str)
            .and_then(|url| self.collector.registry.get(url))
            .filter(|profile| profile.is_extension_profile())
            .unwrap_or_else(|| Arc::clone(typed))
    }
}

/// Match `valueQuantity` against `Observation.value[x]`
fn choice_element<'d>(
    definition: &'d StructureDefinition,
    element_path: &str,
    field: &str,
) -> Option<(&'d ElementDefinition, String)> {
    definition
        .elements()
        .iter()
        .filter(|e| e.is_choice())
        .find_map(|e| {
            let name = e
                .path
                .strip_prefix(element_path)?
                .strip_prefix('.')?
                .strip_suffix("[x]")?;
            if name.contains('.') {
                return None;
            }
            let suffix = field.strip_prefix(name)?;
            e.types
                .iter()
                .find(|t| upper_first(&t.code) == suffix)
                .map(|t| (e, t.code.clone()))
        })
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_first() {
        assert_eq!(upper_first("dateTime"), "DateTime");
        assert_eq!(upper_first("Quantity"), "Quantity");
        assert_eq!(upper_first(""), "");
    }

    #[test]
    fn test_default_exclusions() {
        let config = CollectorConfig::default();

        assert!(config.is_excluded("ele-1"));
        assert!(config.is_excluded("txt-2"));
        assert!(!config.is_excluded("dom-3"));
    }

    #[test]
    fn test_with_excluded_key_is_idempotent() {
        let config = CollectorConfig::default()
            .with_excluded_key("dom-6")
            .with_excluded_key("dom-6");

        assert_eq!(config.excluded_keys.len(), 4);
    }

    #[test]
    fn test_collect_error_codes() {
        let err: InvariantError = CollectError::UnknownResourceType("Foo".into()).into();
        assert_eq!(err.code(), INV0300);

        let err: InvariantError = CollectError::MissingResourceType.into();
        assert_eq!(err.code(), INV0302);
    }
}
