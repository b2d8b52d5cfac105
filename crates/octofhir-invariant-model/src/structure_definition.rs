//! StructureDefinition subset needed to find constraints
//!
//! Only the snapshot is read. Differential-only profiles carry no full
//! element tree and contribute nothing.

use serde::{Deserialize, Serialize};

/// `StructureDefinition.kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureKind {
    PrimitiveType,
    #[default]
    ComplexType,
    Resource,
    Logical,
}

/// A FHIR StructureDefinition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    pub resource_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: StructureKind,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    /// Type constrained by this definition
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
}

/// `StructureDefinition.snapshot`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

/// `ElementDefinition`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    #[serde(default)]
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ElementType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint: Vec<ElementConstraint>,
    /// `#Path` of an element whose definition is reused here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_reference: Option<String>,
}

/// `ElementDefinition.type`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementType {
    pub code: String,
}

/// `ElementDefinition.constraint`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementConstraint {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StructureDefinition {
    /// Snapshot elements, empty without a snapshot
    pub fn elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|s| s.element.as_slice())
            .unwrap_or(&[])
    }

    /// Find the element with exactly this path
    pub fn element(&self, path: &str) -> Option<&ElementDefinition> {
        self.elements().iter().find(|e| e.path == path)
    }

    /// Root element (path equals the constrained type)
    pub fn root_element(&self) -> Option<&ElementDefinition> {
        self.element(&self.type_name)
    }

    /// Whether any element is nested directly below `path`
    pub fn has_children(&self, path: &str) -> bool {
        self.elements().iter().any(|e| {
            e.path
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Extension profiles are looked up by canonical url rather than id
    pub fn is_extension_profile(&self) -> bool {
        self.type_name == "Extension" && self.id != "Extension" && !self.url.is_empty()
    }

    /// Registry key for this definition
    pub fn registry_key(&self) -> &str {
        if self.is_extension_profile() {
            &self.url
        } else {
            &self.id
        }
    }
}

impl ElementDefinition {
    /// Whether the path ends in a choice marker
    pub fn is_choice(&self) -> bool {
        self.path.ends_with("[x]")
    }

    /// First declared type code
    pub fn type_code(&self) -> Option<&str> {
        self.types.first().map(|t| t.code.as_str())
    }
}
