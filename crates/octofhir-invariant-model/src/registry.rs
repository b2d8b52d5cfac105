//! StructureDefinition registry
//!
//! Definitions are keyed by id, except Extension profiles which are keyed by
//! canonical url so that `extension.url` resolves to them directly.

use crate::structure_definition::StructureDefinition;
use indexmap::IndexMap;
use log::{debug, info};
use octofhir_invariant_diagnostics::{INV0004, INV0301, INV0302, INV0401, InvariantError};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Registry loading errors
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed JSON in {source_name}: {message}")]
    Json {
        source_name: String,
        message: String,
    },

    #[error("Missing resourceType in {0}")]
    MissingResourceType(String),

    #[error("Invalid StructureDefinition '{id}': {message}")]
    InvalidDefinition { id: String, message: String },
}

impl From<RegistryError> for InvariantError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::Io { .. } => InvariantError::system(INV0401, message),
            RegistryError::Json { .. } => InvariantError::parse(INV0004, message),
            RegistryError::MissingResourceType(_) => InvariantError::model(INV0302, message),
            RegistryError::InvalidDefinition { id, .. } => {
                InvariantError::model_for(INV0301, message, id)
            }
        }
    }
}

/// Thread-safe registry of StructureDefinitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: Arc<RwLock<IndexMap<String, Arc<StructureDefinition>>>>,
}

impl DefinitionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from files and directories
    pub fn from_paths<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for path in paths {
            registry.load_path(path)?;
        }
        Ok(registry)
    }

    /// Register a definition, replacing any previous one with the same key
    pub fn register(&self, definition: StructureDefinition) -> String {
        let key = definition.registry_key().to_string();
        debug!("Registering StructureDefinition '{}'", key);
        self.definitions
            .write()
            .insert(key.clone(), Arc::new(definition));
        key
    }

    /// Look up a definition by id or Extension url
    pub fn get(&self, key: &str) -> Option<Arc<StructureDefinition>> {
        self.definitions.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Registered keys in load order
    pub fn keys(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }

    /// Load definitions from a JSON document
    ///
    /// Accepts a single StructureDefinition or a Bundle of them. Other
    /// resource types are skipped. Returns how many definitions were added.
    pub fn load_json(&self, json: &str, source_name: &str) -> Result<usize, RegistryError> {
        let value: Value = serde_json::from_str(json).map_err(|e| RegistryError::Json {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        self.load_value(value, source_name)
    }

    /// Load definitions from an already-parsed resource
    pub fn load_value(&self, value: Value, source_name: &str) -> Result<usize, RegistryError> {
        let resource_type = crate::constraint::resource_type(&value)
            .map(str::to_string)
            .ok_or_else(|| RegistryError::MissingResourceType(source_name.to_string()))?;

        match resource_type.as_str() {
            "StructureDefinition" => {
                let id = value
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let definition: StructureDefinition = serde_json::from_value(value)
                    .map_err(|e| RegistryError::InvalidDefinition {
                        id,
                        message: e.to_string(),
                    })?;
                self.register(definition);
                Ok(1)
            }
            "Bundle" => {
                let entries = match value.get("entry") {
                    Some(Value::Array(entries)) => entries.clone(),
                    _ => Vec::new(),
                };
                let mut count = 0;
                for entry in entries {
                    if let Some(resource) = entry.get("resource") {
                        if crate::constraint::resource_type(resource) == Some("StructureDefinition") {
                            count += self.load_value(resource.clone(), source_name)?;
                        }
                    }
                }
                Ok(count)
            }
            other => {
                debug!("Skipping {} in {}", other, source_name);
                Ok(0)
            }
        }
    }

    /// Load definitions from a JSON file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.load_json(&json, &path.display().to_string())
    }

    /// Load every `.json` file in a directory, in file name order
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let dir = dir.as_ref();
        let io_error = |e: std::io::Error| RegistryError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();

        let mut count = 0;
        for file in &files {
            count += self.load_file(file)?;
        }
        info!(
            "Loaded {} StructureDefinitions from {} files in {}",
            count,
            files.len(),
            dir.display()
        );
        Ok(count)
    }

    /// Load a file or a directory
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let path = path.as_ref();
        if path.is_dir() {
            self.load_dir(path)
        } else {
            self.load_file(path)
        }
    }
}
