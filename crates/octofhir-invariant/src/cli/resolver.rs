//! Input resolution: batches, resources and definition registries

use anyhow::{Context, Result, bail};
use log::{debug, info};
use octofhir_invariant_model::{ConstraintRequest, DefinitionRegistry, parse_batch};
use serde_json::Value;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

/// Where a batch comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// JSON text given on the command line
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl BatchSource {
    /// The inline argument wins over `--input`; stdin is the fallback
    pub fn select(inline: Option<String>, input: Option<PathBuf>) -> Self {
        match (inline, input) {
            (Some(text), _) => Self::Inline(text),
            (None, Some(path)) => Self::File(path),
            (None, None) => Self::Stdin,
        }
    }

    /// Read the raw batch text
    pub fn read(&self) -> Result<String> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read batch file: {}", path.display())),
            Self::Stdin => {
                let mut stdin = io::stdin();
                if stdin.is_terminal() {
                    bail!("No batch given: pass it as an argument, with --input, or on stdin");
                }
                let mut text = String::new();
                stdin
                    .read_to_string(&mut text)
                    .context("Failed to read batch from stdin")?;
                Ok(text)
            }
        }
    }

    /// Read and parse the batch
    pub fn load(&self) -> Result<Vec<ConstraintRequest>> {
        let text = self.read()?;
        let requests = parse_batch(&text).context("Failed to parse constraint batch")?;
        debug!("Loaded {} constraint requests", requests.len());
        Ok(requests)
    }
}

/// Load a resource instance from a JSON file
pub fn load_resource(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource file: {}", path.display()))?;
    let resource: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse resource file: {}", path.display()))?;
    if !resource.is_object() {
        bail!("Resource file is not a JSON object: {}", path.display());
    }
    Ok(resource)
}

/// Build a definition registry from files and directories
pub fn load_registry(paths: &[PathBuf]) -> Result<DefinitionRegistry> {
    if paths.is_empty() {
        bail!("No StructureDefinition sources given (use --definitions)");
    }
    let registry = DefinitionRegistry::from_paths(paths)
        .map_err(octofhir_invariant_diagnostics::InvariantError::from)
        .context("Failed to load StructureDefinitions")?;
    info!("Loaded {} StructureDefinitions", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_inline_wins() {
        let source = BatchSource::select(Some("[]".to_string()), Some(PathBuf::from("x.json")));
        assert_eq!(source, BatchSource::Inline("[]".to_string()));
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        let batch = json!([{
            "data": {"resourceType": "Patient"},
            "rootData": {"resourceType": "Patient"},
            "constraintExpression": "true",
            "constraintKey": "k"
        }]);
        fs::write(&path, batch.to_string()).unwrap();

        let requests = BatchSource::select(None, Some(path)).load().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].key, "k");
    }

    #[test]
    fn test_malformed_batch() {
        let err = BatchSource::Inline("[{".to_string()).load().unwrap_err();
        assert!(format!("{:#}", err).contains("INV0001"));
    }

    #[test]
    fn test_missing_file() {
        let err = BatchSource::File(PathBuf::from("/nonexistent/batch.json"))
            .read()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read batch file"));
    }

    #[test]
    fn test_resource_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert!(load_resource(&path).is_err());
    }

    #[test]
    fn test_registry_needs_sources() {
        assert!(load_registry(&[]).is_err());
    }
}
