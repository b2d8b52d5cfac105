//! Collect command implementation

use super::output::{self, OutputFormat};
use super::resolver;
use anyhow::{Context, Result};
use log::info;
use octofhir_invariant_diagnostics::InvariantError;
use octofhir_invariant_model::{
    CollectorConfig, ConstraintCollector, ConstraintRequest, DefinitionRegistry,
};
use serde_json::Value;
use std::path::PathBuf;

/// Configuration for collect command
pub struct CollectConfig {
    pub resource: PathBuf,
    pub definitions: Vec<PathBuf>,
    /// Keys excluded in addition to the defaults
    pub excluded_keys: Vec<String>,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Print the batch that would be evaluated for a resource
pub fn collect(config: CollectConfig) -> Result<()> {
    let resource = resolver::load_resource(&config.resource)?;
    let registry = resolver::load_registry(&config.definitions)?;
    let requests = collect_requests(registry, &config.excluded_keys, &resource)?;

    let content = output::render(&requests, config.output_format, || {
        output::requests_table(&requests)
    })?;
    output::write_output(&content, config.output_file.as_deref())
}

/// Collect the constraints for `resource`
pub fn collect_requests(
    registry: DefinitionRegistry,
    excluded_keys: &[String],
    resource: &Value,
) -> Result<Vec<ConstraintRequest>> {
    let config = excluded_keys
        .iter()
        .fold(CollectorConfig::default(), |config, key| {
            config.with_excluded_key(key)
        });
    let requests = ConstraintCollector::with_config(registry, config)
        .collect(resource)
        .map_err(InvariantError::from)
        .context("Failed to collect constraints")?;
    info!("Collected {} constraints", requests.len());
    Ok(requests)
}
