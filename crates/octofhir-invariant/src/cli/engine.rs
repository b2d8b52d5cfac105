//! Engine and evaluator setup shared by the commands

use anyhow::{Context, Result};
use octofhir_invariant_eval::{
    BatchEvaluator, EvaluatorConfig, FailurePolicy, ProcessEngine, ProcessEngineConfig,
};
use octofhir_invariant_model::FhirVersion;
use std::path::PathBuf;

/// Engine options from the command line
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Evaluator program (default `node`)
    pub program: Option<String>,
    /// Program arguments; replace the bridge script when given
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// FHIR version name (r4, r4b, r5)
    pub model: Option<String>,
    pub isolate_failures: bool,
}

impl EngineOptions {
    pub fn process_config(&self) -> ProcessEngineConfig {
        let mut config = match (&self.program, self.args.is_empty()) {
            (None, true) => ProcessEngineConfig::default(),
            (program, _) => self.args.iter().fold(
                ProcessEngineConfig::new(program.as_deref().unwrap_or("node")),
                |config, arg| config.with_arg(arg),
            ),
        };
        if let Some(dir) = &self.working_dir {
            config = config.with_working_dir(dir);
        }
        config
    }

    pub fn evaluator_config(&self) -> Result<EvaluatorConfig> {
        let model = match &self.model {
            Some(name) => name
                .parse::<FhirVersion>()
                .with_context(|| format!("Invalid --model value: {}", name))?,
            None => FhirVersion::default(),
        };
        let failure_policy = if self.isolate_failures {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Abort
        };
        Ok(EvaluatorConfig::default()
            .with_model(model)
            .with_failure_policy(failure_policy))
    }

    /// Evaluator backed by the configured process engine
    pub fn evaluator(&self) -> Result<BatchEvaluator<ProcessEngine>> {
        let config = self.evaluator_config()?;
        Ok(BatchEvaluator::new(
            ProcessEngine::new(self.process_config()),
            config,
        ))
    }
}
