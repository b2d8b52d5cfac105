//! Validate command implementation

use super::collect::collect_requests;
use super::engine::EngineOptions;
use super::output::{self, OutputFormat};
use super::resolver;
use anyhow::{Context, Result, bail};
use octofhir_invariant_eval::{
    BatchEvaluator, CollectingTraceObserver, ExpressionEngine, OperationOutcome, OutcomeBuilder,
};
use octofhir_invariant_model::ConstraintRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for validate command
pub struct ValidateConfig {
    pub resource: PathBuf,
    pub definitions: Vec<PathBuf>,
    pub excluded_keys: Vec<String>,
    pub engine: EngineOptions,
    pub treat_absent_as_failure: bool,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Validate a resource against its StructureDefinition constraints
pub fn validate(config: ValidateConfig) -> Result<()> {
    let resource = resolver::load_resource(&config.resource)?;
    let registry = resolver::load_registry(&config.definitions)?;
    let requests = collect_requests(registry, &config.excluded_keys, &resource)?;

    let observer = Arc::new(CollectingTraceObserver::new());
    let evaluator = config
        .engine
        .evaluator()?
        .with_trace_observer(observer.clone());
    let outcome = check(
        &evaluator,
        &requests,
        OutcomeBuilder::new().treat_absent_as_failure(config.treat_absent_as_failure),
        &observer,
    )?;

    let content = output::render(&outcome, config.output_format, || {
        output::outcome_table(&outcome)
    })?;
    output::write_output(&content, config.output_file.as_deref())?;

    ensure_valid(&outcome, &config.resource)?;
    report_success(&outcome, requests.len(), &config.resource);
    Ok(())
}

/// Fail when the outcome carries an error or fatal issue
pub fn ensure_valid(outcome: &OperationOutcome, resource: &Path) -> Result<()> {
    if outcome.has_errors() {
        bail!(
            "Validation failed: {} error(s), {} warning(s) in {}",
            outcome.count("error") + outcome.count("fatal"),
            outcome.count("warning"),
            resource.display()
        );
    }
    Ok(())
}

fn report_success(outcome: &OperationOutcome, constraints: usize, resource: &Path) {
    let warnings = outcome.count("warning");
    if warnings > 0 {
        eprintln!(
            "{}",
            output::format_warning(&format!("{} warning(s) in {}", warnings, resource.display()))
        );
    } else {
        eprintln!(
            "{}",
            output::format_success(&format!(
                "{} constraint(s) satisfied by {}",
                constraints,
                resource.display()
            ))
        );
    }
}

/// Evaluate the collected batch and render the outcome
pub fn check<E: ExpressionEngine>(
    evaluator: &BatchEvaluator<E>,
    requests: &[ConstraintRequest],
    builder: OutcomeBuilder,
    observer: &CollectingTraceObserver,
) -> Result<OperationOutcome> {
    let results = evaluator
        .evaluate(requests)
        .context("Constraint evaluation failed")?;
    Ok(builder.with_traces(observer.take()).build(&results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_invariant_model::ConstraintResult;
    use serde_json::json;

    fn outcome(result: serde_json::Value, severity: &str) -> OperationOutcome {
        let request = ConstraintRequest::new(json!({}), json!({}), "pat-1", "x").with_severity(severity);
        OutcomeBuilder::new().build(&[ConstraintResult::from_request(&request, Some(result))])
    }

    #[test]
    fn test_errors_fail_validation() {
        let err = ensure_valid(&outcome(json!(false), "error"), Path::new("patient.json"))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Validation failed: 1 error(s), 0 warning(s) in patient.json"
        );
    }

    #[test]
    fn test_warnings_pass_validation() {
        assert!(ensure_valid(&outcome(json!(false), "warning"), Path::new("patient.json")).is_ok());
        assert!(ensure_valid(&outcome(json!(true), "error"), Path::new("patient.json")).is_ok());
    }
}
