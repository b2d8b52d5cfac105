//! Evaluate command implementation

use super::engine::EngineOptions;
use super::output::{self, OutputFormat};
use super::resolver::BatchSource;
use anyhow::{Context, Result};
use octofhir_invariant_eval::{BatchEvaluator, ExpressionEngine, LogTraceObserver};
use octofhir_invariant_model::{ConstraintRequest, ConstraintResult};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for evaluate command
pub struct EvaluateConfig {
    pub source: BatchSource,
    pub engine: EngineOptions,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Evaluate a constraint batch and print the results
pub fn evaluate(config: EvaluateConfig) -> Result<()> {
    let requests = config.source.load()?;
    let evaluator = config
        .engine
        .evaluator()?
        .with_trace_observer(Arc::new(LogTraceObserver));

    let stdout = std::io::stdout();
    let results = run(&evaluator, &requests, &mut stdout.lock())?;

    if let Some(path) = &config.output_file {
        let content = output::render(&results, config.output_format, || {
            output::results_table(&results)
        })?;
        return output::write_output(&content, Some(path));
    }

    match config.output_format {
        OutputFormat::Table => println!("{}", output::results_table(&results)),
        format => println!(
            "Result: {}",
            output::format_json(&results, format == OutputFormat::JsonPretty)?
        ),
    }
    Ok(())
}

/// Echo each request to `echo`, then evaluate the batch
pub fn run<E: ExpressionEngine>(
    evaluator: &BatchEvaluator<E>,
    requests: &[ConstraintRequest],
    echo: &mut impl Write,
) -> Result<Vec<ConstraintResult>> {
    for request in requests {
        writeln!(echo, "parentPath: {}", request.parent_path).context("Failed to write output")?;
    }
    let results = evaluator
        .evaluate(requests)
        .context("Constraint evaluation failed")?;
    Ok(results)
}
