//! Output formatting utilities

use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_invariant_diagnostics::InvariantError;
use octofhir_invariant_eval::OperationOutcome;
use octofhir_invariant_model::{ConstraintRequest, ConstraintResult, Verdict};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    JsonPretty,
    Table,
}

impl OutputFormat {
    /// Parse a `--format` value; unknown values fall back to pretty JSON
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::to_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("table") => Self::Table,
            _ => Self::JsonPretty,
        }
    }
}

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(io::stdout().is_terminal()),
    }
}

/// Format an error for display
///
/// Invariant errors anywhere in the chain are followed by their diagnostic.
pub fn format_error(error: &anyhow::Error) -> String {
    let mut out = format!("{} {:#}", "Error:".red().bold(), error);
    if let Some(invariant) = error.downcast_ref::<InvariantError>() {
        out.push('\n');
        out.push_str(&invariant.to_diagnostic().render_colored());
    }
    out
}

/// Format a warning for display
pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!(
            "{}",
            format_success(&format!("Output written to {}", path.display()))
        );
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Serialize to JSON text
pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")
    } else {
        serde_json::to_string(value).context("Failed to serialize JSON")
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Description")]
    human: String,
}

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Parent path")]
    path: String,
    #[tabled(rename = "Expression")]
    expression: String,
}

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Diagnostics")]
    diagnostics: String,
}

/// Format evaluation results as a table
pub fn results_table(results: &[ConstraintResult]) -> String {
    if results.is_empty() {
        return "(no constraints)".to_string();
    }
    let rows = results.iter().map(|r| ResultRow {
        key: r.key.clone(),
        path: display_path(&r.path),
        result: match r.verdict() {
            Verdict::Pass => format_value(r.result.as_ref().unwrap_or(&Value::Null))
                .green()
                .to_string(),
            Verdict::Fail => "false".red().to_string(),
            Verdict::Absent => "(empty)".dimmed().to_string(),
            Verdict::Error => format!("error: {}", r.error.as_deref().unwrap_or_default())
                .red()
                .bold()
                .to_string(),
        },
        human: r.human.clone(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

/// Format a constraint batch as a table
pub fn requests_table(requests: &[ConstraintRequest]) -> String {
    if requests.is_empty() {
        return "(no constraints)".to_string();
    }
    let rows = requests.iter().map(|r| RequestRow {
        key: r.key.clone(),
        path: display_path(&r.parent_path),
        expression: r.expression.clone(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

/// Format an OperationOutcome as a table
pub fn outcome_table(outcome: &OperationOutcome) -> String {
    let rows = outcome.issue.iter().map(|issue| IssueRow {
        severity: match issue.severity.as_str() {
            "error" | "fatal" => issue.severity.red().bold().to_string(),
            "warning" => issue.severity.yellow().to_string(),
            _ => issue.severity.clone(),
        },
        code: issue.code.clone(),
        location: issue.expression.join(", "),
        diagnostics: issue.diagnostics.clone().unwrap_or_default(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}

/// Format a simple value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{}} with {} fields", obj.len()),
    }
}

/// Render `value` in `format`, using `table` for the table layout
pub fn render<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce() -> String,
) -> Result<String> {
    match format {
        OutputFormat::Json => format_json(value, false),
        OutputFormat::JsonPretty => format_json(value, true),
        OutputFormat::Table => Ok(table()),
    }
}
