//! Invariant evaluation error types

use crate::{ErrorCode, INV0100};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the batch cannot proceed
    Error,
    /// Warning - potential issue but can continue
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message with optional constraint context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Constraint key the diagnostic refers to, if any
    pub constraint: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            constraint: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            constraint: None,
            help: None,
        }
    }

    /// Set the constraint key
    pub fn with_constraint(mut self, key: impl Into<String>) -> Self {
        self.constraint = Some(key.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the diagnostic with terminal colors
    #[cfg(feature = "colored")]
    pub fn render_colored(&self) -> String {
        use colored::Colorize;

        let label = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Info => self.severity.to_string().blue().bold(),
        };
        let mut out = format!("{}[{}]: {}", label, self.code, self.message);
        if let Some(key) = &self.constraint {
            out.push_str(&format!("\n  {} constraint {}", "-->".cyan(), key));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(key) = &self.constraint {
            write!(f, " (constraint {})", key)?;
        }
        Ok(())
    }
}

/// Main invariant evaluation error type
#[derive(Debug, Clone, Error)]
pub enum InvariantError {
    /// The batch or a fragment is not well-formed
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// The engine rejected an expression
    #[error("{code}: constraint '{key}' (request {index}): {message}")]
    Expression {
        code: ErrorCode,
        message: String,
        index: usize,
        key: String,
        expression: String,
    },

    /// The engine could not be reached or replied with garbage
    #[error("{code}: {message}")]
    Engine {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Definition loading or constraint collection failed
    #[error("{code}: {message}")]
    Model {
        code: ErrorCode,
        message: String,
        resource_type: Option<String>,
    },

    /// I/O or configuration failure
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },
}

impl InvariantError {
    /// Create a parse error
    pub fn parse(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create an expression error for the request at `index`
    pub fn expression(
        index: usize,
        key: impl Into<String>,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Expression {
            code: INV0100,
            message: message.into(),
            index,
            key: key.into(),
            expression: expression.into(),
        }
    }

    /// Create an engine error
    pub fn engine(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Engine {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create a model error
    pub fn model(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Model {
            code,
            message: message.into(),
            resource_type: None,
        }
    }

    /// Create a model error tied to a resource type
    pub fn model_for(
        code: ErrorCode,
        message: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self::Model {
            code,
            message: message.into(),
            resource_type: Some(resource_type.into()),
        }
    }

    /// Create a system error
    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attach context to parse, engine and system errors
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        match &mut self {
            Self::Parse { context, .. }
            | Self::Engine { context, .. }
            | Self::System { context, .. } => *context = Some(ctx.into()),
            Self::Expression { .. } | Self::Model { .. } => {}
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. } => *code,
            Self::Expression { code, .. } => *code,
            Self::Engine { code, .. } => *code,
            Self::Model { code, .. } => *code,
            Self::System { code, .. } => *code,
        }
    }

    /// Get the constraint key if the error is tied to one request
    pub fn constraint_key(&self) -> Option<&str> {
        match self {
            Self::Expression { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse { code, message, context }
            | Self::Engine { code, message, context }
            | Self::System { code, message, context } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                } else if let Some(help) = code.info().help {
                    diag = diag.with_help(help);
                }
                diag
            }
            Self::Expression { code, message, key, expression, .. } => {
                Diagnostic::error(*code, message.clone())
                    .with_constraint(key.clone())
                    .with_help(format!("expression: {}", expression.trim()))
            }
            Self::Model { code, message, resource_type } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(rt) = resource_type {
                    diag = diag.with_help(format!("resource type: {}", rt));
                }
                diag
            }
        }
    }
}
