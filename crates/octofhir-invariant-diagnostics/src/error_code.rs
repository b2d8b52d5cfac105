//! Invariant error codes following a structured numbering system
//!
//! Error code ranges:
//! - INV0001-INV0099: Parse errors (batch and fragment JSON)
//! - INV0100-INV0199: Expression errors (rejected by the engine)
//! - INV0200-INV0299: Engine errors (process, protocol)
//! - INV0300-INV0399: Model errors (definitions, constraint collection)
//! - INV0400-INV0499: System errors (I/O, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a parse error (0001-0099)
    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is an expression error (0100-0199)
    pub const fn is_expression_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an engine error (0200-0299)
    pub const fn is_engine_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a model error (0300-0399)
    pub const fn is_model_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INV{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Malformed batch JSON"));
    map.insert(2, ErrorInfo::new("Batch is not a JSON array")
        .with_help("The batch must be a JSON array of constraint requests"));
    map.insert(3, ErrorInfo::new("Invalid constraint request"));
    map.insert(4, ErrorInfo::new("Malformed resource JSON"));

    // Expression errors (0100-0199)
    map.insert(100, ErrorInfo::new("Expression rejected by engine"));
    map.insert(101, ErrorInfo::new("Expression syntax error"));
    map.insert(102, ErrorInfo::new("Expression type error"));

    // Engine errors (0200-0299)
    map.insert(200, ErrorInfo::new("Engine unavailable")
        .with_help("Check that the evaluator program is installed and on PATH"));
    map.insert(201, ErrorInfo::new("Engine protocol error"));
    map.insert(202, ErrorInfo::new("Engine terminated abnormally"));

    // Model errors (0300-0399)
    map.insert(300, ErrorInfo::new("Definition not found"));
    map.insert(301, ErrorInfo::new("Invalid StructureDefinition"));
    map.insert(302, ErrorInfo::new("Missing resourceType"));
    map.insert(303, ErrorInfo::new("Unknown FHIR version"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));

    map
});

// Parse errors
pub const INV0001: ErrorCode = ErrorCode::new(1);
pub const INV0002: ErrorCode = ErrorCode::new(2);
pub const INV0003: ErrorCode = ErrorCode::new(3);
pub const INV0004: ErrorCode = ErrorCode::new(4);

// Expression errors
pub const INV0100: ErrorCode = ErrorCode::new(100);
pub const INV0101: ErrorCode = ErrorCode::new(101);
pub const INV0102: ErrorCode = ErrorCode::new(102);

// Engine errors
pub const INV0200: ErrorCode = ErrorCode::new(200);
pub const INV0201: ErrorCode = ErrorCode::new(201);
pub const INV0202: ErrorCode = ErrorCode::new(202);

// Model errors
pub const INV0300: ErrorCode = ErrorCode::new(300);
pub const INV0301: ErrorCode = ErrorCode::new(301);
pub const INV0302: ErrorCode = ErrorCode::new(302);
pub const INV0303: ErrorCode = ErrorCode::new(303);

// System errors
pub const INV0400: ErrorCode = ErrorCode::new(400);
pub const INV0401: ErrorCode = ErrorCode::new(401);
pub const INV0402: ErrorCode = ErrorCode::new(402);
