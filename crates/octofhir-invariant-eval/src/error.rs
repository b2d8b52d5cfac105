//! Engine errors

use octofhir_invariant_diagnostics::{
    ErrorCode, INV0100, INV0200, INV0201, INV0202, InvariantError,
};
use octofhir_invariant_model::ConstraintRequest;
use thiserror::Error;

/// Errors reported by an [`crate::ExpressionEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine rejected the expression (syntax, unknown function, type)
    #[error("{message}")]
    Rejected { message: String },

    /// The engine could not be started
    #[error("Failed to start '{program}': {message}")]
    Unavailable { program: String, message: String },

    /// The engine replied with something other than the expected JSON
    #[error("Malformed engine reply: {message}")]
    Protocol { message: String },

    /// The engine exited unsuccessfully without an error reply
    #[error("Engine exited with {status}: {stderr}")]
    Terminated { status: String, stderr: String },
}

impl EngineError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { .. } => INV0100,
            Self::Unavailable { .. } => INV0200,
            Self::Protocol { .. } => INV0201,
            Self::Terminated { .. } => INV0202,
        }
    }

    /// Tag the error with the request it happened on
    pub fn for_request(self, index: usize, request: &ConstraintRequest) -> InvariantError {
        match self {
            Self::Rejected { message } => {
                InvariantError::expression(index, &request.key, &request.expression, message)
            }
            other => InvariantError::engine(
                other.code(),
                format!("constraint '{}' (request {}): {}", request.key, index, other),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ConstraintRequest {
        ConstraintRequest::new(json!({}), json!({}), "pat-1", "name.exists(")
    }

    #[test]
    fn test_rejection_becomes_expression_error() {
        let err = EngineError::rejected("Unexpected end of input").for_request(3, &request());

        assert_eq!(err.code(), INV0100);
        assert_eq!(err.constraint_key(), Some("pat-1"));
        assert!(err.to_string().contains("request 3"));
    }

    #[test]
    fn test_unavailable_becomes_engine_error() {
        let err = EngineError::Unavailable {
            program: "node".to_string(),
            message: "No such file or directory".to_string(),
        }
        .for_request(0, &request());

        assert_eq!(err.code(), INV0200);
        assert!(err.to_string().contains("pat-1"));
    }
}
