//! Error types for template evaluation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Position in template source attached to load and runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Chunk name the interpreter assigned to the template source
    pub chunk: String,
    /// 1-based line number
    pub line: u32,
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chunk, self.line)
    }
}

/// A single schema violation found in a template's return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path into the returned value, e.g. `steps[2].commands`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors that can occur while evaluating a template
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Caller-supplied inputs cannot form a valid context
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// Template source failed to load: syntax error, missing entry point,
    /// or an entry point with the wrong shape
    #[error("failed to load template: {message}")]
    TemplateLoad {
        message: String,
        position: Option<SourcePosition>,
    },

    /// Template raised an error while executing
    #[error("template execution failed: {message}")]
    TemplateRuntime {
        message: String,
        position: Option<SourcePosition>,
    },

    /// Template exceeded its wall-clock budget
    #[error("template exceeded its time budget of {timeout_ms} ms")]
    TemplateTimeout { timeout_ms: u64 },

    /// Template exceeded a resource limit other than time
    #[error("template exceeded a resource limit: {0}")]
    TemplateResource(String),

    /// The returned value does not satisfy the manifest schema
    #[error("manifest failed schema validation with {} violation(s)", .violations.len())]
    SchemaValidation { violations: Vec<Violation> },

    /// Evaluation was cancelled by the caller
    #[error("evaluation was cancelled")]
    Cancelled,
}

/// Machine-readable discriminant for [`EvalError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidContext,
    TemplateLoad,
    TemplateRuntime,
    TemplateTimeout,
    TemplateResource,
    SchemaValidation,
    Cancelled,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidContext(_) => ErrorKind::InvalidContext,
            Self::TemplateLoad { .. } => ErrorKind::TemplateLoad,
            Self::TemplateRuntime { .. } => ErrorKind::TemplateRuntime,
            Self::TemplateTimeout { .. } => ErrorKind::TemplateTimeout,
            Self::TemplateResource(_) => ErrorKind::TemplateResource,
            Self::SchemaValidation { .. } => ErrorKind::SchemaValidation,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Source positions attached to this error, if any
    pub fn positions(&self) -> Vec<SourcePosition> {
        match self {
            Self::TemplateLoad { position, .. } | Self::TemplateRuntime { position, .. } => {
                position.iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Schema violations carried by this error
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::SchemaValidation { violations } => violations,
            _ => &[],
        }
    }

    /// Check if this error was caused by the template itself rather than
    /// the caller's inputs or a cancellation
    pub fn is_template_fault(&self) -> bool {
        matches!(
            self,
            Self::TemplateLoad { .. }
                | Self::TemplateRuntime { .. }
                | Self::TemplateTimeout { .. }
                | Self::TemplateResource(_)
                | Self::SchemaValidation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = EvalError::TemplateTimeout { timeout_ms: 500 };
        assert_eq!(err.kind(), ErrorKind::TemplateTimeout);
        assert!(err.is_template_fault());

        let err = EvalError::Cancelled;
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(!err.is_template_fault());
    }

    #[test]
    fn test_violation_display() {
        let violation = Violation {
            path: "steps[0].commands".to_string(),
            message: "must not be empty".to_string(),
        };
        assert_eq!(violation.to_string(), "steps[0].commands: must not be empty");
    }

    #[test]
    fn test_positions_only_on_source_errors() {
        let err = EvalError::TemplateRuntime {
            message: "attempt to index a nil value".to_string(),
            position: Some(SourcePosition {
                chunk: "template".to_string(),
                line: 3,
            }),
        };
        assert_eq!(err.positions().len(), 1);
        assert_eq!(err.positions()[0].line, 3);

        assert!(EvalError::Cancelled.positions().is_empty());
    }

    #[test]
    fn test_schema_validation_display_counts() {
        let err = EvalError::SchemaValidation {
            violations: vec![
                Violation {
                    path: "steps".to_string(),
                    message: "is required".to_string(),
                },
                Violation {
                    path: "version".to_string(),
                    message: "must be a string, found number".to_string(),
                },
            ],
        };
        assert!(err.to_string().contains("2 violation(s)"));
        assert_eq!(err.violations().len(), 2);
    }
}
