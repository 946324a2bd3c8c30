//! Data transfer objects
//!
//! Wire-facing representations shared with host systems that surface
//! evaluation outcomes (APIs, CLIs, log pipelines).

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, EvalError, SourcePosition, Violation};

/// Serializable report of a failed evaluation.
///
/// Flattens the [`EvalError`] taxonomy into a kind tag, a human-readable
/// message, and whatever structured detail the error carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<SourcePosition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl From<&EvalError> for ErrorReport {
    fn from(err: &EvalError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            positions: err.positions(),
            violations: err.violations().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_validation_error() {
        let err = EvalError::SchemaValidation {
            violations: vec![Violation {
                path: "steps[0].commands".to_string(),
                message: "must not be empty".to_string(),
            }],
        };

        let report = ErrorReport::from(&err);
        assert_eq!(report.kind, ErrorKind::SchemaValidation);
        assert_eq!(report.violations.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "schema_validation");
        assert!(json.get("positions").is_none());
    }

    #[test]
    fn test_report_carries_positions() {
        let err = EvalError::TemplateLoad {
            message: "unexpected symbol near ')'".to_string(),
            position: Some(SourcePosition {
                chunk: "template".to_string(),
                line: 7,
            }),
        };

        let report = ErrorReport::from(&err);
        assert_eq!(report.kind, ErrorKind::TemplateLoad);
        assert_eq!(report.positions[0].line, 7);
    }
}
