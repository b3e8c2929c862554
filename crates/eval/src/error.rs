//! Error taxonomy of the engines.
//!
//! `EvaluationError` is returned by the expression evaluator; callers
//! decide whether it fails closed (conditional rules) or becomes a
//! placeholder (calculated fields). `ValidationError` is never returned
//! as `Err`: it is attached to a field inside a `ValidationResult`.

use serde::Serialize;

/// Failure while evaluating a rule or a formula.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// The formula uses something outside the whitelisted grammar.
    #[error("unsupported syntax: {message}")]
    UnsupportedSyntax { message: String },
    /// Values that cannot be coerced for the requested operation.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },
    /// A name that does not denote a field of the form.
    #[error("unknown field '{name}'")]
    MissingReference { name: String },
    #[error("division by zero")]
    DivisionByZero,
    /// Checked decimal arithmetic left the representable range.
    #[error("numeric overflow: {message}")]
    Overflow { message: String },
}

impl EvaluationError {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        EvaluationError::TypeMismatch {
            message: message.into(),
        }
    }
}

impl From<formwork_core::FormulaError> for EvaluationError {
    fn from(e: formwork_core::FormulaError) -> Self {
        EvaluationError::UnsupportedSyntax {
            message: e.to_string(),
        }
    }
}

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("value is required")]
    Required,
    /// The value does not have the shape its field type demands.
    #[error("expected {expected}")]
    TypeInvalid { expected: String },
    /// A `min`/`max`/`minLength`/`maxLength` bound was violated.
    #[error("{constraint} {limit} violated")]
    RangeViolation { constraint: String, limit: String },
    #[error("value does not match pattern '{pattern}'")]
    PatternMismatch { pattern: String },
    #[error("cross-field rule failed")]
    CrossFieldRuleFailed,
}

impl ValidationError {
    /// Stable identifier used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::TypeInvalid { .. } => "typeInvalid",
            ValidationError::RangeViolation { .. } => "rangeViolation",
            ValidationError::PatternMismatch { .. } => "patternMismatch",
            ValidationError::CrossFieldRuleFailed => "crossFieldRuleFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_errors_become_unsupported_syntax() {
        let err = formwork_core::parse_formula("amount; drop").unwrap_err();
        let eval: EvaluationError = err.into();
        match eval {
            EvaluationError::UnsupportedSyntax { message } => {
                assert!(message.contains("column 7"), "message: {}", message)
            }
            other => panic!("expected UnsupportedSyntax, got {:?}", other),
        }
    }

    #[test]
    fn validation_error_serializes_with_kind_tag() {
        let v = serde_json::to_value(ValidationError::RangeViolation {
            constraint: "max".to_string(),
            limit: "100".to_string(),
        })
        .unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "kind": "rangeViolation", "constraint": "max", "limit": "100" })
        );
        assert_eq!(
            serde_json::to_value(ValidationError::Required).unwrap(),
            serde_json::json!({ "kind": "required" })
        );
    }
}
