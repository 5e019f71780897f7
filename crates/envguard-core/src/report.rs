//! Validation results
//!
//! A run either succeeds or produces the complete, ordered list of
//! [`ValidationError`]s. Errors are data, not `Err`: callers that prefer
//! the reject-on-invalid style use [`ValidationOutcome::into_result`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::executor::ExecutionMode;
use crate::path::LocationPath;

/// One violated constraint at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Concrete location in the input (indices instead of wildcards)
    pub path: LocationPath,
    /// Keyword that failed, or the override supplied by a predicate
    pub keyword: String,
    pub message: String,
    #[serde(default)]
    pub params: Value,
    /// JSON pointer of the failing keyword in the schema
    pub schema_path: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "/ {}", self.message)
        } else {
            write!(f, "{} {}", self.path, self.message)
        }
    }
}

/// Result of validating one input against one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "errors", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<ValidationError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// Errors in plan order; empty when valid
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationOutcome::Valid => &[][..],
            ValidationOutcome::Invalid(errors) => errors.as_slice(),
        }
    }

    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors().first()
    }

    pub fn into_result(self) -> Result<(), ValidationFailure> {
        match self {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(errors) => Err(ValidationFailure { errors }),
        }
    }
}

/// Rejection carrying every error of a failed run
///
/// Displays the first error; the full list stays available.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", describe_failure(.errors))]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}

fn describe_failure(errors: &[ValidationError]) -> String {
    match errors {
        [] => "validation failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Turns collected errors into an outcome
pub struct ErrorReporter;

impl ErrorReporter {
    /// `Valid` iff there are no errors; every error is kept
    pub fn finish(errors: Vec<ValidationError>) -> ValidationOutcome {
        if errors.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid(errors)
        }
    }
}

/// Envelope describing a single validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub mode: ExecutionMode,
    /// Checks evaluated, counting each array element separately
    pub checks_total: usize,
    pub checks_failed: usize,
    pub async_checks: usize,
    pub plan_fingerprint: String,
    pub outcome: ValidationOutcome,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.outcome.errors()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!(
                "valid: {} checks passed in {}ms",
                self.checks_total, self.duration_ms
            )
        } else {
            format!(
                "invalid: {} of {} checks failed in {}ms ({})",
                self.checks_failed, self.checks_total, self.duration_ms, self.mode
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error(path: &str, message: &str) -> ValidationError {
        ValidationError {
            path: path.parse().unwrap(),
            keyword: "type".to_string(),
            message: message.to_string(),
            params: json!({ "type": "integer" }),
            schema_path: "#/properties/PORT/type".to_string(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(error("PORT", "must be integer").to_string(), "PORT must be integer");
        assert_eq!(error("", "must be object").to_string(), "/ must be object");
    }

    #[test]
    fn test_finish() {
        assert!(ErrorReporter::finish(Vec::new()).is_valid());

        let outcome = ErrorReporter::finish(vec![error("A", "x"), error("B", "y")]);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors().len(), 2);
        assert_eq!(outcome.first_error().unwrap().path.to_string(), "A");
    }

    #[test]
    fn test_failure_message() {
        let failure = ErrorReporter::finish(vec![error("PORT", "must be integer")])
            .into_result()
            .unwrap_err();
        assert_eq!(failure.to_string(), "PORT must be integer");

        let failure = ErrorReporter::finish(vec![
            error("PORT", "must be integer"),
            error("HOST", "must be string"),
        ])
        .into_result()
        .unwrap_err();
        assert_eq!(failure.to_string(), "PORT must be integer (and 1 more)");
        assert_eq!(failure.errors.len(), 2);
    }

    #[test]
    fn test_outcome_serialization() {
        let valid = serde_json::to_value(ValidationOutcome::Valid).unwrap();
        assert_eq!(valid, json!({ "status": "valid" }));

        let invalid = serde_json::to_value(ErrorReporter::finish(vec![error("PORT", "must be integer")])).unwrap();
        assert_eq!(invalid["status"], "invalid");
        assert_eq!(invalid["errors"][0]["path"], json!(["PORT"]));
        assert_eq!(invalid["errors"][0]["schemaPath"], "#/properties/PORT/type");

        let back: ValidationOutcome = serde_json::from_value(invalid).unwrap();
        assert_eq!(back.errors().len(), 1);
    }

    #[test]
    fn test_dotted_property_round_trip() {
        let original = ValidationError {
            path: LocationPath::root().child("spring.datasource.url"),
            keyword: "presence".to_string(),
            message: "must have required property 'spring.datasource.url'".to_string(),
            params: json!({ "missingProperty": "spring.datasource.url" }),
            schema_path: "#/required".to_string(),
        };

        let outcome = ErrorReporter::finish(vec![original.clone()]);
        let yaml = serde_yaml::to_string(&outcome).unwrap();
        let back: ValidationOutcome = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(back.errors()[0].path.tokens(), original.path.tokens());
        assert_eq!(back.errors()[0].to_string(), original.to_string());
    }
}
