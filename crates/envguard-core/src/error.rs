//! Error types for envguard
//!
//! Schema construction, compilation, predicate registration and source
//! loading each have their own error enum. Failed validation is never an
//! error here: it is returned as data inside
//! [`ValidationOutcome::Invalid`](crate::report::ValidationOutcome).

use thiserror::Error;

/// Malformed schema detected while building the schema model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A key outside the supported keyword vocabulary
    #[error("Unknown keyword '{keyword}' at {path}")]
    UnknownKeyword { path: String, keyword: String },

    /// A `required` entry with no matching `properties` entry
    #[error("Required property '{property}' at {path} has no corresponding 'properties' entry")]
    RequiredWithoutProperty { path: String, property: String },

    /// A `custom-async` node naming a predicate that was never registered
    #[error("Predicate '{predicate}' referenced at {path} is not registered")]
    UnregisteredPredicate { path: String, predicate: String },

    /// The same property name declared twice under one `properties` node
    #[error("Property '{property}' is declared more than once at {path}")]
    DuplicateProperty { path: String, property: String },

    /// A keyword whose parameters have the wrong shape
    #[error("Malformed '{keyword}' at {path}: {reason}")]
    MalformedKeyword {
        path: String,
        keyword: String,
        reason: String,
    },

    /// A schema location that is not a JSON object
    #[error("Schema at {path} must be an object")]
    NotAnObject { path: String },
}

impl SchemaError {
    /// Create a malformed keyword error
    pub fn malformed(
        path: impl Into<String>,
        keyword: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::MalformedKeyword {
            path: path.into(),
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }
}

/// A structurally valid schema that cannot be turned into a plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A `custom-async` id missing from the predicate table
    #[error("Cannot resolve predicate '{predicate}' at {path}")]
    UnresolvedPredicate { path: String, predicate: String },

    /// A keyword that cannot apply to the node's declared type
    #[error("Keyword '{keyword}' at {path} is incompatible with declared type '{declared}'")]
    IncompatibleType {
        path: String,
        keyword: String,
        declared: String,
    },

    /// A `pattern` that is not a valid regular expression
    #[error("Invalid pattern '{pattern}' at {path}: {reason}")]
    InvalidPattern {
        path: String,
        pattern: String,
        reason: String,
    },

    /// A `format` that is neither built in nor registered as a predicate
    #[error("Unknown format '{format}' at {path}")]
    UnknownFormat { path: String, format: String },

    /// Lower bound greater than the upper bound on the same node
    #[error("Invalid bounds at {path}: {reason}")]
    InvalidBounds { path: String, reason: String },
}

/// Errors raised while populating a predicate table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Predicate '{0}' is already registered")]
    Duplicate(String),

    #[error("Predicate id must not be empty")]
    EmptyId,
}

/// Errors raised by the schema and environment sources
#[derive(Error, Debug)]
pub enum LoadError {
    /// File access error
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Document could not be parsed
    #[error("Invalid {format} in '{path}': {reason}")]
    Parse {
        path: String,
        format: String,
        reason: String,
    },

    /// `.env` content that is not a sequence of assignments
    #[error("Invalid .env content in '{path}': {reason}")]
    Dotenv { path: String, reason: String },

    /// File extension not recognised
    #[error("Unsupported schema format '{0}'. Supported formats: json, yaml, yml, toml")]
    UnsupportedFormat(String),
}

/// Umbrella error for the compile-once half of the API
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl Error {
    /// Check if this error stems from user-supplied input rather than a bug
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Schema(_) | Error::Compile(_) | Error::Load(_)
        )
    }
}

/// Result type alias for envguard operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::UnknownKeyword {
            path: "#/properties/PORT".to_string(),
            keyword: "typo".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown keyword 'typo' at #/properties/PORT");

        let err = CompileError::UnknownFormat {
            path: "#".to_string(),
            format: "hexcolor".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown format 'hexcolor' at #");
    }

    #[test]
    fn test_is_user_error() {
        let schema: Error = SchemaError::NotAnObject { path: "#".into() }.into();
        assert!(schema.is_user_error());

        let registry: Error = RegistryError::EmptyId.into();
        assert!(!registry.is_user_error());
    }

    #[test]
    fn test_malformed_constructor() {
        let err = SchemaError::malformed("#", "required", "expected an array");
        assert!(matches!(err, SchemaError::MalformedKeyword { .. }));
        assert!(err.to_string().contains("expected an array"));
    }
}
