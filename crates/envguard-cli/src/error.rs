//! CLI errors and process exit codes

use envguard_core::{Error as CoreError, LoadError};
use thiserror::Error;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every check passed
    Success = 0,
    /// The environment failed validation
    ValidationFailed = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or unreadable
    FileError = 4,
    /// Schema could not be parsed or compiled
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    pub fn from_outcome(valid: bool) -> Self {
        if valid {
            ExitCode::Success
        } else {
            ExitCode::ValidationFailed
        }
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot read '{path}': {reason}")]
    File { path: String, reason: String },

    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::File { .. } => ExitCode::FileError,
            CliError::Schema(_) => ExitCode::SchemaError,
            CliError::InvalidInput(_) => ExitCode::InvalidInput,
            CliError::Output(_) => ExitCode::InternalError,
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { path, source } => CliError::File {
                path,
                reason: source.to_string(),
            },
            LoadError::UnsupportedFormat(_) | LoadError::Dotenv { .. } => {
                CliError::InvalidInput(err.to_string())
            }
            LoadError::Parse { .. } => CliError::Schema(err.to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Load(load) => load.into(),
            CoreError::Registry(registry) => CliError::InvalidInput(registry.to_string()),
            CoreError::Schema(_) | CoreError::Compile(_) => CliError::Schema(err.to_string()),
        }
    }
}
