//! Argument parsing and command execution

use clap::{ArgAction, Args, Parser, Subcommand};
use envguard_core::{
    load_schema_file, EnvInput, EnvValidator, ExecutionMode, ExecutorConfig, PredicateRegistry,
};
use std::io::Write;
use std::path::PathBuf;

use crate::error::{CliError, ExitCode};
use crate::output::{render_plan, render_report, OutputFormat};

/// Validate environment configuration against a schema
#[derive(Parser, Debug)]
#[command(
    name = "envguard",
    about = "Validate environment configuration against a schema",
    version
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Schema document (.json, .yaml, .yml or .toml)
    #[arg(short, long, value_name = "FILE", env = "ENVGUARD_SCHEMA")]
    pub schema: PathBuf,

    /// Do not register the built-in network and filesystem predicates
    #[arg(long)]
    pub no_builtins: bool,
}

impl SchemaArgs {
    fn registry(&self) -> PredicateRegistry {
        if self.no_builtins {
            PredicateRegistry::new()
        } else {
            PredicateRegistry::with_builtins()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the environment and report every failing check
    Validate {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Read variables from a .env file instead of the process environment
        #[arg(short, long, value_name = "FILE")]
        env_file: Option<PathBuf>,

        /// Only consider variables whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// collect-all reports every failure, fail-fast only the first
        #[arg(short, long, env = "ENVGUARD_MODE", default_value = "collect-all")]
        mode: ExecutionMode,

        /// Output format
        #[arg(short, long, value_enum, env = "ENVGUARD_FORMAT", default_value = "table")]
        format: OutputFormat,
    },

    /// Compile the schema and print the resulting plan
    Plan {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Output format
        #[arg(short, long, value_enum, env = "ENVGUARD_FORMAT", default_value = "table")]
        format: OutputFormat,
    },
}

/// Run a parsed command line, writing results to `out`
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<ExitCode, CliError> {
    match cli.command {
        Command::Validate {
            schema,
            env_file,
            prefix,
            mode,
            format,
        } => execute_validate(&schema, env_file, prefix, mode, format, out).await,
        Command::Plan { schema, format } => execute_plan(&schema, format, out),
    }
}

async fn execute_validate(
    args: &SchemaArgs,
    env_file: Option<PathBuf>,
    prefix: Option<String>,
    mode: ExecutionMode,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<ExitCode, CliError> {
    let document = load_schema_file(&args.schema)?;
    let config = ExecutorConfig::new().with_mode(mode);
    let validator = EnvValidator::from_value(&document, &args.registry(), config)?;

    let mut input = match &env_file {
        Some(path) => EnvInput::from_dotenv_file(path)?,
        None => EnvInput::from_process(),
    };
    if let Some(prefix) = prefix.as_deref() {
        input = input.with_prefix(prefix);
    }

    tracing::debug!(
        schema = %args.schema.display(),
        variables = input.len(),
        checks = validator.plan().len(),
        "Validating environment"
    );

    let report = validator.validate(&input).await;
    render_report(&report, format, out)?;

    Ok(ExitCode::from_outcome(report.is_valid()))
}

fn execute_plan(
    args: &SchemaArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<ExitCode, CliError> {
    let document = load_schema_file(&args.schema)?;
    let validator =
        EnvValidator::from_value(&document, &args.registry(), ExecutorConfig::default())?;

    render_plan(validator.plan(), format, out)?;
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["APP_PORT", "APP_ENV"],
        "properties": {
            "APP_PORT": { "type": "integer", "minimum": 1, "maximum": 65535 },
            "APP_ENV": { "enum": ["dev", "prod"] }
        }
    }"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn run_args(args: &[&str]) -> (Result<ExitCode, CliError>, String) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let mut out = Vec::new();
        let result = run(cli, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_validate_args() {
        let cli = Cli::try_parse_from([
            "envguard",
            "-vv",
            "validate",
            "--schema",
            "schema.yaml",
            "--mode",
            "fail-fast",
            "--format",
            "json",
            "--no-builtins",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Validate {
                schema,
                mode,
                format,
                env_file,
                ..
            } => {
                assert_eq!(schema.schema, PathBuf::from("schema.yaml"));
                assert!(schema.no_builtins);
                assert_eq!(mode, ExecutionMode::FailFast);
                assert_eq!(format, OutputFormat::Json);
                assert!(env_file.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let result = Cli::try_parse_from([
            "envguard", "validate", "--schema", "s.json", "--mode", "sometimes",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_validate_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", SCHEMA);
        let env = write(dir.path(), ".env", "APP_PORT=8080\nAPP_ENV=prod\n");

        let (result, output) = run_args(&[
            "envguard",
            "validate",
            "--schema",
            schema.to_str().unwrap(),
            "--env-file",
            env.to_str().unwrap(),
            "--format",
            "json",
        ])
        .await;

        assert_eq!(result.unwrap(), ExitCode::Success);
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["outcome"]["status"], "valid");
    }

    #[tokio::test]
    async fn test_validate_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", SCHEMA);
        let env = write(dir.path(), ".env", "APP_PORT=99999\nAPP_ENV=staging\nOTHER=1\n");

        let (result, output) = run_args(&[
            "envguard",
            "validate",
            "--schema",
            schema.to_str().unwrap(),
            "--env-file",
            env.to_str().unwrap(),
            "--prefix",
            "APP_",
            "--format",
            "json",
        ])
        .await;

        assert_eq!(result.unwrap(), ExitCode::ValidationFailed);
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        let errors = report["outcome"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["path"], serde_json::json!(["APP_PORT"]));
        assert_eq!(errors[1]["path"], serde_json::json!(["APP_ENV"]));
    }

    #[tokio::test]
    async fn test_missing_schema_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        let (result, _) = run_args(&[
            "envguard",
            "plan",
            "--schema",
            missing.to_str().unwrap(),
        ])
        .await;

        assert_eq!(result.unwrap_err().exit_code(), ExitCode::FileError);
    }

    #[tokio::test]
    async fn test_bad_schema_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.yaml", "type: object\nrequired: [PORT]\n");

        let (result, _) = run_args(&["envguard", "plan", "--schema", schema.to_str().unwrap()]).await;

        assert_eq!(result.unwrap_err().exit_code(), ExitCode::SchemaError);
    }

    #[tokio::test]
    async fn test_plan_output() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", SCHEMA);

        let (result, output) = run_args(&[
            "envguard",
            "plan",
            "--schema",
            schema.to_str().unwrap(),
            "--format",
            "yaml",
        ])
        .await;

        assert_eq!(result.unwrap(), ExitCode::Success);
        assert!(output.contains("fingerprint:"));
        assert!(output.contains("APP_PORT"));
    }
}
