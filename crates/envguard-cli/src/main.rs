//! envguard
//!
//! Validate the process environment (or a `.env` file) against a schema.
//!
//! # Usage
//!
//! ```bash
//! # Validate the current environment
//! envguard validate --schema env.schema.yaml
//!
//! # Validate a .env file, stopping at the first failure
//! envguard validate --schema env.schema.json --env-file .env --mode fail-fast
//!
//! # Print the compiled plan
//! envguard plan --schema env.schema.toml --format json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Environment is valid
//! - 1: Environment failed validation
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema could not be parsed or compiled
//! - 10: Internal error

mod commands;
mod error;
mod output;

use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;
use crate::error::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_json) {
        eprintln!("Error: {:#}", e);
        std::process::exit(ExitCode::InternalError.into());
    }

    let code = match commands::run(cli, &mut std::io::stdout()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    std::process::exit(code.into());
}

/// Install the log subscriber; `RUST_LOG` directives extend the `-v` level
fn init_tracing(verbose: u8, json: bool) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG directive")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}
