//! envguard core
//!
//! Schema-driven validation of a process's environment configuration.
//!
//! ## Architecture
//!
//! 1. **Schema** (`schema/`): immutable keyword tree parsed from a JSON,
//!    YAML or TOML document, or built with [`Schema::builder`].
//!
//! 2. **Predicates** (`predicate/`): named async checks referenced by the
//!    `custom-async` keyword and by formats that need I/O.
//!
//! 3. **Compiler** (`compiler/`): flattens a schema into an ordered
//!    [`ValidationPlan`] with regexes compiled and predicates bound.
//!
//! 4. **Executor** (`executor/`): coerces string input along the plan's
//!    type hints, runs sync checks inline and async checks concurrently.
//!
//! 5. **Report** (`report`): every error in plan order, or a single valid
//!    outcome.
//!
//! ## Example
//!
//! ```rust,no_run
//! use envguard_core::{EnvInput, EnvValidator, ExecutorConfig, PredicateRegistry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> envguard_core::Result<()> {
//!     let schema = json!({
//!         "type": "object",
//!         "required": ["PORT", "DB_HOST"],
//!         "properties": {
//!             "PORT": { "type": "integer", "minimum": 1, "maximum": 65535 },
//!             "DB_HOST": { "type": "string", "custom-async": "dns-resolvable" }
//!         }
//!     });
//!
//!     let registry = PredicateRegistry::with_builtins();
//!     let validator = EnvValidator::from_value(&schema, &registry, ExecutorConfig::from_env())?;
//!
//!     let report = validator.validate(&EnvInput::from_process()).await;
//!     for error in report.errors() {
//!         eprintln!("{}", error);
//!     }
//!     Ok(())
//! }
//! ```

pub mod coerce;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod path;
pub mod predicate;
pub mod report;
pub mod schema;
pub mod source;
pub mod validator;

pub use compiler::{compile, CheckInstruction, Compiler, Format, ValidationPlan};
pub use error::{CompileError, Error, LoadError, RegistryError, Result, SchemaError};
pub use executor::{validate, ExecutionMode, Executor, ExecutorConfig};
pub use path::{LocationPath, PathToken};
pub use predicate::{AsyncPredicate, PredicateError, PredicateRegistry};
pub use report::{ErrorReporter, ValidationError, ValidationFailure, ValidationOutcome, ValidationReport};
pub use schema::{Keyword, Schema, SchemaBuilder, SchemaNode, TypeName, TypeSet};
pub use source::{load_schema_file, EnvInput, SchemaFormat};
pub use validator::EnvValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
