//! Plan executor
//!
//! Runs a [`ValidationPlan`] against one input. Sync checks evaluate inline
//! in plan order; async predicates are dispatched as they are reached and
//! joined once at the end, so latency is bounded by the slowest predicate
//! rather than their sum. Whatever the completion order, errors come back
//! sorted by plan position (then by array index).

mod checks;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use crate::compiler::{Check, CheckInstruction, ValidationPlan};
use crate::path::{LocationPath, PathToken};
use crate::report::{ErrorReporter, ValidationError, ValidationOutcome, ValidationReport};
use crate::schema::Keyword;
use crate::source::EnvInput;

/// Environment variable read by [`ExecutorConfig::from_env`]
pub const MODE_ENV_VAR: &str = "ENVGUARD_MODE";

/// How much of the plan runs once a check has failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Run every check and report every failure
    #[default]
    CollectAll,
    /// Stop dispatching at the first failing sync check and report only
    /// the earliest failure in plan order
    FailFast,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::CollectAll => write!(f, "collect-all"),
            ExecutionMode::FailFast => write!(f, "fail-fast"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collect-all" | "collect_all" | "all" => Ok(ExecutionMode::CollectAll),
            "fail-fast" | "fail_fast" | "first" => Ok(ExecutionMode::FailFast),
            other => Err(format!(
                "Unknown execution mode '{}'. Expected collect-all or fail-fast",
                other
            )),
        }
    }
}

/// Executor settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Read the mode from `ENVGUARD_MODE`, falling back to the default
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MODE_ENV_VAR) {
            match raw.parse() {
                Ok(mode) => config.mode = mode,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring {}", MODE_ENV_VAR),
            }
        }
        config
    }
}

/// A value located by resolving an instruction path
struct Target<'v> {
    path: LocationPath,
    indices: Vec<usize>,
    value: &'v Value,
}

/// Position of an error in the final report
type SortKey = (usize, Vec<usize>);

struct Execution {
    errors: Vec<(SortKey, ValidationError)>,
    checks_total: usize,
    async_checks: usize,
}

/// Runs compiled plans
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate environment input
    pub async fn run(&self, plan: &ValidationPlan, input: &EnvInput) -> ValidationReport {
        self.run_document(plan, input.to_document()).await
    }

    /// Validate an already structured document
    ///
    /// String leaves are still coerced following the plan's type hints.
    pub async fn run_document(&self, plan: &ValidationPlan, document: Value) -> ValidationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::debug!(
            run_id = %run_id,
            mode = %self.config.mode,
            instructions = plan.len(),
            "Starting validation run"
        );

        let execution = self.execute(plan, document).await;
        let checks_total = execution.checks_total;
        let async_checks = execution.async_checks;
        let errors: Vec<ValidationError> = execution.errors.into_iter().map(|(_, e)| e).collect();
        let checks_failed = errors.len();
        let outcome = ErrorReporter::finish(errors);
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            run_id = %run_id,
            valid = outcome.is_valid(),
            checks = checks_total,
            failed = checks_failed,
            duration_ms = duration_ms,
            "Validation run complete"
        );

        ValidationReport {
            run_id,
            started_at,
            duration_ms,
            mode: self.config.mode,
            checks_total,
            checks_failed,
            async_checks,
            plan_fingerprint: plan.fingerprint().to_string(),
            outcome,
        }
    }

    async fn execute(&self, plan: &ValidationPlan, document: Value) -> Execution {
        let data = plan.shape().apply(document);
        let fail_fast = self.config.mode == ExecutionMode::FailFast;

        let mut errors = Vec::new();
        let mut pending = FuturesUnordered::new();
        let mut checks_total = 0;
        let mut async_checks = 0;

        'plan: for instruction in plan.instructions() {
            for target in resolve(&data, instruction) {
                checks_total += 1;

                if let Check::Predicate { .. } = instruction.check {
                    async_checks += 1;
                    tracing::debug!(
                        index = instruction.index,
                        path = %target.path,
                        "Dispatching async check"
                    );
                    pending.push(run_predicate(
                        instruction,
                        target.path,
                        target.indices,
                        target.value.clone(),
                    ));
                    continue;
                }

                if let Some(message) = checks::evaluate(&instruction.check, target.value) {
                    let path = match &instruction.check {
                        Check::Presence { property } => target.path.child(property),
                        _ => target.path,
                    };
                    let error = failure(
                        instruction,
                        path,
                        instruction.keyword.as_str().to_string(),
                        message,
                        instruction.params.clone(),
                    );
                    errors.push(((instruction.index, target.indices), error));

                    if fail_fast {
                        tracing::debug!(
                            index = instruction.index,
                            "Stopping dispatch at first failure"
                        );
                        break 'plan;
                    }
                }
            }
        }

        while let Some(result) = pending.next().await {
            if let Some(error) = result {
                errors.push(error);
            }
        }

        errors.sort_by(|a, b| a.0.cmp(&b.0));
        if fail_fast {
            errors.truncate(1);
        }

        Execution {
            errors,
            checks_total,
            async_checks,
        }
    }
}

/// Validate a plain string map against a plan
pub async fn validate(
    plan: &ValidationPlan,
    env: &HashMap<String, String>,
    mode: ExecutionMode,
) -> ValidationOutcome {
    let input: EnvInput = env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Executor::new(ExecutorConfig::new().with_mode(mode))
        .run(plan, &input)
        .await
        .outcome
}

async fn run_predicate(
    instruction: &CheckInstruction,
    path: LocationPath,
    indices: Vec<usize>,
    value: Value,
) -> Option<(SortKey, ValidationError)> {
    let Check::Predicate { id, predicate, params } = &instruction.check else {
        return None;
    };

    let result = AssertUnwindSafe(predicate.check(&value, params))
        .catch_unwind()
        .await;

    let error = match result {
        Ok(Ok(true)) => return None,
        Ok(Ok(false)) => {
            let message = if instruction.keyword == Keyword::Format {
                format!("must match format \"{}\"", id)
            } else {
                format!("must pass \"{}\" validation", id)
            };
            failure(
                instruction,
                path,
                instruction.keyword.as_str().to_string(),
                message,
                instruction.params.clone(),
            )
        }
        Ok(Err(e)) => {
            let keyword = e.keyword.unwrap_or_else(|| instruction.keyword.as_str().to_string());
            let params = if e.params.is_null() {
                instruction.params.clone()
            } else {
                e.params
            };
            failure(instruction, path, keyword, e.message, params)
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::warn!(
                predicate = %id,
                path = %path,
                reason = %reason,
                "Async predicate panicked"
            );
            failure(
                instruction,
                path,
                instruction.keyword.as_str().to_string(),
                format!("predicate \"{}\" failed: {}", id, reason),
                instruction.params.clone(),
            )
        }
    };

    Some(((instruction.index, indices), error))
}

fn failure(
    instruction: &CheckInstruction,
    path: LocationPath,
    keyword: String,
    message: String,
    params: Value,
) -> ValidationError {
    ValidationError {
        path,
        keyword,
        message,
        params,
        schema_path: instruction.schema_path.clone(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Resolve the values an instruction applies to
///
/// Presence checks resolve to the parent object of the required property.
/// A missing intermediate value yields no target, so the check passes.
fn resolve<'v>(data: &'v Value, instruction: &CheckInstruction) -> Vec<Target<'v>> {
    let tokens = match (&instruction.check, instruction.path.tokens().split_last()) {
        (Check::Presence { .. }, Some((_, parent))) => parent,
        _ => instruction.path.tokens(),
    };

    let mut out = Vec::new();
    resolve_into(data, tokens, LocationPath::root(), Vec::new(), &mut out);
    out
}

fn resolve_into<'v>(
    value: &'v Value,
    tokens: &[PathToken],
    path: LocationPath,
    indices: Vec<usize>,
    out: &mut Vec<Target<'v>>,
) {
    let Some((token, rest)) = tokens.split_first() else {
        out.push(Target { path, indices, value });
        return;
    };

    match token {
        PathToken::Property(name) => {
            if let Some(child) = value.as_object().and_then(|m| m.get(name)) {
                resolve_into(child, rest, path.child(name.as_str()), indices, out);
            }
        }
        PathToken::Index(i) => {
            if let Some(child) = value.as_array().and_then(|a| a.get(*i)) {
                let mut indices = indices;
                indices.push(*i);
                resolve_into(child, rest, path.index(*i), indices, out);
            }
        }
        PathToken::EachItem => {
            if let Some(items) = value.as_array() {
                for (i, child) in items.iter().enumerate() {
                    let mut indices = indices.clone();
                    indices.push(i);
                    resolve_into(child, rest, path.index(i), indices, out);
                }
            }
        }
    }
}
