//! Compile-once, validate-many front end

use serde_json::Value;
use std::sync::Arc;

use crate::compiler::{compile, ValidationPlan};
use crate::executor::{Executor, ExecutorConfig};
use crate::predicate::PredicateRegistry;
use crate::report::{ValidationFailure, ValidationReport};
use crate::schema::Schema;
use crate::source::EnvInput;
use crate::Result;

/// A compiled schema paired with an executor
///
/// Cloning shares the plan.
#[derive(Debug, Clone)]
pub struct EnvValidator {
    plan: Arc<ValidationPlan>,
    executor: Executor,
}

impl EnvValidator {
    /// Parse and compile a raw schema document
    pub fn from_value(
        document: &Value,
        registry: &PredicateRegistry,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let schema = Schema::from_value(document, registry)?;
        Self::from_schema(&schema, registry, config)
    }

    /// Compile an already built schema
    pub fn from_schema(
        schema: &Schema,
        registry: &PredicateRegistry,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let plan = compile(schema, registry)?;
        Ok(Self {
            plan: Arc::new(plan),
            executor: Executor::new(config),
        })
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn config(&self) -> &ExecutorConfig {
        self.executor.config()
    }

    /// Run the plan and return the full report
    pub async fn validate(&self, input: &EnvInput) -> ValidationReport {
        self.executor.run(&self.plan, input).await
    }

    /// Run the plan, rejecting with every error when the input is invalid
    pub async fn check(&self, input: &EnvInput) -> std::result::Result<(), ValidationFailure> {
        self.validate(input).await.outcome.into_result()
    }
}
