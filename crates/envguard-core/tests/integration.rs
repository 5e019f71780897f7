//! Integration tests for envguard-core
//!
//! Covers the end-to-end path from schema document to report:
//! - required keys, type coercion and async predicates
//! - error ordering under varied async completion times
//! - determinism and idempotence of compile and validate
//! - fail-fast mode and predicate faults
//! - schema and dotenv sources on disk

use envguard_core::{
    compile, load_schema_file, EnvInput, EnvValidator, ExecutionMode, Executor, ExecutorConfig,
    PredicateError, PredicateRegistry, Schema, ValidationOutcome, ValidationPlan,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

fn env(pairs: &[(&str, &str)]) -> EnvInput {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn plan_for(doc: Value, registry: &PredicateRegistry) -> ValidationPlan {
    let schema = Schema::from_value(&doc, registry).expect("schema should parse");
    compile(&schema, registry).expect("schema should compile")
}

fn port_schema() -> Value {
    json!({
        "type": "object",
        "required": ["PORT"],
        "properties": { "PORT": { "type": "integer" } }
    })
}

/// Registry with a stand-in for DNS resolution that only knows `good.example`
fn mock_dns_registry() -> PredicateRegistry {
    let mut registry = PredicateRegistry::new();
    registry
        .register_fn("dns-resolvable", |value, _params| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, PredicateError>(value.as_str() == Some("good.example"))
        })
        .unwrap();
    registry
}

async fn run(plan: &ValidationPlan, input: &EnvInput) -> ValidationOutcome {
    Executor::default().run(plan, input).await.outcome
}

#[tokio::test]
async fn test_missing_required_key_reports_presence() {
    let plan = plan_for(port_schema(), &PredicateRegistry::new());

    let outcome = run(&plan, &EnvInput::new()).await;

    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword, "presence");
    assert_eq!(errors[0].path.to_string(), "PORT");
}

#[tokio::test]
async fn test_non_numeric_port_reports_type() {
    let plan = plan_for(port_schema(), &PredicateRegistry::new());

    let outcome = run(&plan, &env(&[("PORT", "abc")])).await;

    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword, "type");
    assert_eq!(errors[0].path.to_string(), "PORT");
    assert_eq!(errors[0].message, "must be integer");
}

#[tokio::test]
async fn test_numeric_port_is_valid() {
    let plan = plan_for(port_schema(), &PredicateRegistry::new());

    let outcome = run(&plan, &env(&[("PORT", "8080")])).await;

    assert_eq!(outcome, ValidationOutcome::Valid);
}

#[tokio::test]
async fn test_async_predicate_on_host() {
    let registry = mock_dns_registry();
    let plan = plan_for(
        json!({ "properties": { "HOST": { "custom-async": "dns-resolvable" } } }),
        &registry,
    );

    let outcome = run(&plan, &env(&[("HOST", "bad.invalid")])).await;
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword, "custom-async");
    assert_eq!(errors[0].path.to_string(), "HOST");

    let outcome = run(&plan, &env(&[("HOST", "good.example")])).await;
    assert!(outcome.is_valid());
}

#[tokio::test]
async fn test_mixed_failures_keep_declaration_order() {
    let registry = mock_dns_registry();
    let plan = plan_for(
        json!({
            "properties": {
                "PORT": { "type": "integer" },
                "HOST": { "custom-async": "dns-resolvable" },
                "API_KEY": { "type": "string", "minLength": 32 }
            }
        }),
        &registry,
    );

    let outcome = run(
        &plan,
        &env(&[("PORT", "abc"), ("HOST", "bad.invalid"), ("API_KEY", "short")]),
    )
    .await;

    let summary: Vec<(String, &str)> = outcome
        .errors()
        .iter()
        .map(|e| (e.path.to_string(), e.keyword.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("PORT".to_string(), "type"),
            ("HOST".to_string(), "custom-async"),
            ("API_KEY".to_string(), "minLength"),
        ]
    );
}

#[tokio::test]
async fn test_nested_object_and_array_values() {
    let plan = plan_for(
        json!({
            "type": "object",
            "required": ["DATABASE", "ALLOWED_ORIGINS"],
            "properties": {
                "DATABASE": {
                    "type": "object",
                    "required": ["host", "port"],
                    "properties": {
                        "host": { "type": "string", "format": "hostname" },
                        "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
                    }
                },
                "ALLOWED_ORIGINS": {
                    "type": "array",
                    "items": { "type": "string", "format": "uri" }
                }
            }
        }),
        &PredicateRegistry::new(),
    );

    let good = env(&[
        ("DATABASE", r#"{"host": "db.internal", "port": "5432"}"#),
        ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
    ]);
    assert!(run(&plan, &good).await.is_valid());

    let bad = env(&[
        ("DATABASE", r#"{"host": "-db", "port": 70000}"#),
        ("ALLOWED_ORIGINS", "https://a.example,not a uri"),
    ]);
    let rendered: Vec<String> = run(&plan, &bad)
        .await
        .errors()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "DATABASE.host must match format \"hostname\"".to_string(),
            "DATABASE.port must be <= 65535".to_string(),
            "ALLOWED_ORIGINS[1] must match format \"uri\"".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_fail_fast_reports_earliest_failure() {
    let registry = mock_dns_registry();
    let plan = plan_for(
        json!({
            "properties": {
                "HOST": { "custom-async": "dns-resolvable" },
                "PORT": { "type": "integer" },
                "API_KEY": { "minLength": 32 }
            }
        }),
        &registry,
    );
    let input = env(&[("HOST", "bad.invalid"), ("PORT", "abc"), ("API_KEY", "short")]);

    let validator = EnvValidator::from_value(
        &json!({
            "properties": {
                "HOST": { "custom-async": "dns-resolvable" },
                "PORT": { "type": "integer" },
                "API_KEY": { "minLength": 32 }
            }
        }),
        &registry,
        ExecutorConfig::new().with_mode(ExecutionMode::FailFast),
    )
    .unwrap();
    assert_eq!(validator.plan().fingerprint(), plan.fingerprint());

    let report = validator.validate(&input).await;
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].path.to_string(), "HOST");
    assert_eq!(report.checks_total, 2);

    let failure = validator.check(&input).await.unwrap_err();
    assert_eq!(failure.errors.len(), 1);
}

#[tokio::test]
async fn test_free_validate_function() {
    let plan = plan_for(port_schema(), &PredicateRegistry::new());
    let mut map = HashMap::new();
    map.insert("PORT".to_string(), "abc".to_string());

    let outcome = envguard_core::validate(&plan, &map, ExecutionMode::CollectAll).await;
    assert!(!outcome.is_valid());
    assert_eq!(outcome.first_error().unwrap().keyword, "type");
}

#[test]
fn test_compile_is_deterministic() {
    let registry = PredicateRegistry::with_builtins();
    let doc = json!({
        "required": ["PORT", "DB_HOST"],
        "properties": {
            "PORT": { "type": "integer" },
            "DB_HOST": { "type": "string", "custom-async": "dns-resolvable" },
            "HOSTS": { "type": "array", "items": { "format": "hostname" } }
        }
    });

    let a = plan_for(doc.clone(), &registry);
    let b = plan_for(doc, &registry);

    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(
        serde_json::to_value(a.instructions()).unwrap(),
        serde_json::to_value(b.instructions()).unwrap()
    );
}

#[tokio::test]
async fn test_schema_and_env_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    let schema_path = dir.path().join("env.schema.yaml");
    std::fs::write(
        &schema_path,
        "type: object\nrequired: [PORT, LOG_LEVEL]\nproperties:\n  PORT:\n    type: integer\n  LOG_LEVEL:\n    enum: [debug, info, warn]\n",
    )
    .unwrap();

    let env_path = dir.path().join("service.env");
    std::fs::write(&env_path, "# local overrides\nPORT=8080 # http port\nLOG_LEVEL=\"verbose\"\n").unwrap();

    let doc = load_schema_file(&schema_path).unwrap();
    let validator =
        EnvValidator::from_value(&doc, &PredicateRegistry::new(), ExecutorConfig::default()).unwrap();
    let input = EnvInput::from_dotenv_file(&env_path).unwrap();

    let report = validator.validate(&input).await;
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].keyword, "enum");
    assert_eq!(report.errors()[0].path.to_string(), "LOG_LEVEL");
}

/// Schema with `n` keys: even keys carry an integer type check, odd keys an
/// async predicate that sleeps for a caller-chosen delay before failing.
fn interleaved(n: usize, delays: Vec<u64>) -> (ValidationPlan, EnvInput) {
    let mut registry = PredicateRegistry::new();
    let delays = std::sync::Arc::new(delays);
    registry
        .register_fn("delayed-reject", move |value, _params| {
            let delays = delays.clone();
            async move {
                let slot: usize = value
                    .as_str()
                    .and_then(|s| s.trim_start_matches("k").parse().ok())
                    .unwrap_or(0);
                let delay = delays.get(slot).copied().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, PredicateError>(false)
            }
        })
        .unwrap();

    let mut properties = serde_json::Map::new();
    let mut input = EnvInput::new();
    for i in 0..n {
        let key = format!("KEY_{:02}", i);
        if i % 2 == 0 {
            properties.insert(key.clone(), json!({ "type": "integer" }));
            input.set(key, "not-a-number");
        } else {
            properties.insert(key.clone(), json!({ "custom-async": "delayed-reject" }));
            input.set(key, format!("k{}", i));
        }
    }

    let plan = plan_for(json!({ "properties": properties }), &registry);
    (plan, input)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_errors_follow_plan_order(
        n in 1usize..10,
        delays in proptest::collection::vec(0u64..15, 10),
    ) {
        let (plan, input) = interleaved(n, delays);

        let outcome = tokio_test::block_on(async {
            Executor::default().run(&plan, &input).await.outcome
        });

        let paths: Vec<String> = outcome.errors().iter().map(|e| e.path.to_string()).collect();
        let expected: Vec<String> = (0..n).map(|i| format!("KEY_{:02}", i)).collect();
        prop_assert_eq!(paths, expected);
    }

    #[test]
    fn prop_validation_is_idempotent(port in "[0-9a-z]{0,6}") {
        let plan = plan_for(
            json!({
                "required": ["PORT"],
                "properties": { "PORT": { "type": "integer", "minimum": 1, "maximum": 65535 } }
            }),
            &PredicateRegistry::new(),
        );
        let input = env(&[("PORT", port.as_str())]);

        let (first, second) = tokio_test::block_on(async {
            let executor = Executor::default();
            let first = executor.run(&plan, &input).await;
            let second = executor.run(&plan, &input).await;
            (first, second)
        });

        prop_assert_eq!(first.outcome, second.outcome);
        prop_assert_eq!(first.checks_total, second.checks_total);
    }

    #[test]
    fn prop_error_count_matches_failed_checks(values in proptest::collection::vec("[0-9x]{1,3}", 1..8)) {
        let mut properties = serde_json::Map::new();
        let mut input = EnvInput::new();
        for (i, v) in values.iter().enumerate() {
            let key = format!("N{}", i);
            properties.insert(key.clone(), json!({ "type": "integer" }));
            input.set(key, v.clone());
        }
        let plan = plan_for(json!({ "properties": properties }), &PredicateRegistry::new());

        let report = tokio_test::block_on(Executor::default().run(&plan, &input));
        let expected = values.iter().filter(|v| v.parse::<i64>().is_err()).count();
        prop_assert_eq!(report.errors().len(), expected);
        prop_assert_eq!(report.checks_failed, expected);
    }
}
