use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use envguard_core::{compile, EnvInput, Executor, PredicateRegistry, Schema};
use serde_json::{json, Map, Value};

fn schema_doc(keys: usize) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for i in 0..keys {
        let name = format!("VAR_{}", i);
        let schema = match i % 4 {
            0 => json!({ "type": "integer", "minimum": 1, "maximum": 65535 }),
            1 => json!({ "type": "string", "minLength": 8, "pattern": "^[a-z0-9-]+$" }),
            2 => json!({ "type": "string", "format": "hostname" }),
            _ => json!({ "enum": ["debug", "info", "warn", "error"] }),
        };
        properties.insert(name.clone(), schema);
        required.push(name);
    }
    json!({ "type": "object", "required": required, "properties": properties })
}

fn input(keys: usize) -> EnvInput {
    (0..keys)
        .map(|i| {
            let value = match i % 4 {
                0 => "8080",
                1 => "service-name",
                2 => "db.internal",
                _ => "info",
            };
            (format!("VAR_{}", i), value.to_string())
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let registry = PredicateRegistry::new();
    let mut group = c.benchmark_group("compile");

    for keys in [10, 100] {
        let schema = Schema::from_value(&schema_doc(keys), &registry).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(keys), &schema, |b, schema| {
            b.iter(|| compile(black_box(schema), &registry).unwrap())
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let registry = PredicateRegistry::new();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let executor = Executor::default();
    let mut group = c.benchmark_group("validate");

    for keys in [10, 100] {
        let schema = Schema::from_value(&schema_doc(keys), &registry).unwrap();
        let plan = compile(&schema, &registry).unwrap();
        let env = input(keys);

        group.bench_with_input(BenchmarkId::from_parameter(keys), &env, |b, env| {
            b.to_async(&runtime)
                .iter(|| executor.run(black_box(&plan), black_box(env)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_validate);
criterion_main!(benches);
