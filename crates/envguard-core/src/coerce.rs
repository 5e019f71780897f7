//! String coercion
//!
//! Environment values arrive as strings. Before checks run, the executor
//! derives a typed copy of the input by following the `type` declarations
//! of the schema. Coercion never fails: a string that cannot be read as
//! any declared type stays a string and the `type` check reports it.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::schema::{Schema, TypeName, TypeSet};

/// Declared types per location, mirroring the schema tree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapeHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, ShapeHint)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ShapeHint>>,
}

impl ShapeHint {
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            types: schema.declared_types().cloned(),
            properties: schema
                .properties()
                .map(|p| (p.name.clone(), ShapeHint::from_schema(&p.schema)))
                .collect(),
            items: schema.items().map(|s| Box::new(ShapeHint::from_schema(s))),
        }
    }

    /// Produce the typed view of `value`
    pub fn apply(&self, value: Value) -> Value {
        let value = match (value, &self.types) {
            (Value::String(s), Some(types)) => coerce_str(s, types),
            (other, _) => other,
        };

        match value {
            Value::Object(mut map) => {
                for (name, hint) in &self.properties {
                    if let Some(slot) = map.get_mut(name) {
                        let taken = slot.take();
                        *slot = hint.apply(taken);
                    }
                }
                Value::Object(map)
            }
            Value::Array(items) => match &self.items {
                Some(hint) => Value::Array(items.into_iter().map(|v| hint.apply(v)).collect()),
                None => Value::Array(items),
            },
            other => other,
        }
    }
}

fn coerce_str(raw: String, types: &TypeSet) -> Value {
    if types.contains(TypeName::String) {
        return Value::String(raw);
    }

    for t in types.types() {
        if let Some(v) = coerce_as(&raw, *t) {
            return v;
        }
    }

    Value::String(raw)
}

/// Signed first, then unsigned for values above `i64::MAX`
fn parse_integer(raw: &str) -> Option<Value> {
    match raw.parse::<i64>() {
        Ok(n) => Some(Value::from(n)),
        Err(_) => raw.parse::<u64>().ok().map(Value::from),
    }
}

fn coerce_as(raw: &str, t: TypeName) -> Option<Value> {
    let trimmed = raw.trim();
    match t {
        TypeName::Integer => parse_integer(trimmed),
        TypeName::Number => parse_integer(trimmed).or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }),
        TypeName::Boolean => match trimmed {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        TypeName::Null => raw.is_empty().then_some(Value::Null),
        TypeName::Array => {
            if trimmed.starts_with('[') {
                serde_json::from_str::<Value>(trimmed)
                    .ok()
                    .filter(Value::is_array)
            } else if trimmed.is_empty() {
                Some(Value::Array(Vec::new()))
            } else {
                Some(Value::Array(
                    trimmed
                        .split(',')
                        .map(|part| Value::String(part.trim().to_string()))
                        .collect(),
                ))
            }
        }
        TypeName::Object => {
            if trimmed.starts_with('{') {
                serde_json::from_str::<Map<String, Value>>(trimmed)
                    .ok()
                    .map(Value::Object)
            } else {
                None
            }
        }
        TypeName::String => Some(Value::String(raw.to_string())),
    }
}
