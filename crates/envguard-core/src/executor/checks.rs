//! Synchronous keyword checks
//!
//! Each check is a total function over a resolved value: it returns the
//! violation message or `None`. Keywords only constrain values of the
//! kind they speak about; a number never fails `minLength`.

use serde_json::Value;

use crate::compiler::Check;

/// Evaluate a sync check, returning the failure message
pub(crate) fn evaluate(check: &Check, value: &Value) -> Option<String> {
    match check {
        Check::Presence { property } => match value {
            Value::Object(map) if !map.contains_key(property) => {
                Some(format!("must have required property '{}'", property))
            }
            _ => None,
        },
        Check::Type(types) => {
            (!types.matches(value)).then(|| format!("must be {}", types))
        }
        Check::Enum(allowed) => (!allowed.iter().any(|a| values_equal(a, value)))
            .then(|| "must be equal to one of the allowed values".to_string()),
        Check::MinLength(limit) => value.as_str().and_then(|s| {
            ((s.chars().count() as u64) < *limit)
                .then(|| format!("must NOT have fewer than {} characters", limit))
        }),
        Check::MaxLength(limit) => value.as_str().and_then(|s| {
            ((s.chars().count() as u64) > *limit)
                .then(|| format!("must NOT have more than {} characters", limit))
        }),
        Check::Minimum(limit) => value
            .as_f64()
            .and_then(|n| (n < *limit).then(|| format!("must be >= {}", limit))),
        Check::Maximum(limit) => value
            .as_f64()
            .and_then(|n| (n > *limit).then(|| format!("must be <= {}", limit))),
        Check::Pattern(regex) => value.as_str().and_then(|s| {
            (!regex.is_match(s)).then(|| format!("must match pattern \"{}\"", regex.as_str()))
        }),
        Check::Format(format) => value.as_str().and_then(|s| {
            (!format.matches(s)).then(|| format!("must match format \"{}\"", format.name()))
        }),
        Check::Predicate { .. } => None,
    }
}

/// JSON equality where numbers compare by value (`1` equals `1.0`)
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}
