//! Raw document to schema model
//!
//! Walks a JSON value (YAML and TOML documents are converted to JSON by the
//! sources first) and builds the tagged [`Schema`] tree, keeping key order.

use serde_json::{Map, Value};

use super::{child_pointer, Annotations, Keyword, PropertySchema, Schema, SchemaNode, TypeName, TypeSet};
use crate::error::SchemaError;
use crate::path::PathToken;

/// Keys carried for documentation only
const ANNOTATION_KEYS: [&str; 8] = [
    "$schema",
    "$id",
    "$comment",
    "$async",
    "title",
    "description",
    "default",
    "examples",
];

pub(super) fn parse_schema(value: &Value, pointer: &str) -> Result<Schema, SchemaError> {
    let map = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
        path: pointer.to_string(),
    })?;

    let mut nodes = Vec::with_capacity(map.len());
    let mut annotations = Annotations::default();

    for (key, param) in map {
        if ANNOTATION_KEYS.contains(&key.as_str()) {
            parse_annotation(&mut annotations, key, param, pointer)?;
            continue;
        }

        let keyword = Keyword::from_name(key).ok_or_else(|| SchemaError::UnknownKeyword {
            path: pointer.to_string(),
            keyword: key.clone(),
        })?;

        nodes.push(parse_node(keyword, param, pointer)?);
    }

    Schema::from_parts(nodes, annotations, pointer)
}

fn parse_annotation(
    annotations: &mut Annotations,
    key: &str,
    param: &Value,
    pointer: &str,
) -> Result<(), SchemaError> {
    match key {
        "title" => annotations.title = Some(expect_str(param, pointer, key)?.to_string()),
        "description" => {
            annotations.description = Some(expect_str(param, pointer, key)?.to_string())
        }
        "$async" => {
            annotations.is_async = param
                .as_bool()
                .ok_or_else(|| SchemaError::malformed(pointer, key, "expected a boolean"))?
        }
        _ => {}
    }
    Ok(())
}

fn parse_node(keyword: Keyword, param: &Value, pointer: &str) -> Result<SchemaNode, SchemaError> {
    let name = keyword.as_str();

    let node = match keyword {
        Keyword::Type => SchemaNode::Type(parse_types(param, pointer)?),
        Keyword::Required => {
            let items = param
                .as_array()
                .ok_or_else(|| SchemaError::malformed(pointer, name, "expected an array of strings"))?;
            let names = items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        SchemaError::malformed(pointer, name, "expected an array of strings")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            SchemaNode::Required(names)
        }
        Keyword::Properties => {
            let props = param
                .as_object()
                .ok_or_else(|| SchemaError::malformed(pointer, name, "expected an object"))?;
            SchemaNode::Properties(parse_properties(props, pointer)?)
        }
        Keyword::Items => {
            let items_pointer = child_pointer(pointer, &PathToken::EachItem);
            if param.is_array() {
                return Err(SchemaError::malformed(
                    pointer,
                    name,
                    "tuple-style items are not supported; expected a single schema",
                ));
            }
            SchemaNode::Items(Box::new(parse_schema(param, &items_pointer)?))
        }
        Keyword::Enum => {
            let values = param
                .as_array()
                .ok_or_else(|| SchemaError::malformed(pointer, name, "expected an array"))?;
            if values.is_empty() {
                return Err(SchemaError::malformed(pointer, name, "must list at least one value"));
            }
            SchemaNode::Enum(values.clone())
        }
        Keyword::Format => SchemaNode::Format(expect_str(param, pointer, name)?.to_string()),
        Keyword::MinLength => SchemaNode::MinLength(expect_u64(param, pointer, name)?),
        Keyword::MaxLength => SchemaNode::MaxLength(expect_u64(param, pointer, name)?),
        Keyword::Minimum => SchemaNode::Minimum(expect_f64(param, pointer, name)?),
        Keyword::Maximum => SchemaNode::Maximum(expect_f64(param, pointer, name)?),
        Keyword::Pattern => SchemaNode::Pattern(expect_str(param, pointer, name)?.to_string()),
        Keyword::CustomAsync => parse_custom_async(param, pointer)?,
        Keyword::Presence => {
            return Err(SchemaError::UnknownKeyword {
                path: pointer.to_string(),
                keyword: name.to_string(),
            })
        }
    };

    Ok(node)
}

fn parse_types(param: &Value, pointer: &str) -> Result<TypeSet, SchemaError> {
    let names: Vec<&str> = match param {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| SchemaError::malformed(pointer, "type", "expected type names"))
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(SchemaError::malformed(
                pointer,
                "type",
                "expected a type name or an array of type names",
            ))
        }
    };

    let types = names
        .into_iter()
        .map(|n| {
            TypeName::parse(n)
                .ok_or_else(|| SchemaError::malformed(pointer, "type", format!("unknown type '{}'", n)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    TypeSet::new(types).ok_or_else(|| SchemaError::malformed(pointer, "type", "must name at least one type"))
}

fn parse_properties(props: &Map<String, Value>, pointer: &str) -> Result<Vec<PropertySchema>, SchemaError> {
    props
        .iter()
        .map(|(prop_name, prop_schema)| {
            let prop_pointer = child_pointer(pointer, &PathToken::Property(prop_name.clone()));
            Ok(PropertySchema {
                name: prop_name.clone(),
                schema: parse_schema(prop_schema, &prop_pointer)?,
            })
        })
        .collect()
}

/// `"custom-async": "id"` or `"custom-async": { "predicate": "id", "params": ... }`
fn parse_custom_async(param: &Value, pointer: &str) -> Result<SchemaNode, SchemaError> {
    let name = Keyword::CustomAsync.as_str();

    match param {
        Value::String(id) => Ok(SchemaNode::CustomAsync {
            predicate: id.clone(),
            params: Value::Null,
        }),
        Value::Object(map) => {
            let predicate = map
                .get("predicate")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::malformed(pointer, name, "missing 'predicate' id"))?;
            if let Some(extra) = map.keys().find(|k| *k != "predicate" && *k != "params") {
                return Err(SchemaError::malformed(
                    pointer,
                    name,
                    format!("unexpected field '{}'", extra),
                ));
            }
            Ok(SchemaNode::CustomAsync {
                predicate: predicate.to_string(),
                params: map.get("params").cloned().unwrap_or(Value::Null),
            })
        }
        _ => Err(SchemaError::malformed(
            pointer,
            name,
            "expected a predicate id or an object with 'predicate' and 'params'",
        )),
    }
}

fn expect_str<'a>(param: &'a Value, pointer: &str, keyword: &str) -> Result<&'a str, SchemaError> {
    param
        .as_str()
        .ok_or_else(|| SchemaError::malformed(pointer, keyword, "expected a string"))
}

fn expect_u64(param: &Value, pointer: &str, keyword: &str) -> Result<u64, SchemaError> {
    param
        .as_u64()
        .ok_or_else(|| SchemaError::malformed(pointer, keyword, "expected a non-negative integer"))
}

fn expect_f64(param: &Value, pointer: &str, keyword: &str) -> Result<f64, SchemaError> {
    param
        .as_f64()
        .ok_or_else(|| SchemaError::malformed(pointer, keyword, "expected a number"))
}
