//! Schema compiler
//!
//! Flattens a [`Schema`] tree into a [`ValidationPlan`]: an ordered list of
//! [`CheckInstruction`]s, each bound to a location path and to a compiled
//! check. The walk is depth-first. At every schema object it emits
//!
//! 1. one instruction per directly checkable keyword, in declaration order;
//! 2. one `presence` instruction per `required` name, located at the
//!    property itself;
//! 3. the instructions of each `properties` child, in declaration order;
//! 4. the instructions of the `items` schema under the `[*]` wildcard.
//!
//! This order is the order in which errors are reported.

mod format;

pub use format::Format;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::coerce::ShapeHint;
use crate::error::CompileError;
use crate::path::{LocationPath, PathToken};
use crate::predicate::{AsyncPredicate, PredicateRegistry};
use crate::schema::{child_pointer, Keyword, Schema, SchemaNode, TypeName, TypeSet};

/// Compiled form of a single keyword
#[derive(Clone)]
pub(crate) enum Check {
    Presence { property: String },
    Type(TypeSet),
    Enum(Vec<Value>),
    MinLength(u64),
    MaxLength(u64),
    Minimum(f64),
    Maximum(f64),
    Pattern(Regex),
    Format(Format),
    Predicate {
        id: String,
        predicate: Arc<dyn AsyncPredicate>,
        params: Value,
    },
}

impl Check {
    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Check::Predicate { .. })
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Presence { property } => f.debug_tuple("Presence").field(property).finish(),
            Check::Type(types) => f.debug_tuple("Type").field(types).finish(),
            Check::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            Check::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Check::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Check::Minimum(n) => f.debug_tuple("Minimum").field(n).finish(),
            Check::Maximum(n) => f.debug_tuple("Maximum").field(n).finish(),
            Check::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Check::Format(format) => f.debug_tuple("Format").field(format).finish(),
            Check::Predicate { id, params, .. } => f
                .debug_struct("Predicate")
                .field("id", id)
                .field("params", params)
                .finish(),
        }
    }
}

/// One executable check of a plan
#[derive(Debug, Clone, Serialize)]
pub struct CheckInstruction {
    /// Position in the plan; errors are reported in this order
    pub index: usize,
    /// Where in the input the check applies; may contain `[*]`
    pub path: LocationPath,
    /// JSON pointer of the originating keyword in the schema
    pub schema_path: String,
    pub keyword: Keyword,
    pub params: Value,
    pub is_async: bool,
    #[serde(skip)]
    pub(crate) check: Check,
}

/// Immutable, executable form of a schema
///
/// A plan owns everything it needs (compiled regexes, bound predicates)
/// and can be shared across tasks behind an `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationPlan {
    instructions: Vec<CheckInstruction>,
    shape: ShapeHint,
    fingerprint: String,
    is_async: bool,
}

impl ValidationPlan {
    pub fn instructions(&self) -> &[CheckInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions that dispatch a predicate
    pub fn async_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_async).count()
    }

    /// Whether running the plan involves async predicates or the schema
    /// was marked `$async`
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Declared types used to coerce string input
    pub fn shape(&self) -> &ShapeHint {
        &self.shape
    }

    /// Hex sha256 over the instruction list
    ///
    /// Two compilations of the same schema yield the same fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Compiles schemas against a predicate table
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    registry: &'r PredicateRegistry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r PredicateRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, schema: &Schema) -> Result<ValidationPlan, CompileError> {
        let mut instructions = Vec::new();
        self.compile_object(schema, &LocationPath::root(), "#", &mut instructions)?;

        let fingerprint = fingerprint(&instructions);
        let is_async = schema.is_async() || instructions.iter().any(|i| i.is_async);

        let plan = ValidationPlan {
            instructions,
            shape: ShapeHint::from_schema(schema),
            fingerprint,
            is_async,
        };

        tracing::debug!(
            instructions = plan.len(),
            async_checks = plan.async_count(),
            fingerprint = %plan.fingerprint(),
            "Compiled validation plan"
        );

        Ok(plan)
    }

    fn compile_object(
        &self,
        schema: &Schema,
        path: &LocationPath,
        pointer: &str,
        out: &mut Vec<CheckInstruction>,
    ) -> Result<(), CompileError> {
        check_compatibility(schema, pointer)?;
        check_bounds(schema, pointer)?;

        for node in schema.nodes() {
            if let Some((check, params)) = self.compile_direct(node, pointer)? {
                let schema_path = format!("{}/{}", pointer, node.keyword());
                push(out, path.clone(), schema_path, node.keyword(), params, check);
            }
        }

        for name in schema.required() {
            push(
                out,
                path.child(name),
                format!("{}/required", pointer),
                Keyword::Presence,
                json!({ "missingProperty": name }),
                Check::Presence {
                    property: name.to_string(),
                },
            );
        }

        for prop in schema.properties() {
            let token = PathToken::Property(prop.name.clone());
            let pointer = child_pointer(pointer, &token);
            self.compile_object(&prop.schema, &path.child(&prop.name), &pointer, out)?;
        }

        if let Some(items) = schema.items() {
            let pointer = child_pointer(pointer, &PathToken::EachItem);
            self.compile_object(items, &path.each_item(), &pointer, out)?;
        }

        Ok(())
    }

    /// Checks that apply to the value at the node's own location
    fn compile_direct(
        &self,
        node: &SchemaNode,
        pointer: &str,
    ) -> Result<Option<(Check, Value)>, CompileError> {
        let check = match node {
            SchemaNode::Type(types) => Check::Type(types.clone()),
            SchemaNode::Enum(values) => Check::Enum(values.clone()),
            SchemaNode::MinLength(n) => Check::MinLength(*n),
            SchemaNode::MaxLength(n) => Check::MaxLength(*n),
            SchemaNode::Minimum(n) => Check::Minimum(*n),
            SchemaNode::Maximum(n) => Check::Maximum(*n),
            SchemaNode::Pattern(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| CompileError::InvalidPattern {
                    path: pointer.to_string(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Check::Pattern(regex)
            }
            SchemaNode::Format(name) => self.resolve_format(name, pointer)?,
            SchemaNode::CustomAsync { predicate, params } => {
                let bound = self.registry.get(predicate).ok_or_else(|| {
                    CompileError::UnresolvedPredicate {
                        path: pointer.to_string(),
                        predicate: predicate.clone(),
                    }
                })?;
                Check::Predicate {
                    id: predicate.clone(),
                    predicate: bound,
                    params: params.clone(),
                }
            }
            SchemaNode::Required(_) | SchemaNode::Properties(_) | SchemaNode::Items(_) => {
                return Ok(None)
            }
        };

        Ok(Some((check, node.params())))
    }

    /// Registered predicates shadow built-in formats of the same name
    fn resolve_format(&self, name: &str, pointer: &str) -> Result<Check, CompileError> {
        if let Some(predicate) = self.registry.get(name) {
            return Ok(Check::Predicate {
                id: name.to_string(),
                predicate,
                params: Value::Null,
            });
        }

        Format::from_name(name)
            .map(Check::Format)
            .ok_or_else(|| CompileError::UnknownFormat {
                path: pointer.to_string(),
                format: name.to_string(),
            })
    }
}

/// Compile `schema` against `registry`
pub fn compile(schema: &Schema, registry: &PredicateRegistry) -> Result<ValidationPlan, CompileError> {
    Compiler::new(registry).compile(schema)
}

fn push(
    out: &mut Vec<CheckInstruction>,
    path: LocationPath,
    schema_path: String,
    keyword: Keyword,
    params: Value,
    check: Check,
) {
    out.push(CheckInstruction {
        index: out.len(),
        path,
        schema_path,
        keyword,
        params,
        is_async: check.is_async(),
        check,
    });
}

fn check_compatibility(schema: &Schema, pointer: &str) -> Result<(), CompileError> {
    let Some(declared) = schema.declared_types() else {
        return Ok(());
    };

    for node in schema.nodes() {
        let compatible = match node {
            SchemaNode::Properties(_) | SchemaNode::Required(_) => declared.contains(TypeName::Object),
            SchemaNode::Items(_) => declared.contains(TypeName::Array),
            SchemaNode::MinLength(_) | SchemaNode::MaxLength(_) | SchemaNode::Pattern(_) => {
                declared.contains(TypeName::String)
            }
            SchemaNode::Minimum(_) | SchemaNode::Maximum(_) => declared.is_numeric(),
            _ => true,
        };

        if !compatible {
            return Err(CompileError::IncompatibleType {
                path: pointer.to_string(),
                keyword: node.keyword().to_string(),
                declared: declared.to_string(),
            });
        }
    }

    Ok(())
}

fn check_bounds(schema: &Schema, pointer: &str) -> Result<(), CompileError> {
    let find = |pick: fn(&SchemaNode) -> Option<f64>| schema.nodes().iter().find_map(pick);

    let min_len = find(|n| match n {
        SchemaNode::MinLength(v) => Some(*v as f64),
        _ => None,
    });
    let max_len = find(|n| match n {
        SchemaNode::MaxLength(v) => Some(*v as f64),
        _ => None,
    });
    if let (Some(lo), Some(hi)) = (min_len, max_len) {
        if lo > hi {
            return Err(CompileError::InvalidBounds {
                path: pointer.to_string(),
                reason: format!("minLength {} exceeds maxLength {}", lo, hi),
            });
        }
    }

    let minimum = find(|n| match n {
        SchemaNode::Minimum(v) => Some(*v),
        _ => None,
    });
    let maximum = find(|n| match n {
        SchemaNode::Maximum(v) => Some(*v),
        _ => None,
    });
    if let (Some(lo), Some(hi)) = (minimum, maximum) {
        if lo > hi {
            return Err(CompileError::InvalidBounds {
                path: pointer.to_string(),
                reason: format!("minimum {} exceeds maximum {}", lo, hi),
            });
        }
    }

    Ok(())
}

fn fingerprint(instructions: &[CheckInstruction]) -> String {
    let mut hasher = Sha256::new();
    for instruction in instructions {
        hasher.update(instruction.index.to_le_bytes());
        for token in instruction.path.tokens() {
            match token {
                PathToken::Property(name) => {
                    hasher.update([b'p']);
                    hasher.update((name.len() as u64).to_le_bytes());
                    hasher.update(name.as_bytes());
                }
                PathToken::Index(i) => {
                    hasher.update([b'i']);
                    hasher.update((*i as u64).to_le_bytes());
                }
                PathToken::EachItem => hasher.update([b'*']),
            }
        }
        hasher.update([0u8]);
        hasher.update(instruction.keyword.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(instruction.params.to_string().as_bytes());
        hasher.update([instruction.is_async as u8]);
    }
    hex::encode(hasher.finalize())
}
