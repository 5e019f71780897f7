//! Schema model
//!
//! An immutable, tagged tree describing the constraints an environment
//! must satisfy. Each [`SchemaNode`] variant is one keyword with its
//! parameters; `properties` and `items` carry child [`Schema`]s.
//!
//! Schemas are built either from a raw document with
//! [`Schema::from_value`] or programmatically with [`Schema::builder`].
//! Both paths reject unknown keywords, `required` names without a matching
//! `properties` entry and duplicate property names. Parsing from a document
//! additionally checks every `custom-async` id against the predicate table.

mod builder;
mod parse;

pub use builder::SchemaBuilder;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::error::SchemaError;
use crate::path::{escape_pointer, PathToken};
use crate::predicate::PredicateRegistry;

/// Constraint keywords understood by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Keyword {
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "required")]
    Required,
    #[serde(rename = "properties")]
    Properties,
    #[serde(rename = "items")]
    Items,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "format")]
    Format,
    #[serde(rename = "minLength")]
    MinLength,
    #[serde(rename = "maxLength")]
    MaxLength,
    #[serde(rename = "minimum")]
    Minimum,
    #[serde(rename = "maximum")]
    Maximum,
    #[serde(rename = "pattern")]
    Pattern,
    #[serde(rename = "custom-async")]
    CustomAsync,
    /// Emitted by the compiler for each `required` name
    #[serde(rename = "presence")]
    Presence,
}

impl Keyword {
    /// Keywords accepted in a schema document, in no particular order
    pub const DOCUMENT_KEYWORDS: [Keyword; 12] = [
        Keyword::Type,
        Keyword::Required,
        Keyword::Properties,
        Keyword::Items,
        Keyword::Enum,
        Keyword::Format,
        Keyword::MinLength,
        Keyword::MaxLength,
        Keyword::Minimum,
        Keyword::Maximum,
        Keyword::Pattern,
        Keyword::CustomAsync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Type => "type",
            Keyword::Required => "required",
            Keyword::Properties => "properties",
            Keyword::Items => "items",
            Keyword::Enum => "enum",
            Keyword::Format => "format",
            Keyword::MinLength => "minLength",
            Keyword::MaxLength => "maxLength",
            Keyword::Minimum => "minimum",
            Keyword::Maximum => "maximum",
            Keyword::Pattern => "pattern",
            Keyword::CustomAsync => "custom-async",
            Keyword::Presence => "presence",
        }
    }

    /// Look up a document keyword by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::DOCUMENT_KEYWORDS
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-Schema primitive type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl TypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::String => "string",
            TypeName::Integer => "integer",
            TypeName::Number => "number",
            TypeName::Boolean => "boolean",
            TypeName::Null => "null",
            TypeName::Object => "object",
            TypeName::Array => "array",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(TypeName::String),
            "integer" => Some(TypeName::Integer),
            "number" => Some(TypeName::Number),
            "boolean" => Some(TypeName::Boolean),
            "null" => Some(TypeName::Null),
            "object" => Some(TypeName::Object),
            "array" => Some(TypeName::Array),
            _ => None,
        }
    }

    /// Check if a (possibly coerced) value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeName::String, Value::String(_)) => true,
            (TypeName::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            (TypeName::Number, Value::Number(_)) => true,
            (TypeName::Boolean, Value::Bool(_)) => true,
            (TypeName::Null, Value::Null) => true,
            (TypeName::Object, Value::Object(_)) => true,
            (TypeName::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty, duplicate-free list of accepted types in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSet(Vec<TypeName>);

impl TypeSet {
    /// Build a set, dropping duplicates. Returns `None` when empty.
    pub fn new(types: impl IntoIterator<Item = TypeName>) -> Option<Self> {
        let mut unique = Vec::new();
        for t in types {
            if !unique.contains(&t) {
                unique.push(t);
            }
        }
        if unique.is_empty() {
            None
        } else {
            Some(Self(unique))
        }
    }

    pub fn single(t: TypeName) -> Self {
        Self(vec![t])
    }

    pub fn contains(&self, t: TypeName) -> bool {
        self.0.contains(&t)
    }

    /// Whether any numeric type is accepted
    pub fn is_numeric(&self) -> bool {
        self.contains(TypeName::Integer) || self.contains(TypeName::Number)
    }

    pub fn types(&self) -> &[TypeName] {
        &self.0
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.0.iter().any(|t| t.matches(value))
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|t| t.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// A `properties` child tagged with its property name
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub schema: Schema,
}

/// One keyword of a schema together with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Type(TypeSet),
    Required(Vec<String>),
    Properties(Vec<PropertySchema>),
    Items(Box<Schema>),
    Enum(Vec<Value>),
    Format(String),
    MinLength(u64),
    MaxLength(u64),
    Minimum(f64),
    Maximum(f64),
    Pattern(String),
    CustomAsync { predicate: String, params: Value },
}

impl SchemaNode {
    pub fn keyword(&self) -> Keyword {
        match self {
            SchemaNode::Type(_) => Keyword::Type,
            SchemaNode::Required(_) => Keyword::Required,
            SchemaNode::Properties(_) => Keyword::Properties,
            SchemaNode::Items(_) => Keyword::Items,
            SchemaNode::Enum(_) => Keyword::Enum,
            SchemaNode::Format(_) => Keyword::Format,
            SchemaNode::MinLength(_) => Keyword::MinLength,
            SchemaNode::MaxLength(_) => Keyword::MaxLength,
            SchemaNode::Minimum(_) => Keyword::Minimum,
            SchemaNode::Maximum(_) => Keyword::Maximum,
            SchemaNode::Pattern(_) => Keyword::Pattern,
            SchemaNode::CustomAsync { .. } => Keyword::CustomAsync,
        }
    }

    /// Keyword-specific parameters as JSON
    ///
    /// Nodes with children report only their own configuration
    /// (property names, not the nested schemas).
    pub fn params(&self) -> Value {
        match self {
            SchemaNode::Type(types) => json!({ "type": types.to_string() }),
            SchemaNode::Required(names) => json!({ "required": names }),
            SchemaNode::Properties(props) => {
                let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
                json!({ "properties": names })
            }
            SchemaNode::Items(_) => json!({}),
            SchemaNode::Enum(values) => json!({ "allowedValues": values }),
            SchemaNode::Format(name) => json!({ "format": name }),
            SchemaNode::MinLength(n) | SchemaNode::MaxLength(n) => json!({ "limit": n }),
            SchemaNode::Minimum(n) => json!({ "comparison": ">=", "limit": n }),
            SchemaNode::Maximum(n) => json!({ "comparison": "<=", "limit": n }),
            SchemaNode::Pattern(p) => json!({ "pattern": p }),
            SchemaNode::CustomAsync { predicate, params } => {
                json!({ "predicate": predicate, "params": params })
            }
        }
    }

    /// Child schemas in declaration order, each with the path token
    /// that leads from this node's location to the child's
    pub fn children(&self) -> Vec<(PathToken, &Schema)> {
        match self {
            SchemaNode::Properties(props) => props
                .iter()
                .map(|p| (PathToken::Property(p.name.clone()), &p.schema))
                .collect(),
            SchemaNode::Items(schema) => vec![(PathToken::EachItem, schema.as_ref())],
            _ => Vec::new(),
        }
    }
}

/// Non-constraint metadata carried by a schema object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The document was marked `$async: true`
    #[serde(default)]
    pub is_async: bool,
}

/// One schema object: an ordered list of keyword nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    annotations: Annotations,
}

impl Schema {
    /// Parse a raw schema document
    ///
    /// Keyword order follows the document; this order later fixes the
    /// order of compiled checks and therefore of reported errors.
    pub fn from_value(value: &Value, registry: &PredicateRegistry) -> Result<Self, SchemaError> {
        let schema = parse::parse_schema(value, "#")?;
        schema.validate_against(registry)?;
        Ok(schema)
    }

    /// Start building a schema programmatically
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub(crate) fn from_parts(
        nodes: Vec<SchemaNode>,
        annotations: Annotations,
        pointer: &str,
    ) -> Result<Self, SchemaError> {
        let schema = Self { nodes, annotations };
        schema.check_structure(pointer)?;
        Ok(schema)
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_async(&self) -> bool {
        self.annotations.is_async
    }

    /// The first `type` declared on this schema object, if any
    pub fn declared_types(&self) -> Option<&TypeSet> {
        self.nodes.iter().find_map(|n| match n {
            SchemaNode::Type(types) => Some(types),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.nodes.iter().flat_map(|n| match n {
            SchemaNode::Properties(props) => props.as_slice(),
            _ => &[][..],
        })
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties().find(|p| p.name == name).map(|p| &p.schema)
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .flat_map(|n| match n {
                SchemaNode::Required(names) => names.as_slice(),
                _ => &[][..],
            })
            .map(|s| s.as_str())
    }

    pub fn items(&self) -> Option<&Schema> {
        self.nodes.iter().find_map(|n| match n {
            SchemaNode::Items(schema) => Some(schema.as_ref()),
            _ => None,
        })
    }

    /// Check that every `custom-async` id in the tree is registered
    pub fn validate_against(&self, registry: &PredicateRegistry) -> Result<(), SchemaError> {
        self.walk(&mut |pointer, node| match node {
            SchemaNode::CustomAsync { predicate, .. } if !registry.contains(predicate) => {
                Err(SchemaError::UnregisteredPredicate {
                    path: pointer.to_string(),
                    predicate: predicate.clone(),
                })
            }
            _ => Ok(()),
        })
    }

    /// Visit every node depth-first with its schema pointer
    pub fn walk<F>(&self, visit: &mut F) -> Result<(), SchemaError>
    where
        F: FnMut(&str, &SchemaNode) -> Result<(), SchemaError>,
    {
        self.walk_at("#", visit)
    }

    fn walk_at<F>(&self, pointer: &str, visit: &mut F) -> Result<(), SchemaError>
    where
        F: FnMut(&str, &SchemaNode) -> Result<(), SchemaError>,
    {
        for node in &self.nodes {
            visit(pointer, node)?;
            for (token, child) in node.children() {
                let child_pointer = child_pointer(pointer, &token);
                child.walk_at(&child_pointer, visit)?;
            }
        }
        Ok(())
    }

    /// Sibling-level structural checks shared by the parser and builder
    fn check_structure(&self, pointer: &str) -> Result<(), SchemaError> {
        let mut seen: Vec<&str> = Vec::new();
        for prop in self.properties() {
            if seen.contains(&prop.name.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    path: pointer.to_string(),
                    property: prop.name.clone(),
                });
            }
            seen.push(&prop.name);
        }

        for name in self.required() {
            if !seen.contains(&name) {
                return Err(SchemaError::RequiredWithoutProperty {
                    path: pointer.to_string(),
                    property: name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Schema pointer of a child reached through `token`
pub(crate) fn child_pointer(pointer: &str, token: &PathToken) -> String {
    match token {
        PathToken::Property(name) => format!("{}/properties/{}", pointer, escape_pointer(name)),
        PathToken::EachItem | PathToken::Index(_) => format!("{}/items", pointer),
    }
}
