use serde_json::Value;

use super::{Annotations, PropertySchema, Schema, SchemaNode, TypeName, TypeSet};
use crate::error::SchemaError;

/// Fluent construction of a [`Schema`]
///
/// Nodes keep the order of the builder calls. Repeated [`property`]
/// calls collect into a single `properties` node placed where the first
/// one was made.
///
/// [`property`]: SchemaBuilder::property
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<SchemaNode>,
    annotations: Annotations,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    pub fn mark_async(mut self) -> Self {
        self.annotations.is_async = true;
        self
    }

    pub fn type_of(self, t: TypeName) -> Self {
        self.node(SchemaNode::Type(TypeSet::single(t)))
    }

    pub fn types(self, types: TypeSet) -> Self {
        self.node(SchemaNode::Type(types))
    }

    pub fn required<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node(SchemaNode::Required(names.into_iter().map(Into::into).collect()))
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let prop = PropertySchema {
            name: name.into(),
            schema,
        };
        let existing = self.nodes.iter_mut().find_map(|n| match n {
            SchemaNode::Properties(props) => Some(props),
            _ => None,
        });
        match existing {
            Some(props) => props.push(prop),
            None => self.nodes.push(SchemaNode::Properties(vec![prop])),
        }
        self
    }

    pub fn items(self, schema: Schema) -> Self {
        self.node(SchemaNode::Items(Box::new(schema)))
    }

    pub fn enum_values(self, values: Vec<Value>) -> Self {
        self.node(SchemaNode::Enum(values))
    }

    pub fn format(self, name: impl Into<String>) -> Self {
        self.node(SchemaNode::Format(name.into()))
    }

    pub fn min_length(self, n: u64) -> Self {
        self.node(SchemaNode::MinLength(n))
    }

    pub fn max_length(self, n: u64) -> Self {
        self.node(SchemaNode::MaxLength(n))
    }

    pub fn minimum(self, n: f64) -> Self {
        self.node(SchemaNode::Minimum(n))
    }

    pub fn maximum(self, n: f64) -> Self {
        self.node(SchemaNode::Maximum(n))
    }

    pub fn pattern(self, regex: impl Into<String>) -> Self {
        self.node(SchemaNode::Pattern(regex.into()))
    }

    pub fn custom_async(self, predicate: impl Into<String>, params: Value) -> Self {
        self.node(SchemaNode::CustomAsync {
            predicate: predicate.into(),
            params,
        })
    }

    /// Append an arbitrary node
    pub fn node(mut self, node: SchemaNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Finish the schema, checking sibling structure
    ///
    /// Predicate ids are not resolved here; use
    /// [`Schema::validate_against`] or let the compiler report them.
    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::from_parts(self.nodes, self.annotations, "#")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_are_merged() {
        let schema = Schema::builder()
            .type_of(TypeName::Object)
            .property("PORT", Schema::default())
            .required(["PORT"])
            .property("HOST", Schema::default())
            .build()
            .unwrap();

        assert_eq!(schema.nodes().len(), 3);
        let names: Vec<&str> = schema.properties().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["PORT", "HOST"]);
    }

    #[test]
    fn test_duplicate_property_is_rejected() {
        let err = Schema::builder()
            .property("PORT", Schema::default())
            .property("PORT", Schema::default())
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::DuplicateProperty {
                path: "#".to_string(),
                property: "PORT".to_string(),
            }
        );
    }

    #[test]
    fn test_required_needs_property() {
        let err = Schema::builder().required(["PORT"]).build().unwrap_err();
        assert!(matches!(err, SchemaError::RequiredWithoutProperty { .. }));
    }
}
