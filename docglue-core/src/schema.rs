//! Model schemas: named property sets bound to a collection path template.
//!
//! A [`ModelSchema`] fixes everything the mapping layer needs to know about a
//! model kind: where its documents live (a path template with named parent-id
//! placeholders, e.g. `"rooms/{room_id}/messages"`), how its documents are
//! identified, and which properties its documents carry.
//!
//! ```ignore
//! use std::sync::LazyLock;
//!
//! static SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
//!     ModelSchema::builder("rooms/{room_id}/messages")
//!         .property("body", StringProperty::new().required())
//!         .property("created_at", TimestampProperty::new().auto_now_add())
//!         .build()
//! });
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{GlueError, GlueResult};
use crate::property::Property;

/// The static description of a model kind: collection path template, document
/// identifier conventions, and the ordered property set.
#[derive(Debug)]
pub struct ModelSchema {
    path_template: String,
    path_params: Vec<String>,
    id_key: String,
    properties: Vec<(String, Arc<dyn Property>)>,
}

/// Builder for [`ModelSchema`], normally driven from a `LazyLock` static.
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    path_template: String,
    id_key: String,
    properties: Vec<(String, Arc<dyn Property>)>,
}

impl ModelSchema {
    /// Starts building a schema for the given collection path template.
    ///
    /// The template alternates collection segments with `{name}` placeholders
    /// for parent document ids: `"rooms/{room_id}/messages"` describes a
    /// `messages` collection nested under each `rooms` document.
    pub fn builder(path_template: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            path_template: path_template.into(),
            id_key: "id".to_string(),
            properties: Vec::new(),
        }
    }

    /// The raw collection path template.
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// The placeholder names of the template, in order.
    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }

    /// The key under which the document id appears in dict representations.
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// The last segment of the path template: the collection's own name,
    /// shared by every instantiation of the template.
    pub fn collection_id(&self) -> &str {
        self.path_template
            .rsplit('/')
            .next()
            .unwrap_or(&self.path_template)
    }

    /// Substitutes parent ids positionally into the template and returns the
    /// concrete collection path.
    ///
    /// The number of ids must match the number of placeholders.
    pub fn collection_path(&self, parent_ids: &[String]) -> GlueResult<String> {
        if parent_ids.len() != self.path_params.len() {
            return Err(GlueError::Programming(format!(
                "collection path {:?} takes {} parent id(s), got {}",
                self.path_template,
                self.path_params.len(),
                parent_ids.len()
            )));
        }
        let mut path = self.path_template.clone();
        for (param, id) in self.path_params.iter().zip(parent_ids) {
            path = path.replace(&format!("{{{param}}}"), id);
        }
        Ok(path)
    }

    /// Recovers the parent ids from a concrete document or collection path.
    ///
    /// The inverse of [`collection_path`](ModelSchema::collection_path):
    /// placeholder positions in the template select the id segments of the
    /// concrete path. Used to re-anchor documents found by collection-group
    /// queries.
    pub fn parent_ids_from_path(&self, path: &str) -> Vec<String> {
        let template_segments: Vec<&str> = self.path_template.split('/').collect();
        let path_segments: Vec<&str> = path.split('/').collect();
        template_segments
            .iter()
            .zip(&path_segments)
            .filter(|(template, _)| template.starts_with('{') && template.ends_with('}'))
            .map(|(_, segment)| segment.to_string())
            .collect()
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> GlueResult<&Arc<dyn Property>> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
            .ok_or_else(|| GlueError::Programming(format!("unknown property: {name}")))
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Arc<dyn Property>)> {
        self.properties.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Checks a caller-chosen document id against the accepted pattern
    /// (non-empty, ASCII alphanumerics and underscores).
    pub fn validate_doc_id(&self, doc_id: &str) -> GlueResult<()> {
        let ok = !doc_id.is_empty()
            && doc_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !ok {
            return Err(GlueError::Validation(format!(
                "invalid document id: {doc_id:?}"
            )));
        }
        Ok(())
    }

    /// Produces the aggregate JSON-Schema document for this model kind: an
    /// `object` schema with one entry per property (virtual ones included)
    /// plus a synthetic string entry for the document id.
    pub fn to_schema(&self) -> GlueResult<Value> {
        let mut fields = Map::new();
        let mut required: Vec<String> = Vec::new();
        fields.insert(
            self.id_key.clone(),
            serde_json::json!({"type": "string"}),
        );
        for (name, property) in &self.properties {
            fields.insert(name.clone(), property.schema()?);
            if property.options().required {
                required.push(name.clone());
            }
        }
        required.sort();
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(fields));
        if !required.is_empty() {
            schema.insert(
                "required".to_string(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }
        Ok(Value::Object(schema))
    }
}

impl ModelSchemaBuilder {
    /// Changes the key under which the document id appears in dict
    /// representations (defaults to `"id"`).
    pub fn id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = key.into();
        self
    }

    /// Attaches a named property.
    pub fn property(mut self, name: impl Into<String>, property: impl Property + 'static) -> Self {
        self.properties.push((name.into(), Arc::new(property)));
        self
    }

    /// Finalizes the schema, deriving the ordered placeholder list from the
    /// path template.
    pub fn build(self) -> ModelSchema {
        let path_params = self
            .path_template
            .split('/')
            .filter(|segment| segment.starts_with('{') && segment.ends_with('}'))
            .map(|segment| segment[1..segment.len() - 1].to_string())
            .collect();
        ModelSchema {
            path_template: self.path_template,
            path_params,
            id_key: self.id_key,
            properties: self.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{IntegerProperty, StringProperty};
    use serde_json::json;

    fn nested_schema() -> ModelSchema {
        ModelSchema::builder("rooms/{room_id}/messages")
            .property("body", StringProperty::new().required())
            .property("rank", IntegerProperty::new())
            .build()
    }

    #[test]
    fn derives_path_params_in_order() {
        let schema = ModelSchema::builder("a/{x}/b/{y}/c").build();
        assert_eq!(schema.path_params(), ["x", "y"]);
        assert_eq!(schema.collection_id(), "c");
    }

    #[test]
    fn substitutes_parent_ids_positionally() {
        let schema = nested_schema();
        let path = schema.collection_path(&["room1".to_string()]).unwrap();
        assert_eq!(path, "rooms/room1/messages");
    }

    #[test]
    fn rejects_parent_id_arity_mismatch() {
        let schema = nested_schema();
        assert!(matches!(
            schema.collection_path(&[]),
            Err(GlueError::Programming(_))
        ));
        let flat = ModelSchema::builder("fruits").build();
        assert_eq!(flat.collection_path(&[]).unwrap(), "fruits");
    }

    #[test]
    fn recovers_parent_ids_from_concrete_paths() {
        let schema = nested_schema();
        assert_eq!(
            schema.parent_ids_from_path("rooms/room1/messages/msg1"),
            ["room1"]
        );
        assert_eq!(schema.parent_ids_from_path("rooms/room1/messages"), ["room1"]);
    }

    #[test]
    fn doc_id_pattern() {
        let schema = nested_schema();
        assert!(schema.validate_doc_id("abc_123").is_ok());
        assert!(schema.validate_doc_id("").is_err());
        assert!(schema.validate_doc_id("a/b").is_err());
        assert!(schema.validate_doc_id("a-b").is_err());
    }

    #[test]
    fn required_list_is_sorted() {
        let schema = ModelSchema::builder("things")
            .property("zeta", StringProperty::new().required())
            .property("alpha", StringProperty::new().required())
            .build()
            .to_schema()
            .unwrap();
        assert_eq!(schema["required"], json!(["alpha", "zeta"]));
    }

    #[test]
    fn aggregate_schema_lists_required_fields() {
        let schema = nested_schema().to_schema().unwrap();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["properties"]["id"], json!({"type": "string"}));
        assert_eq!(schema["properties"]["body"]["type"], json!("string"));
        assert_eq!(schema["required"], json!(["body"]));
    }
}
