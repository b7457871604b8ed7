//! Annotation model attached by the host application to handlers and payload types.
//!
//! These are passive records: the host exports them in its metadata snapshot and the
//! resolver and compilers read them. Nothing here performs inference.

use crate::schema::{Schema, SchemaType};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An annotation attached to a handler method, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerAnnotation {
    /// Marks the handler for inclusion in the document
    Document(DocumentAnnotation),
    /// Declares one query-string parameter
    Query(QueryAnnotation),
    /// Declares the request payload explicitly
    Request(RequestAnnotation),
    /// Declares one response
    Response(ResponseAnnotation),
    /// Any annotation kind this generator does not know about
    #[serde(other)]
    Other,
}

/// The "include in documentation" marker, with optional operation-level overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentAnnotation {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub operation_id: Option<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnnotation {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Declared primitive type, `string` when absent
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAnnotation {
    /// Validator type whose rule set describes the payload
    #[serde(default)]
    pub validator: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnnotation {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, deserialize_with = "empty_list_as_none")]
    pub resource: Option<ResourceRef>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default)]
    pub is_pagination: bool,
}

/// What a response carries: a named payload type or an inline property map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Named(String),
    Inline(IndexMap<String, InlineShape>),
}

/// One value of an inline resource map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineShape {
    Type(String),
    List(Vec<InlineShape>),
    Nested(IndexMap<String, InlineShape>),
}

/// Type-level resource marker with optionally declared properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceAnnotation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub properties: IndexMap<String, DeclaredProperty>,
}

/// A resource-level property declaration: a bare type name or a full schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredProperty {
    Type(String),
    Schema(Schema),
}

impl DeclaredProperty {
    pub fn to_schema(&self) -> Schema {
        match self {
            DeclaredProperty::Type(type_name) => Schema::of(SchemaType::from_declared(type_name)),
            DeclaredProperty::Schema(schema) => schema.clone(),
        }
    }
}

/// Explicit per-field annotation on a payload type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyAnnotation {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub example: Option<Value>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub nullable: bool,
    pub is_collection: bool,
    pub items: Option<Schema>,
}

impl PropertyAnnotation {
    /// Build the property schema; `fallback_type` is the field's declared type, if any.
    pub fn to_schema(&self, fallback_type: Option<&str>) -> Schema {
        let declared = self
            .type_name
            .as_deref()
            .or(fallback_type)
            .map(SchemaType::from_declared)
            .unwrap_or(SchemaType::String);

        let mut schema = if self.is_collection || declared == SchemaType::Array {
            let items = self
                .items
                .clone()
                .unwrap_or_else(|| Schema::of(SchemaType::String));
            Schema::array_of(items)
        } else {
            Schema::of(declared)
        };

        schema.description = self.description.clone();
        schema.format = self.format.clone();
        schema.example = self.example.clone();
        schema.nullable = self.nullable;
        if let Some(values) = &self.enum_values {
            schema.enum_values = values.clone();
        }
        schema
    }
}

/// Hosts export "no resource" as an empty list
fn empty_list_as_none<'de, D>(deserializer: D) -> Result<Option<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Sequence(items)) if items.is_empty() => Ok(None),
        Some(value) => serde_yaml::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn default_media_type() -> String {
    "application/json".to_string()
}

fn default_status() -> u16 {
    200
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handler_annotation_kinds() {
        let annotations: Vec<HandlerAnnotation> = serde_json::from_value(json!([
            {"kind": "document", "tag": "Items"},
            {"kind": "query", "name": "page", "type": "int"},
            {"kind": "response", "status": 201, "resource": "ItemResource"},
            {"kind": "throttle", "per_minute": 60}
        ]))
        .unwrap();

        assert!(matches!(&annotations[0], HandlerAnnotation::Document(d) if d.tag.as_deref() == Some("Items")));
        assert!(matches!(&annotations[1], HandlerAnnotation::Query(q) if q.name == "page" && !q.required));
        match &annotations[2] {
            HandlerAnnotation::Response(r) => {
                assert_eq!(r.status, 201);
                assert_eq!(r.media_type, "application/json");
                assert_eq!(r.resource, Some(ResourceRef::Named("ItemResource".to_string())));
            }
            other => panic!("Expected response annotation, got {:?}", other),
        }
        assert_eq!(annotations[3], HandlerAnnotation::Other);
    }

    #[test]
    fn test_inline_resource_ref() {
        let response: ResponseAnnotation = serde_json::from_value(json!({
            "resource": {"id": "integer", "meta": {"source": "string"}, "tags": ["string"]}
        }))
        .unwrap();

        let Some(ResourceRef::Inline(map)) = response.resource else {
            panic!("Expected inline resource");
        };
        assert_eq!(map["id"], InlineShape::Type("integer".to_string()));
        assert!(matches!(map["meta"], InlineShape::Nested(_)));
        assert!(matches!(map["tags"], InlineShape::List(_)));
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_empty_resource_list_means_no_resource() {
        let response: ResponseAnnotation =
            serde_json::from_value(json!({"status": 204, "resource": []})).unwrap();
        assert_eq!(response.resource, None);

        let response: ResponseAnnotation = serde_json::from_value(json!({"resource": null})).unwrap();
        assert_eq!(response.resource, None);

        let response: ResponseAnnotation =
            serde_json::from_value(json!({"resource": "ItemResource"})).unwrap();
        assert_eq!(response.resource, Some(ResourceRef::Named("ItemResource".to_string())));
    }

    #[test]
    fn test_property_annotation_schema() {
        let annotation = PropertyAnnotation {
            type_name: Some("number".to_string()),
            format: Some("float".to_string()),
            description: Some("The item price".to_string()),
            ..PropertyAnnotation::default()
        };

        let schema = annotation.to_schema(None);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"type": "number", "format": "float", "description": "The item price"})
        );
    }

    #[test]
    fn test_property_annotation_collection() {
        let annotation = PropertyAnnotation {
            type_name: Some("array".to_string()),
            is_collection: true,
            items: Some(Schema::of(SchemaType::Integer)),
            ..PropertyAnnotation::default()
        };

        let schema = annotation.to_schema(None);
        assert!(schema.is_type(SchemaType::Array));
        assert!(schema.items.unwrap().is_type(SchemaType::Integer));
    }

    #[test]
    fn test_property_annotation_falls_back_to_field_type() {
        let schema = PropertyAnnotation::default().to_schema(Some("bool"));
        assert!(schema.is_type(SchemaType::Boolean));
    }
}
