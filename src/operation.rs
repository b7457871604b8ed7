//! Resolved operations, the hand-off between the route resolver and the document assembler.

use crate::metadata::HttpMethod;
use crate::schema::{Schema, SchemaType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One documented route, fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: HttpMethod,
    /// Normalized path, e.g. `/api/items/{id}`
    pub path: String,
    pub tags: Vec<Tag>,
    pub summary: String,
    pub description: String,
    pub operation_id: String,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Status code to response, in resolution order
    pub responses: IndexMap<String, ResponseDescriptor>,
    /// Middleware attached to the route; security requirements derive from it
    pub middleware: Vec<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub param_type: SchemaType,
    pub description: Option<String>,
}

impl Parameter {
    /// Parameters are unique per `(name, location)`
    pub fn key(&self) -> (&str, ParameterLocation) {
        (self.name.as_str(), self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub description: String,
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

impl ResponseDescriptor {
    /// A response without a body
    pub fn empty(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            content: None,
        }
    }

    /// A response whose body is `schema` under `media_type`; an empty schema means no body
    pub fn with_schema(description: impl Into<String>, media_type: &str, schema: Schema) -> Self {
        let content = (!schema.is_empty())
            .then(|| IndexMap::from([(media_type.to_string(), MediaType { schema })]));
        Self {
            description: description.into(),
            content,
        }
    }
}
