use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-Schema primitive type tags used by OpenAPI 3.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    /// Map a declared type name (doc tags, annotations, handler signatures) to a schema type.
    ///
    /// Unknown names fall back to `string`, the same default the host's reflection uses for
    /// untyped values.
    pub fn from_declared(type_name: &str) -> Self {
        let normalized = type_name.trim().trim_start_matches('?').to_ascii_lowercase();
        match normalized.as_str() {
            "int" | "integer" | "i8" | "i16" | "i32" | "i64" | "i128" | "u8" | "u16" | "u32"
            | "u64" | "u128" | "usize" | "isize" => SchemaType::Integer,
            "float" | "double" | "number" | "numeric" | "decimal" | "f32" | "f64" => {
                SchemaType::Number
            }
            "bool" | "boolean" => SchemaType::Boolean,
            "array" | "list" | "vec" | "collection" => SchemaType::Array,
            "object" | "json" | "map" | "hashmap" => SchemaType::Object,
            _ => SchemaType::String,
        }
    }

    /// Map a storage column type (`varchar(255)`, `BIGINT UNSIGNED`, ...) to a schema type
    pub fn from_column(column_type: &str) -> Self {
        let lowered = column_type.trim().to_ascii_lowercase();
        let keyword: String = lowered
            .chars()
            .take_while(|c| c.is_ascii_alphabetic() || *c == '_')
            .collect();

        match keyword.as_str() {
            "varchar" | "text" | "char" | "string" | "longtext" | "mediumtext" | "tinytext"
            | "uuid" => SchemaType::String,
            "int" | "integer" | "smallint" | "bigint" | "tinyint" | "mediumint" => {
                SchemaType::Integer
            }
            "float" | "double" | "decimal" | "real" | "numeric" => SchemaType::Number,
            "bool" | "boolean" => SchemaType::Boolean,
            "date" | "datetime" | "timestamp" | "timestamptz" | "time" | "year" => {
                SchemaType::String
            }
            "json" | "jsonb" => SchemaType::Object,
            _ => SchemaType::String,
        }
    }
}

/// OpenAPI Schema definition.
///
/// A recursive JSON-Schema node. `Schema::default()` is the empty schema `{}`, which every
/// compiler returns when it has no usable evidence; callers treat it as "omit this entry".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Format hint (e.g. "email", "date-time", "binary")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Value schema for free-form maps
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
}

impl Schema {
    /// A schema of the given type. Arrays get `{type: string}` items until told otherwise.
    pub fn of(schema_type: SchemaType) -> Self {
        let mut schema = Schema::default();
        schema.set_type(schema_type);
        schema
    }

    /// `{type: array, items: <items>}`
    pub fn array_of(items: Schema) -> Self {
        Schema {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Schema::default()
        }
    }

    /// `{type: object, properties}`
    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Schema {
            schema_type: Some(SchemaType::Object),
            properties,
            ..Schema::default()
        }
    }

    /// `{type: string, format: <format>}`
    pub fn formatted(format: &str) -> Self {
        Schema {
            schema_type: Some(SchemaType::String),
            format: Some(format.to_string()),
            ..Schema::default()
        }
    }

    /// Whether this is the empty schema `{}`
    pub fn is_empty(&self) -> bool {
        *self == Schema::default()
    }

    pub fn is_type(&self, schema_type: SchemaType) -> bool {
        self.schema_type == Some(schema_type)
    }

    /// Assign the type while keeping `items` present iff the type is `array`
    pub fn set_type(&mut self, schema_type: SchemaType) {
        self.schema_type = Some(schema_type);
        if schema_type == SchemaType::Array {
            if self.items.is_none() {
                self.items = Some(Box::new(Schema::of(SchemaType::String)));
            }
        } else {
            self.items = None;
        }
    }

    /// Add a name to `required`, keeping first-seen order
    pub fn require(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }
}
