//! Host metadata: the route table plus what reflection knows about handlers and payload types.
//!
//! The generator never reflects over a live application. Instead the host exports a snapshot
//! (see [`MetadataSnapshot`]) and every component reads it through [`MetadataSource`].

use crate::annotations::{HandlerAnnotation, PropertyAnnotation, ResourceAnnotation};
use crate::error::{Error, Result};
use crate::rules::RuleSet;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods that can appear in the route table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Lowercase name, as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Case-insensitive. A multi-method entry such as `GET|HEAD` resolves to its first method.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let first = s.split('|').next().unwrap_or_default().trim();
        match first.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            _ => Err(format!("unknown HTTP method: {}", s)),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// One entry of the host's route table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub method: HttpMethod,
    /// Path template, e.g. `api/items/{id}` or `users/{user?}`
    pub uri: String,
    /// `Type@method` binding; closures and redirects have none
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub middleware: Vec<String>,
    /// Route group prefix, e.g. `api/v1`
    #[serde(default)]
    pub prefix: Option<String>,
}

impl RouteRecord {
    /// Split the `Type@method` binding
    pub fn handler_binding(&self) -> Option<(&str, &str)> {
        let (type_name, method) = self.handler.as_deref()?.split_once('@')?;
        if type_name.is_empty() || method.is_empty() {
            return None;
        }
        Some((type_name, method))
    }
}

/// A declared handler argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamMeta {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

/// Reflection data for one handler method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerMeta {
    #[serde(rename = "type")]
    pub type_name: String,
    pub method: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub annotations: Vec<HandlerAnnotation>,
    #[serde(default)]
    pub parameters: Vec<ParamMeta>,
}

/// A field on a payload type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMeta {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub annotation: Option<PropertyAnnotation>,
}

/// A column of the persisted record a payload type wraps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// Reflection data for a payload or validator type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMeta {
    pub name: String,
    pub doc: Option<String>,
    pub resource: Option<ResourceAnnotation>,
    pub properties: Vec<PropertyMeta>,
    /// Persisted record this type wraps, if any
    pub model: Option<String>,
    pub columns: Vec<ColumnMeta>,
    /// Body of the serialization method
    pub serialize: Option<String>,
    /// Validation rules, present on validator types only
    pub rules: Option<RuleSet>,
}

/// Read access to host reflection data
pub trait MetadataSource {
    /// Look up a handler method on a declaring type
    fn handler(&self, type_name: &str, method: &str) -> Result<&HandlerMeta>;

    /// Look up a payload or validator type; `None` when the host knows nothing about it
    fn type_meta(&self, name: &str) -> Option<&TypeMeta>;
}

/// A metadata snapshot exported by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSnapshot {
    #[serde(deserialize_with = "skip_invalid")]
    pub routes: Vec<RouteRecord>,
    #[serde(deserialize_with = "skip_invalid")]
    pub handlers: Vec<HandlerMeta>,
    #[serde(deserialize_with = "skip_invalid")]
    pub types: Vec<TypeMeta>,
}

impl MetadataSnapshot {
    /// Append another snapshot. Routes keep file order; later handler and type records
    /// shadow earlier ones with the same name.
    pub fn merge(&mut self, other: MetadataSnapshot) {
        self.routes.extend(other.routes);
        for handler in other.handlers {
            self.handlers
                .retain(|h| !(h.type_name == handler.type_name && h.method == handler.method));
            self.handlers.push(handler);
        }
        for type_meta in other.types {
            self.types.retain(|t| t.name != type_meta.name);
            self.types.push(type_meta);
        }
    }
}

impl MetadataSource for MetadataSnapshot {
    fn handler(&self, type_name: &str, method: &str) -> Result<&HandlerMeta> {
        let candidates = || self.handlers.iter().filter(|h| h.method == method);

        candidates()
            .find(|h| h.type_name == type_name)
            .or_else(|| candidates().find(|h| short_name(&h.type_name) == short_name(type_name)))
            .ok_or_else(|| Error::HandlerNotFound(format!("{}@{}", type_name, method)))
    }

    fn type_meta(&self, name: &str) -> Option<&TypeMeta> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .or_else(|| self.types.iter().find(|t| short_name(&t.name) == short_name(name)))
    }
}

/// Decode a list entry by entry. An entry that does not decode is logged and skipped; the
/// rest of the list is kept.
fn skip_invalid<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = Option::<Vec<serde_yaml::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let kind = short_name(std::any::type_name::<T>());

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_yaml::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping invalid {} at index {}: {}", kind, index, e);
                None
            }
        })
        .collect())
}

/// Last segment of a namespaced type name (`App\Http\ItemController`, `crate::api::Items`)
pub fn short_name(name: &str) -> &str {
    name.rsplit(['\\', ':', '.']).next().unwrap_or(name)
}
