use crate::config::{ApiKeyLocation, Contact, GeneratorConfig, License, OAuthFlow, SecurityConfig};
use crate::metadata::HttpMethod;
use crate::operation::{Operation, ParameterLocation, RequestBody, ResponseDescriptor, Tag};
use crate::schema::Schema;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const OPENAPI_VERSION: &str = "3.0.0";
const BEARER_SCHEME: &str = "bearerAuth";
const OAUTH2_SCHEME: &str = "oauth2";
const API_KEY_SCHEME: &str = "apiKey";
/// Middleware that marks a route as protected by an API key
const API_KEY_MIDDLEWARE: &str = "api_key";

/// One security requirement: scheme name to required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    info: Info,
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem), in order of first appearance
    paths: IndexMap<String, PathItem>,
    /// Tags by name; the first description seen is kept
    tags: IndexMap<String, Tag>,
    schemas: IndexMap<String, Schema>,
    security: SecurityConfig,
    always_require_bearer: bool,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OperationObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<OperationObject>,
}

impl PathItem {
    pub fn get_operation(&self, method: HttpMethod) -> Option<&OperationObject> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// Operations present on this path
    pub fn operations(&self) -> impl Iterator<Item = &OperationObject> {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.options,
            &self.head,
        ]
        .into_iter()
        .filter_map(Option::as_ref)
    }

    fn slot(&mut self, method: HttpMethod) -> &mut Option<OperationObject> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }
}

/// OpenAPI Operation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationObject {
    #[serde(default)]
    pub tags: Vec<String>,
    pub summary: String,
    pub description: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterObject>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, ResponseDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterObject {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(rename = "securitySchemes", default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// OpenAPI Security Scheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(rename = "bearerFormat")]
        bearer_format: String,
    },
    #[serde(rename = "oauth2")]
    OAuth2 { flows: IndexMap<String, OAuthFlow> },
    #[serde(rename = "apiKey")]
    ApiKey {
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        name: String,
    },
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub paths: IndexMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Assemble a document from resolved operations and the named schemas compiled for them
pub fn assemble(
    operations: &[Operation],
    schemas: IndexMap<String, Schema>,
    config: &GeneratorConfig,
) -> OpenApiDocument {
    let mut builder = OpenApiBuilder::from_config(config);
    for operation in operations {
        builder.add_operation(operation);
    }
    builder.add_schemas(schemas);
    builder.build()
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with the default configuration
    pub fn new() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        debug!("Initializing OpenApiBuilder for {}", config.title);
        Self {
            info: Info {
                title: config.title.clone(),
                description: config.description.clone(),
                version: config.version.clone(),
                contact: config.contact.clone(),
                license: config.license.clone(),
            },
            servers: config
                .servers
                .iter()
                .map(|server| Server {
                    url: server.url.clone(),
                    description: server.description.clone(),
                })
                .collect(),
            paths: IndexMap::new(),
            tags: IndexMap::new(),
            schemas: IndexMap::new(),
            security: config.security.clone(),
            always_require_bearer: config.always_require_bearer,
        }
    }

    /// Add a resolved operation. A later operation on the same path and method replaces the
    /// earlier one.
    pub fn add_operation(&mut self, operation: &Operation) {
        debug!("Adding operation: {} {}", operation.method, operation.path);

        for tag in &operation.tags {
            self.tags
                .entry(tag.name.clone())
                .or_insert_with(|| tag.clone());
        }

        let object = OperationObject {
            tags: operation.tags.iter().map(|tag| tag.name.clone()).collect(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            operation_id: operation.operation_id.clone(),
            parameters: dedup_parameters(operation),
            request_body: operation.request_body.clone(),
            responses: operation.responses.clone(),
            security: self.security_requirements(&operation.middleware),
            deprecated: operation.deprecated,
        };

        let path_item = self.paths.entry(operation.path.clone()).or_default();
        let slot = path_item.slot(operation.method);
        if slot.is_some() {
            debug!(
                "Replacing earlier operation for {} {}",
                operation.method, operation.path
            );
        }
        *slot = Some(object);
    }

    /// Register named schemas for `components.schemas`
    pub fn add_schemas(&mut self, schemas: IndexMap<String, Schema>) {
        self.schemas.extend(schemas);
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let components = Components {
            schemas: self.schemas,
            security_schemes: security_schemes(&self.security, self.always_require_bearer),
        };
        let components = (!components.schemas.is_empty()
            || !components.security_schemes.is_empty())
        .then_some(components);

        // a replaced operation may have left a tag nothing refers to any more
        let used: HashSet<&str> = self
            .paths
            .values()
            .flat_map(PathItem::operations)
            .flat_map(|operation| operation.tags.iter().map(String::as_str))
            .collect();
        let mut tags: Vec<Tag> = self
            .tags
            .values()
            .filter(|tag| used.contains(tag.name.as_str()))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            paths: self.paths,
            components,
            tags,
        }
    }

    fn security_requirements(&self, middleware: &[String]) -> Option<Vec<SecurityRequirement>> {
        if self.always_require_bearer {
            return Some(vec![requirement(BEARER_SCHEME, Vec::new())]);
        }

        let mut requirements = Vec::new();
        if middleware.iter().any(|m| is_auth_middleware(m)) {
            if self.security.bearer.enabled {
                requirements.push(requirement(BEARER_SCHEME, Vec::new()));
            }
            if self.security.oauth2.enabled {
                requirements.push(requirement(OAUTH2_SCHEME, self.security.oauth2.scopes.clone()));
            }
        }
        if self.security.api_key.enabled && middleware.iter().any(|m| m == API_KEY_MIDDLEWARE) {
            requirements.push(requirement(API_KEY_SCHEME, Vec::new()));
        }

        (!requirements.is_empty()).then_some(requirements)
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `auth`, `auth:api`, `auth:sanctum` and any other `auth:<guard>`
fn is_auth_middleware(middleware: &str) -> bool {
    middleware == "auth" || middleware.starts_with("auth:")
}

fn requirement(scheme: &str, scopes: Vec<String>) -> SecurityRequirement {
    IndexMap::from([(scheme.to_string(), scopes)])
}

fn security_schemes(
    security: &SecurityConfig,
    always_require_bearer: bool,
) -> IndexMap<String, SecurityScheme> {
    let mut schemes = IndexMap::new();

    if security.bearer.enabled || always_require_bearer {
        schemes.insert(
            BEARER_SCHEME.to_string(),
            SecurityScheme::Http {
                scheme: "bearer".to_string(),
                bearer_format: "JWT".to_string(),
            },
        );
    }
    if security.oauth2.enabled {
        schemes.insert(
            OAUTH2_SCHEME.to_string(),
            SecurityScheme::OAuth2 {
                flows: security.oauth2.flows.clone(),
            },
        );
    }
    if security.api_key.enabled {
        schemes.insert(
            API_KEY_SCHEME.to_string(),
            SecurityScheme::ApiKey {
                location: security.api_key.location,
                name: security.api_key.name.clone(),
            },
        );
    }

    schemes
}

/// Unique by `(name, location)`; a later duplicate replaces the earlier one in place
fn dedup_parameters(operation: &Operation) -> Vec<ParameterObject> {
    let mut unique: IndexMap<(&str, ParameterLocation), ParameterObject> = IndexMap::new();
    for parameter in &operation.parameters {
        unique.insert(
            parameter.key(),
            ParameterObject {
                name: parameter.name.clone(),
                location: parameter.location,
                required: parameter.required,
                schema: Schema::of(parameter.param_type),
                description: parameter.description.clone(),
            },
        );
    }
    unique.into_values().collect()
}
