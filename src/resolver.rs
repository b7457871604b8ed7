//! Route metadata resolver.
//!
//! Walks the host's route table and turns every documented route into an [`Operation`].
//! A route is documented when it is bound to a `Type@method` handler that carries the
//! `document` marker annotation. Everything else is skipped, and a route whose handler cannot
//! be looked up is skipped with a warning without stopping the scan.

use crate::annotations::{
    DocumentAnnotation, HandlerAnnotation, RequestAnnotation, ResourceRef, ResponseAnnotation,
};
use crate::config::GeneratorConfig;
use crate::docblock::DocBlock;
use crate::error::Result;
use crate::metadata::{short_name, HandlerMeta, MetadataSource, RouteRecord};
use crate::operation::{
    MediaType, Operation, Parameter, ParameterLocation, RequestBody, ResponseDescriptor, Tag,
};
use crate::resource::{compile_inline, ResourceCompiler};
use crate::rules;
use crate::schema::{Schema, SchemaType};
use indexmap::IndexMap;
use log::{debug, info, warn};

const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful operation";
const MULTIPART: &str = "multipart/form-data";
const JSON: &str = "application/json";

pub struct RouteResolver<'a, M: MetadataSource> {
    source: &'a M,
    resources: ResourceCompiler<'a, M>,
    schemas: IndexMap<String, Schema>,
}

/// A request body together with whether it came from a rule-based validator
struct ResolvedBody {
    body: RequestBody,
    validated: bool,
}

impl<'a, M: MetadataSource> RouteResolver<'a, M> {
    pub fn new(source: &'a M, config: &GeneratorConfig) -> Self {
        Self {
            source,
            resources: ResourceCompiler::new(source, config.evidence_order.clone()),
            schemas: IndexMap::new(),
        }
    }

    /// Resolve every documented route, in route-table order
    pub fn resolve_all(&mut self, routes: &[RouteRecord]) -> Vec<Operation> {
        let mut operations = Vec::new();

        for route in routes {
            match self.resolve_one(route) {
                Ok(Some(operation)) => {
                    debug!("Resolved {} {}", operation.method, operation.path);
                    operations.push(operation);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping route {} {}: {}", route.method, route.uri, e),
            }
        }

        info!(
            "Resolved {} documented operations from {} routes",
            operations.len(),
            routes.len()
        );
        operations
    }

    /// Resolve one route; `Ok(None)` when the route is not documented.
    pub fn resolve_one(&mut self, route: &RouteRecord) -> Result<Option<Operation>> {
        let Some((type_name, method_name)) = route.handler_binding() else {
            debug!("Skipping {} {}: no handler binding", route.method, route.uri);
            return Ok(None);
        };

        let source = self.source;
        let handler = source.handler(type_name, method_name)?;
        let Some(marker) = document_marker(handler) else {
            debug!("Skipping {} {}: handler is not marked for documentation", route.method, route.uri);
            return Ok(None);
        };

        let doc = DocBlock::parse(handler.doc.as_deref().unwrap_or_default());

        let mut parameters = path_parameters(&route.uri);
        parameters.extend(query_parameters(handler));

        let resolved_body = self.request_body(route, handler);
        let mut responses = self.responses(handler, &doc);
        if resolved_body.as_ref().is_some_and(|b| b.validated) && !responses.contains_key("422") {
            responses.insert("422".to_string(), validation_error_response());
        }

        Ok(Some(Operation {
            method: route.method,
            path: normalize_path(&route.uri),
            tags: vec![resolve_tag(marker, route, type_name)],
            summary: resolve_summary(marker, &doc, method_name),
            description: resolve_description(marker, &doc, route),
            operation_id: marker
                .operation_id
                .clone()
                .unwrap_or_else(|| method_name.to_string()),
            parameters,
            request_body: resolved_body.map(|b| b.body),
            responses,
            middleware: route.middleware.clone(),
            deprecated: marker.deprecated,
        }))
    }

    /// Named resource schemas compiled while resolving
    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    fn request_body(&self, route: &RouteRecord, handler: &HandlerMeta) -> Option<ResolvedBody> {
        let explicit = handler.annotations.iter().find_map(|annotation| match annotation {
            HandlerAnnotation::Request(request) => Some(request),
            _ => None,
        });

        match explicit {
            Some(request) => self.annotated_body(route, request),
            None => handler
                .parameters
                .iter()
                .filter_map(|param| param.type_name.as_deref())
                .find_map(|type_name| self.validator_schema(type_name))
                .map(|schema| ResolvedBody {
                    body: json_body(route, None, JSON, true, schema),
                    validated: true,
                }),
        }
    }

    fn annotated_body(&self, route: &RouteRecord, request: &RequestAnnotation) -> Option<ResolvedBody> {
        let description = request.description.clone();

        if let Some(validator) = &request.validator {
            let Some(schema) = self.validator_schema(validator) else {
                debug!("Request validator {} has no rule set", validator);
                return None;
            };
            return Some(ResolvedBody {
                body: json_body(route, description, &request.media_type, request.required, schema),
                validated: true,
            });
        }

        if request.media_type == MULTIPART {
            let file = Schema::formatted("binary");
            let schema = Schema::object(IndexMap::from([("file".to_string(), file)]));
            return Some(ResolvedBody {
                body: json_body(route, description, MULTIPART, request.required, schema),
                validated: false,
            });
        }

        None
    }

    /// Compiled rule set of a validator type, if the type has one
    fn validator_schema(&self, type_name: &str) -> Option<Schema> {
        let rules = self.source.type_meta(type_name)?.rules.as_ref()?;
        Some(rules::compile_all(rules))
    }

    fn responses(
        &mut self,
        handler: &HandlerMeta,
        doc: &DocBlock,
    ) -> IndexMap<String, ResponseDescriptor> {
        let annotated: Vec<&ResponseAnnotation> = handler
            .annotations
            .iter()
            .filter_map(|annotation| match annotation {
                HandlerAnnotation::Response(response) => Some(response),
                _ => None,
            })
            .collect();

        if annotated.is_empty() {
            return doc
                .response_tags()
                .into_iter()
                .map(|tag| (tag.status.to_string(), ResponseDescriptor::empty(tag.description)))
                .collect();
        }

        let mut responses = IndexMap::new();
        for response in annotated {
            let mut schema = self.response_schema(response);
            if response.is_pagination && !schema.is_empty() {
                schema = pagination_envelope(schema);
            }
            let description = response
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_RESPONSE_DESCRIPTION.to_string());
            responses.insert(
                response.status.to_string(),
                ResponseDescriptor::with_schema(description, &response.media_type, schema),
            );
        }
        responses
    }

    fn response_schema(&mut self, response: &ResponseAnnotation) -> Schema {
        match &response.resource {
            Some(ResourceRef::Named(type_name)) => {
                let schema = self.resources.compile_resource(type_name, false);
                if schema.is_empty() {
                    return schema;
                }
                self.schemas
                    .insert(self.resources.schema_name(type_name), schema.clone());
                collection_of(schema, response.is_collection)
            }
            Some(ResourceRef::Inline(shape)) => {
                collection_of(compile_inline(shape), response.is_collection)
            }
            None => Schema::default(),
        }
    }
}

fn document_marker(handler: &HandlerMeta) -> Option<&DocumentAnnotation> {
    handler.annotations.iter().find_map(|annotation| match annotation {
        HandlerAnnotation::Document(marker) => Some(marker),
        _ => None,
    })
}

fn collection_of(schema: Schema, is_collection: bool) -> Schema {
    if is_collection {
        Schema::array_of(schema)
    } else {
        schema
    }
}

fn json_body(
    route: &RouteRecord,
    description: Option<String>,
    media_type: &str,
    required: bool,
    schema: Schema,
) -> RequestBody {
    RequestBody {
        description: description.unwrap_or_else(|| format!("Request data for {}", route.uri)),
        required,
        content: IndexMap::from([(media_type.to_string(), MediaType { schema })]),
    }
}

/// `/{name?}` becomes `/{name}`; exactly one leading slash, no trailing slash
pub fn normalize_path(uri: &str) -> String {
    let normalized = uri.replace("?}", "}");
    format!("/{}", normalized.trim_matches('/'))
}

/// Placeholders of a path template, in order, with whether each is optional
fn path_placeholders(uri: &str) -> Vec<(String, bool)> {
    let mut placeholders = Vec::new();
    let mut rest = uri;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let inner = &rest[start + 1..start + len];
        let (name, optional) = match inner.strip_suffix('?') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if !name.is_empty() {
            placeholders.push((name.to_string(), optional));
        }
        rest = &rest[start + len + 1..];
    }

    placeholders
}

fn path_parameters(uri: &str) -> Vec<Parameter> {
    path_placeholders(uri)
        .into_iter()
        .map(|(name, optional)| Parameter {
            description: Some(format!("The {} parameter", name)),
            name,
            location: ParameterLocation::Path,
            required: !optional,
            param_type: SchemaType::String,
        })
        .collect()
}

fn query_parameters(handler: &HandlerMeta) -> Vec<Parameter> {
    handler
        .annotations
        .iter()
        .filter_map(|annotation| match annotation {
            HandlerAnnotation::Query(query) => Some(Parameter {
                name: query.name.clone(),
                location: ParameterLocation::Query,
                required: query.required,
                param_type: query
                    .type_name
                    .as_deref()
                    .map(SchemaType::from_declared)
                    .unwrap_or(SchemaType::String),
                description: query.description.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn resolve_tag(marker: &DocumentAnnotation, route: &RouteRecord, type_name: &str) -> Tag {
    let prefix = route
        .prefix
        .as_deref()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty());

    let name = match (&marker.tag, prefix) {
        (Some(tag), _) => tag.clone(),
        (None, Some(prefix)) => prefix.to_string(),
        (None, None) => {
            let short = short_name(type_name);
            match short.strip_suffix("Controller") {
                Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                _ => short.to_string(),
            }
        }
    };

    let subject = prefix.unwrap_or(&name);
    Tag {
        description: Some(format!("Endpoints for {}", subject)),
        name,
    }
}

fn resolve_summary(marker: &DocumentAnnotation, doc: &DocBlock, method_name: &str) -> String {
    marker
        .summary
        .clone()
        .or_else(|| doc.tag("summary"))
        .or_else(|| doc.first_line())
        .unwrap_or_else(|| humanize(method_name))
}

fn resolve_description(marker: &DocumentAnnotation, doc: &DocBlock, route: &RouteRecord) -> String {
    marker
        .description
        .clone()
        .or_else(|| doc.tag("description"))
        .unwrap_or_else(|| format!("Handle {} request to {}", route.method, route.uri))
}

/// `getItemById` -> `Get Item By Id`, `list_items` -> `List items`
fn humanize(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c == '_' {
            spaced.push(' ');
        } else {
            if i > 0 && c.is_uppercase() {
                spaced.push(' ');
            }
            spaced.push(c);
        }
    }

    let words = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wrap a page of `items` in the pagination envelope
pub fn pagination_envelope(items: Schema) -> Schema {
    let counters = ["total", "count", "per_page", "current_page", "total_pages"]
        .into_iter()
        .map(|name| (name.to_string(), Schema::of(SchemaType::Integer)))
        .collect();

    Schema::object(IndexMap::from([
        ("pagination".to_string(), Schema::object(counters)),
        ("data".to_string(), Schema::array_of(items)),
    ]))
}

fn validation_error_response() -> ResponseDescriptor {
    let mut errors = Schema::of(SchemaType::Object);
    errors.additional_properties = Some(Box::new(Schema::array_of(Schema::of(SchemaType::String))));

    let envelope = Schema::object(IndexMap::from([
        ("message".to_string(), Schema::of(SchemaType::String)),
        ("errors".to_string(), errors),
    ]));
    ResponseDescriptor::with_schema("Validation error", JSON, envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{HttpMethod, MetadataSnapshot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SNAPSHOT: &str = r#"
routes:
  - { method: GET, uri: api/items, handler: ItemController@index, prefix: api }
  - { method: GET, uri: "api/items/{id}", handler: ItemController@show, prefix: /api/ }
  - { method: POST, uri: api/items, handler: ItemController@store, middleware: ["auth:sanctum"] }
  - { method: GET, uri: "users/{user?}/", handler: App\Http\UserController@getUserProfile }
  - { method: GET, uri: internal/health, handler: HealthController@check }
  - { method: GET, uri: closure }
  - { method: POST, uri: api/uploads, handler: ItemController@upload }
  - { method: DELETE, uri: "api/items/{id}", handler: GhostController@destroy }
handlers:
  - type: ItemController
    method: index
    doc: |
      /**
       * List items.
       * @summary List all items
       */
    annotations:
      - { kind: document, tag: Items }
      - { kind: query, name: page, type: int, description: Page number }
      - { kind: response, status: 200, resource: ItemResource, is_pagination: true, is_collection: false }
  - type: ItemController
    method: show
    doc: |
      /**
       * @response 404 Item not found
       */
    annotations:
      - { kind: document }
  - type: ItemController
    method: store
    parameters:
      - { name: request, type: StoreItemRequest }
    annotations:
      - { kind: document, summary: Create item, operation_id: createItem, description: Creates one }
      - { kind: response, status: 201, resource: ItemResource, description: Created }
  - type: App\Http\UserController
    method: getUserProfile
    annotations:
      - { kind: document }
      - kind: response
        resource: { name: string, roles: [string] }
        is_collection: true
  - type: HealthController
    method: check
  - type: ItemController
    method: upload
    annotations:
      - { kind: document }
      - { kind: request, media_type: multipart/form-data }
types:
  - name: ItemResource
    columns: []
    serialize: 'json!({ "id": 1, "name": "x" })'
  - name: StoreItemRequest
    rules:
      name: [required, string, "max:255"]
      tags: array
      "tags.*": string
"#;

    fn snapshot() -> MetadataSnapshot {
        serde_yaml::from_str(SNAPSHOT).unwrap()
    }

    fn resolve(snapshot: &MetadataSnapshot) -> (Vec<Operation>, IndexMap<String, Schema>) {
        let config = GeneratorConfig::default();
        let mut resolver = RouteResolver::new(snapshot, &config);
        let operations = resolver.resolve_all(&snapshot.routes);
        (operations, resolver.into_schemas())
    }

    fn find<'o>(operations: &'o [Operation], method: HttpMethod, path: &str) -> &'o Operation {
        operations
            .iter()
            .find(|op| op.method == method && op.path == path)
            .unwrap_or_else(|| panic!("no operation {} {}", method, path))
    }

    #[test]
    fn test_only_marked_routes_are_resolved() {
        let snapshot = snapshot();
        let (operations, _) = resolve(&snapshot);

        let paths: Vec<(HttpMethod, &str)> = operations
            .iter()
            .map(|op| (op.method, op.path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (HttpMethod::Get, "/api/items"),
                (HttpMethod::Get, "/api/items/{id}"),
                (HttpMethod::Post, "/api/items"),
                (HttpMethod::Get, "/users/{user}"),
                (HttpMethod::Post, "/api/uploads"),
            ]
        );
    }

    #[test]
    fn test_unknown_handler_is_an_error() {
        let snapshot = snapshot();
        let config = GeneratorConfig::default();
        let mut resolver = RouteResolver::new(&snapshot, &config);

        assert!(resolver.resolve_one(&snapshot.routes[7]).is_err());
        assert!(resolver.resolve_one(&snapshot.routes[5]).unwrap().is_none());
    }

    #[test]
    fn test_paginated_listing() {
        let snapshot = snapshot();
        let (operations, schemas) = resolve(&snapshot);
        let index = find(&operations, HttpMethod::Get, "/api/items");

        assert_eq!(index.summary, "List all items");
        assert_eq!(index.description, "Handle GET request to api/items");
        assert_eq!(index.operation_id, "index");
        assert_eq!(
            index.tags,
            vec![Tag {
                name: "Items".to_string(),
                description: Some("Endpoints for api".to_string())
            }]
        );

        assert_eq!(index.parameters.len(), 1);
        assert_eq!(index.parameters[0].name, "page");
        assert_eq!(index.parameters[0].location, ParameterLocation::Query);
        assert_eq!(index.parameters[0].param_type, SchemaType::Integer);
        assert!(!index.parameters[0].required);

        let ok = &index.responses["200"];
        assert_eq!(ok.description, "Successful operation");
        let schema = serde_json::to_value(&ok.content.as_ref().unwrap()["application/json"].schema)
            .unwrap();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "pagination": {
                        "type": "object",
                        "properties": {
                            "total": {"type": "integer"},
                            "count": {"type": "integer"},
                            "per_page": {"type": "integer"},
                            "current_page": {"type": "integer"},
                            "total_pages": {"type": "integer"}
                        }
                    },
                    "data": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
                        }
                    }
                }
            })
        );

        assert!(schemas.contains_key("ItemResource"));
    }

    #[test]
    fn test_show_uses_doc_responses_and_path_parameter() {
        let snapshot = snapshot();
        let (operations, _) = resolve(&snapshot);
        let show = find(&operations, HttpMethod::Get, "/api/items/{id}");

        assert_eq!(show.tags[0].name, "api");
        assert_eq!(show.tags[0].description.as_deref(), Some("Endpoints for api"));
        assert_eq!(show.summary, "Show");
        assert_eq!(show.parameters.len(), 1);
        assert_eq!(show.parameters[0].name, "id");
        assert_eq!(show.parameters[0].location, ParameterLocation::Path);
        assert!(show.parameters[0].required);
        assert_eq!(show.parameters[0].description.as_deref(), Some("The id parameter"));

        assert_eq!(show.responses.len(), 1);
        assert_eq!(show.responses["404"], ResponseDescriptor::empty("Item not found"));
        assert!(show.request_body.is_none());
    }

    #[test]
    fn test_store_request_body_and_validation_error() {
        let snapshot = snapshot();
        let (operations, _) = resolve(&snapshot);
        let store = find(&operations, HttpMethod::Post, "/api/items");

        assert_eq!(store.summary, "Create item");
        assert_eq!(store.description, "Creates one");
        assert_eq!(store.operation_id, "createItem");
        assert_eq!(store.tags[0].name, "Item");
        assert_eq!(store.middleware, vec!["auth:sanctum"]);

        let body = store.request_body.as_ref().unwrap();
        assert_eq!(body.description, "Request data for api/items");
        assert!(body.required);
        assert_eq!(
            serde_json::to_value(&body.content["application/json"].schema).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "maxLength": 255},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["name"]
            })
        );

        let statuses: Vec<&str> = store.responses.keys().map(String::as_str).collect();
        assert_eq!(statuses, vec!["201", "422"]);
        assert_eq!(store.responses["201"].description, "Created");
        let error = &store.responses["422"];
        assert_eq!(error.description, "Validation error");
        assert_eq!(
            serde_json::to_value(&error.content.as_ref().unwrap()["application/json"].schema)
                .unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "errors": {
                        "type": "object",
                        "additionalProperties": {"type": "array", "items": {"type": "string"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_optional_path_parameter_and_inline_collection() {
        let snapshot = snapshot();
        let (operations, _) = resolve(&snapshot);
        let profile = find(&operations, HttpMethod::Get, "/users/{user}");

        assert_eq!(profile.tags[0].name, "User");
        assert_eq!(profile.tags[0].description.as_deref(), Some("Endpoints for User"));
        assert_eq!(profile.summary, "Get User Profile");
        assert!(!profile.parameters[0].required);

        let schema = &profile.responses["200"].content.as_ref().unwrap()["application/json"].schema;
        assert_eq!(
            serde_json::to_value(schema).unwrap(),
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "roles": {"type": "array", "items": {"type": "string"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_multipart_upload_body() {
        let snapshot = snapshot();
        let (operations, _) = resolve(&snapshot);
        let upload = find(&operations, HttpMethod::Post, "/api/uploads");

        let body = upload.request_body.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(&body.content[MULTIPART].schema).unwrap(),
            json!({"type": "object", "properties": {"file": {"type": "string", "format": "binary"}}})
        );
        assert!(upload.responses.is_empty());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("api/items/{id?}/"), "/api/items/{id}");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//api//"), "/api");
    }

    #[test]
    fn test_path_placeholders() {
        assert_eq!(
            path_placeholders("posts/{post}/comments/{comment?}"),
            vec![("post".to_string(), false), ("comment".to_string(), true)]
        );
        assert!(path_placeholders("broken/{id").is_empty());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("getItemById"), "Get Item By Id");
        assert_eq!(humanize("list_items"), "List items");
        assert_eq!(humanize("index"), "Index");
        assert_eq!(humanize(""), "");
    }
}
