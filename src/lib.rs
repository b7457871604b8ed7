//! openapi-from-routes - OpenAPI documentation from a web application's route metadata.
//!
//! The host application exports its route table together with what reflection knows about
//! handlers and payload types (annotations, doc comments, validation rules, storage columns,
//! serialization bodies) as metadata snapshot files. This library turns those snapshots into
//! an OpenAPI 3.0.0 document.
//!
//! # Architecture
//!
//! 1. [`scanner`] and [`loader`] - find and decode metadata snapshots
//! 2. [`metadata`] and [`annotations`] - the passive host records, read through
//!    [`metadata::MetadataSource`]
//! 3. [`rules`] - compiles validation rule lists into request schemas
//! 4. [`resource`] - compiles payload types into response schemas, using [`docblock`] and
//!    [`shape`] for inferred evidence
//! 5. [`resolver`] - turns documented routes into [`operation::Operation`]s
//! 6. [`openapi_builder`] - assembles operations into the document
//! 7. [`serializer`] - renders JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     config::GeneratorConfig,
//!     loader::SnapshotLoader,
//!     openapi_builder::assemble,
//!     resolver::RouteResolver,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! let snapshot = SnapshotLoader::load_file(Path::new("metadata.yaml")).unwrap().snapshot;
//! let config = GeneratorConfig::default();
//!
//! let mut resolver = RouteResolver::new(&snapshot, &config);
//! let operations = resolver.resolve_all(&snapshot.routes);
//! let document = assemble(&operations, resolver.into_schemas(), &config);
//!
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotations;
pub mod cli;
pub mod config;
pub mod docblock;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod openapi_builder;
pub mod operation;
pub mod resolver;
pub mod resource;
pub mod rules;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod shape;
