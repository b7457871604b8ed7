//! Resource schema compiler.
//!
//! Derives the object schema of a response payload type by merging property evidence from
//! several sources. Each source yields `name -> schema` entries which are inserted into one
//! ordered map: a later source overwrites an earlier one's entry in place, so a property keeps
//! the position where it was first seen. There is no deep merge.
//!
//! The inferred sources (doc tags, storage columns, literal shape) run in the configured
//! order. Explicit annotations always run last and are authoritative.

use crate::annotations::InlineShape;
use crate::config::EvidenceSource;
use crate::docblock::DocBlock;
use crate::metadata::{short_name, MetadataSource, TypeMeta};
use crate::schema::{Schema, SchemaType};
use crate::shape;
use indexmap::IndexMap;
use log::debug;

pub struct ResourceCompiler<'a, M: MetadataSource> {
    source: &'a M,
    evidence_order: Vec<EvidenceSource>,
}

impl<'a, M: MetadataSource> ResourceCompiler<'a, M> {
    pub fn new(source: &'a M, evidence_order: Vec<EvidenceSource>) -> Self {
        Self {
            source,
            evidence_order,
        }
    }

    /// Compile the schema of a payload type.
    ///
    /// Returns the empty schema when the type is unknown or no source yields a property.
    /// With `is_collection` the object is wrapped as the `items` of an array.
    pub fn compile_resource(&self, type_name: &str, is_collection: bool) -> Schema {
        let Some(type_meta) = self.source.type_meta(type_name) else {
            debug!("No metadata for resource type {}", type_name);
            return Schema::default();
        };

        let mut properties = IndexMap::new();
        for evidence in &self.evidence_order {
            let found = match evidence {
                EvidenceSource::DocTags => doc_tag_properties(type_meta),
                EvidenceSource::Storage => storage_properties(type_meta),
                EvidenceSource::Shape => shape_properties(type_meta),
            };
            debug!("{:?} evidence for {}: {} properties", evidence, type_name, found.len());
            properties.extend(found);
        }
        properties.extend(annotated_properties(type_meta));

        if properties.is_empty() {
            debug!("Resource type {} has no property evidence", type_name);
            return Schema::default();
        }

        let mut schema = Schema::object(properties);
        schema.description = type_meta
            .resource
            .as_ref()
            .and_then(|resource| resource.description.clone());

        if is_collection {
            Schema::array_of(schema)
        } else {
            schema
        }
    }

    /// Name under which a compiled resource is registered in `components.schemas`
    pub fn schema_name(&self, type_name: &str) -> String {
        self.source
            .type_meta(type_name)
            .and_then(|type_meta| type_meta.resource.as_ref()?.name.clone())
            .unwrap_or_else(|| short_name(type_name).to_string())
    }
}

/// Compile an inline resource map; nested maps become nested objects.
pub fn compile_inline(shape: &IndexMap<String, InlineShape>) -> Schema {
    let properties = shape
        .iter()
        .map(|(name, value)| (name.clone(), compile_inline_value(value)))
        .collect();
    Schema::object(properties)
}

fn compile_inline_value(value: &InlineShape) -> Schema {
    match value {
        InlineShape::Type(type_name) => Schema::of(SchemaType::from_declared(type_name)),
        InlineShape::Nested(nested) => compile_inline(nested),
        InlineShape::List(elements) => {
            let items = elements
                .first()
                .map(compile_inline_value)
                .unwrap_or_else(|| Schema::of(SchemaType::String));
            Schema::array_of(items)
        }
    }
}

fn doc_tag_properties(type_meta: &TypeMeta) -> IndexMap<String, Schema> {
    let Some(doc) = &type_meta.doc else {
        return IndexMap::new();
    };
    DocBlock::parse(doc)
        .property_tags()
        .into_iter()
        .map(|tag| (tag.name.clone(), tag.to_schema()))
        .collect()
}

fn storage_properties(type_meta: &TypeMeta) -> IndexMap<String, Schema> {
    if type_meta.model.is_none() {
        return IndexMap::new();
    }
    type_meta
        .columns
        .iter()
        .map(|column| {
            let schema = Schema::of(SchemaType::from_column(&column.column_type));
            (column.name.clone(), schema)
        })
        .collect()
}

fn shape_properties(type_meta: &TypeMeta) -> IndexMap<String, Schema> {
    type_meta
        .serialize
        .as_deref()
        .map(shape::infer_properties)
        .unwrap_or_default()
}

fn annotated_properties(type_meta: &TypeMeta) -> IndexMap<String, Schema> {
    let mut properties = IndexMap::new();

    if let Some(resource) = &type_meta.resource {
        for (name, declared) in &resource.properties {
            properties.insert(name.clone(), declared.to_schema());
        }
    }

    for property in &type_meta.properties {
        if let Some(annotation) = &property.annotation {
            let schema = annotation.to_schema(property.type_name.as_deref());
            properties.insert(property.name.clone(), schema);
        }
    }

    properties
}
