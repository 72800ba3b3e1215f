//! Stage 4: JSON Schema document assembly
//!
//! Builds a JSON Schema 2020-12 document for each resource entity, in two
//! variants: the read shape (open `_ext` extension point, physical path
//! recording) and the insert shape (whitespace patterns on required strings,
//! no extension point unless an extension contributes). Reference properties
//! expand into objects built from the referenced entity's flattened identity;
//! collections wrap their items in single-key objects.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{ArtifactError, Result};
use crate::mapping::PropertyMappings;
use crate::model::{EntityId, EntityKind, MetamodelGraph, PropertyId, PropertyKind};
use crate::naming::{decapitalize, singularize};
use crate::paths::{EntityJsonPaths, JsonPath, PropertyPath};
use crate::resolve::{is_required, prefixed_name, CollectedProperty, EntityMappings, PropertyModifier};

pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Identity strings may not have leading or trailing whitespace
const IDENTITY_STRING_PATTERN: &str = r"^(?!\s)(.*\S)$";
/// Required strings may not be whitespace-only
const REQUIRED_STRING_PATTERN: &str = r"^(?!\s*$).+";

/// Which API operation the document shape validates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Read,
    Insert,
}

/// A JSON Schema fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaProperty {
    Array(SchemaArray),
    Object(SchemaObject),
    Scalar(SchemaScalar),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaObject {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: IndexMap<String, SchemaProperty>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl SchemaObject {
    /// A closed object; `required` is omitted when empty
    fn from_properties(properties: IndexMap<String, SchemaProperty>, required: Vec<String>) -> Self {
        SchemaObject {
            schema: None,
            title: None,
            description: None,
            schema_type: "object",
            properties,
            additional_properties: false,
            required: if required.is_empty() { None } else { Some(required) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaArray {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub items: Box<SchemaProperty>,
    #[serde(rename = "minItems")]
    pub min_items: u32,
    #[serde(rename = "uniqueItems")]
    pub unique_items: bool,
}

impl SchemaArray {
    fn wrapping(items: SchemaProperty, min_items: u32) -> Self {
        SchemaArray {
            schema_type: "array",
            items: Box::new(items),
            min_items,
            unique_items: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaScalar {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SchemaScalar {
    fn typed(schema_type: &'static str, description: &str) -> Self {
        SchemaScalar {
            schema_type,
            description: Some(description.to_string()),
            format: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            pattern: None,
        }
    }
}

/// A document schema together with the logical-to-physical path mapping
/// recorded while assembling it (read variant only)
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDocument {
    pub schema: SchemaObject,
    pub json_paths: EntityJsonPaths,
}

/// The fixed document schema every descriptor resource shares
pub fn descriptor_document_schema() -> SchemaObject {
    let mut properties = IndexMap::new();
    properties.insert(
        "namespace".to_string(),
        SchemaProperty::Scalar(SchemaScalar::typed("string", "The descriptor namespace as a URI")),
    );
    properties.insert(
        "codeValue".to_string(),
        SchemaProperty::Scalar(SchemaScalar::typed("string", "The descriptor code value")),
    );
    properties.insert(
        "shortDescription".to_string(),
        SchemaProperty::Scalar(SchemaScalar::typed("string", "The descriptor short description")),
    );
    properties.insert(
        "description".to_string(),
        SchemaProperty::Scalar(SchemaScalar::typed("string", "The descriptor description")),
    );
    SchemaObject {
        schema: Some(JSON_SCHEMA_DIALECT.to_string()),
        title: Some("EdFi.Descriptor".to_string()),
        description: Some("An Ed-Fi Descriptor".to_string()),
        schema_type: "object",
        properties,
        additional_properties: false,
        required: Some(vec![
            "namespace".to_string(),
            "codeValue".to_string(),
            "shortDescription".to_string(),
        ]),
    }
}

/// Assembles document schemas from the resolution stage outputs
pub struct SchemaAssembler<'a> {
    graph: &'a MetamodelGraph,
    property_mappings: &'a PropertyMappings,
    entity_mappings: &'a EntityMappings,
    config: &'a GeneratorConfig,
}

impl<'a> SchemaAssembler<'a> {
    pub fn new(
        graph: &'a MetamodelGraph,
        property_mappings: &'a PropertyMappings,
        entity_mappings: &'a EntityMappings,
        config: &'a GeneratorConfig,
    ) -> Self {
        SchemaAssembler {
            graph,
            property_mappings,
            entity_mappings,
            config,
        }
    }

    /// The bare school year integer field
    pub fn school_year_schema(&self) -> SchemaScalar {
        let bounds = &self.config.school_year;
        SchemaScalar {
            minimum: Some(bounds.minimum),
            maximum: Some(bounds.maximum),
            ..SchemaScalar::typed(
                "integer",
                &format!("A school year between {} and {}", bounds.minimum, bounds.maximum),
            )
        }
    }

    /// The full school year enumeration document, embedded wherever a school
    /// year reference appears and emitted as its own resource schema
    pub fn school_year_enumeration_schema(&self) -> SchemaObject {
        let mut properties = IndexMap::new();
        properties.insert(
            "schoolYear".to_string(),
            SchemaProperty::Scalar(self.school_year_schema()),
        );
        SchemaObject {
            schema: Some(JSON_SCHEMA_DIALECT.to_string()),
            title: Some("EdFi.SchoolYearType".to_string()),
            description: Some("A school year enumeration".to_string()),
            schema_type: "object",
            properties,
            additional_properties: false,
            required: None,
        }
    }

    /// Builds the document schema for a resource entity
    pub fn document_schema(&self, entity_id: EntityId, variant: SchemaVariant) -> Result<SchemaDocument> {
        let entity = self.graph.entity(entity_id);
        let mut paths = EntityJsonPaths::new();
        let mut properties: IndexMap<String, SchemaProperty> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();

        for collected in &self.entity_mappings[&entity_id].collected_properties {
            let property = self.graph.property(collected.property);
            let mapping = &self.property_mappings[&collected.property];
            let name = prefixed_name(&mapping.decollisioned_top_level_name, &collected.modifier);
            if properties.contains_key(&name) {
                return Err(ArtifactError::UnresolvableCollision {
                    entity: entity.name.clone(),
                    name,
                });
            }

            let json_path = JsonPath::root(&name);
            let logical = PropertyPath::new(property.full_property_name());

            let schema = if matches!(property.kind, PropertyKind::SchoolYearEnumeration) {
                if variant == SchemaVariant::Read {
                    paths.add(std::slice::from_ref(&logical), &json_path.field("schoolYear"));
                }
                SchemaProperty::Object(self.school_year_enumeration_schema())
            } else {
                self.schema_property_for(
                    collected.property,
                    &collected.modifier,
                    &logical,
                    &json_path,
                    variant,
                    &mut paths,
                )?
            };

            if is_required(self.graph, collected.property, &collected.modifier) {
                required.push(name.clone());
            }
            properties.insert(name, schema);
        }

        let extension_properties = self.extension_properties(entity_id, variant, &mut paths)?;
        match variant {
            SchemaVariant::Read => {
                properties.insert("_ext".to_string(), extension_point(extension_properties));
            }
            SchemaVariant::Insert => {
                if !extension_properties.is_empty() {
                    properties.insert("_ext".to_string(), extension_point(extension_properties));
                }
            }
        }

        paths.sort_values();
        debug!(entity = %entity.name, ?variant, properties = properties.len(), "document schema assembled");

        Ok(SchemaDocument {
            schema: SchemaObject {
                schema: Some(JSON_SCHEMA_DIALECT.to_string()),
                title: Some(format!("{}.{}", entity.namespace, entity.name)),
                description: Some(entity.documentation.clone()),
                schema_type: "object",
                properties,
                additional_properties: false,
                required: if required.is_empty() { None } else { Some(required) },
            },
            json_paths: paths,
        })
    }

    /// One closed object per extension namespace, keyed under `_ext`
    fn extension_properties(
        &self,
        entity_id: EntityId,
        variant: SchemaVariant,
        paths: &mut EntityJsonPaths,
    ) -> Result<IndexMap<String, SchemaProperty>> {
        let mut extensions = IndexMap::new();
        for extension in self.graph.extensions_of(entity_id) {
            let namespace_key = decapitalize(&self.graph.entity(extension).namespace);
            let parent_json = JsonPath::root("_ext").field(&namespace_key);
            let object = self.object_for_collected(
                &self.entity_mappings[&extension].collected_properties,
                &PropertyModifier::default(),
                &parent_json,
                None,
                variant,
                paths,
            )?;
            extensions.insert(namespace_key, SchemaProperty::Object(object));
        }
        Ok(extensions)
    }

    /// Assembles an object from collected properties, used for commons and
    /// extension namespaces. Names inside use the plain top-level name.
    fn object_for_collected(
        &self,
        collected: &[CollectedProperty],
        outer: &PropertyModifier,
        parent_json: &JsonPath,
        logical_prefix: Option<&PropertyPath>,
        variant: SchemaVariant,
        paths: &mut EntityJsonPaths,
    ) -> Result<SchemaObject> {
        let mut properties: IndexMap<String, SchemaProperty> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();

        for cp in collected {
            let modifier = outer.concat(&cp.modifier);
            let property = self.graph.property(cp.property);
            let mapping = &self.property_mappings[&cp.property];
            let name = prefixed_name(&mapping.top_level_name, &modifier);
            let json_path = parent_json.field(&name);
            let logical = match logical_prefix {
                Some(prefix) => prefix.extend(&property.full_property_name()),
                None => PropertyPath::new(property.full_property_name()),
            };

            let schema =
                self.schema_property_for(cp.property, &modifier, &logical, &json_path, variant, paths)?;
            if is_required(self.graph, cp.property, &modifier) {
                required.push(name.clone());
            }
            properties.insert(name, schema);
        }

        Ok(SchemaObject::from_properties(properties, required))
    }

    /// Dispatch on property shape, mirroring the assembly rules of the
    /// mapping stage
    fn schema_property_for(
        &self,
        id: PropertyId,
        modifier: &PropertyModifier,
        logical: &PropertyPath,
        json_path: &JsonPath,
        variant: SchemaVariant,
        paths: &mut EntityJsonPaths,
    ) -> Result<SchemaProperty> {
        let property = self.graph.property(id);
        let mapping = &self.property_mappings[&id];
        let min_items = if is_required(self.graph, id, modifier) { 1 } else { 0 };

        if mapping.is_reference_collection {
            let reference_name = prefixed_name(&mapping.reference_collection_name, modifier);
            let reference = self.reference_object(
                id,
                &modifier.without_prefixes(),
                logical,
                &json_path.wildcard().field(&reference_name),
                variant,
                paths,
            )?;
            let mut item_properties = IndexMap::new();
            item_properties.insert(reference_name.clone(), SchemaProperty::Object(reference));
            let item = SchemaObject::from_properties(item_properties, vec![reference_name]);
            return Ok(SchemaProperty::Array(SchemaArray::wrapping(
                SchemaProperty::Object(item),
                min_items,
            )));
        }

        if mapping.is_scalar_reference {
            let reference = self.reference_object(id, modifier, logical, json_path, variant, paths)?;
            return Ok(SchemaProperty::Object(reference));
        }

        if mapping.is_descriptor_collection {
            let descriptor_name = prefixed_name(&mapping.descriptor_collection_name, modifier);
            if variant == SchemaVariant::Read {
                paths.add(
                    std::slice::from_ref(logical),
                    &json_path.wildcard().field(&descriptor_name),
                );
            }
            let mut item_properties = IndexMap::new();
            item_properties.insert(
                descriptor_name.clone(),
                SchemaProperty::Scalar(SchemaScalar::typed("string", "An Ed-Fi Descriptor")),
            );
            let item = SchemaObject::from_properties(item_properties, vec![descriptor_name]);
            return Ok(SchemaProperty::Array(SchemaArray::wrapping(
                SchemaProperty::Object(item),
                min_items,
            )));
        }

        if mapping.is_common_collection {
            let target = self.target_of(id)?;
            let object = self.object_for_collected(
                &self.entity_mappings[&target].collected_properties,
                modifier,
                &json_path.wildcard(),
                Some(logical),
                variant,
                paths,
            )?;
            // common collection arrays carry no minimum
            return Ok(SchemaProperty::Array(SchemaArray::wrapping(
                SchemaProperty::Object(object),
                0,
            )));
        }

        if mapping.is_scalar_common {
            let target = self.target_of(id)?;
            let object = self.object_for_collected(
                &self.entity_mappings[&target].collected_properties,
                modifier,
                json_path,
                Some(logical),
                variant,
                paths,
            )?;
            return Ok(SchemaProperty::Object(object));
        }

        if property.is_collection {
            let item_name = singularize(&prefixed_name(&mapping.full_name, modifier));
            let scalar = self.scalar_schema(
                id,
                std::slice::from_ref(logical),
                &json_path.wildcard().field(&item_name),
                variant,
                paths,
            )?;
            let mut item_properties = IndexMap::new();
            item_properties.insert(item_name.clone(), scalar);
            let item = SchemaObject::from_properties(item_properties, vec![item_name]);
            return Ok(SchemaProperty::Array(SchemaArray::wrapping(
                SchemaProperty::Object(item),
                min_items,
            )));
        }

        self.scalar_schema(id, std::slice::from_ref(logical), json_path, variant, paths)
    }

    /// The object a reference property expands into: one field per flattened
    /// identity leaf of the target. Leaves whose names coincide merge by
    /// overwrite; name duplication among flattened identities is always a
    /// validated merge.
    fn reference_object(
        &self,
        reference: PropertyId,
        modifier: &PropertyModifier,
        logical: &PropertyPath,
        json_path: &JsonPath,
        variant: SchemaVariant,
        paths: &mut EntityJsonPaths,
    ) -> Result<SchemaObject> {
        let target = self.target_of(reference)?;
        let mut local = EntityJsonPaths::new();
        let mut properties: IndexMap<String, SchemaProperty> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();

        for flattened in &self.entity_mappings[&target].flattened_identity_properties {
            let leaf_mapping = &self.property_mappings[&flattened.identity_property];
            let name = prefixed_name(&leaf_mapping.full_name, modifier);
            let mapped_paths: Vec<PropertyPath> = flattened
                .property_paths
                .iter()
                .map(|p| logical.extend(p.as_str()))
                .collect();
            let schema = self.scalar_schema(
                flattened.identity_property,
                &mapped_paths,
                &json_path.field(&name),
                variant,
                &mut local,
            )?;
            properties.insert(name.clone(), schema);
            if is_required(self.graph, flattened.identity_property, modifier) && !required.contains(&name)
            {
                required.push(name);
            }
        }

        if variant == SchemaVariant::Read {
            // the reference's own logical path resolves to every leaf
            let leaf_paths: Vec<JsonPath> = local.json_paths().cloned().collect();
            for leaf_path in &leaf_paths {
                paths.add(std::slice::from_ref(logical), leaf_path);
            }
            paths.merge(local);
        }

        Ok(SchemaObject::from_properties(properties, required))
    }

    /// Scalar leaf schema with path recording
    fn scalar_schema(
        &self,
        id: PropertyId,
        property_paths: &[PropertyPath],
        json_path: &JsonPath,
        variant: SchemaVariant,
        paths: &mut EntityJsonPaths,
    ) -> Result<SchemaProperty> {
        let property = self.graph.property(id);
        let description = property.documentation.as_str();
        let record = |json_path: &JsonPath, paths: &mut EntityJsonPaths| {
            if variant == SchemaVariant::Read {
                paths.add(property_paths, json_path);
            }
        };

        let scalar = match property.kind {
            PropertyKind::Boolean => SchemaScalar::typed("boolean", description),
            PropertyKind::Currency
            | PropertyKind::Decimal
            | PropertyKind::Duration
            | PropertyKind::Percent => SchemaScalar::typed("number", description),
            PropertyKind::Date => SchemaScalar {
                format: Some("date"),
                ..SchemaScalar::typed("string", description)
            },
            PropertyKind::DateTime => SchemaScalar {
                format: Some("date-time"),
                ..SchemaScalar::typed("string", description)
            },
            PropertyKind::Time => SchemaScalar {
                format: Some("time"),
                ..SchemaScalar::typed("string", description)
            },
            PropertyKind::Descriptor(_) | PropertyKind::Enumeration(_) => {
                SchemaScalar::typed("string", description)
            }
            PropertyKind::Integer | PropertyKind::Short => SchemaScalar {
                minimum: property.facets.min_value,
                maximum: property.facets.max_value,
                ..SchemaScalar::typed("integer", description)
            },
            PropertyKind::String => SchemaScalar {
                min_length: property.facets.min_length,
                max_length: property.facets.max_length,
                pattern: string_pattern(
                    variant,
                    property.is_identity,
                    property.is_required,
                    property.is_collection,
                ),
                ..SchemaScalar::typed("string", description)
            },
            PropertyKind::Year => SchemaScalar::typed("integer", description),
            PropertyKind::SchoolYearEnumeration => {
                // inside a common the school year nests under a reference
                // object; elsewhere it is the bare integer field
                let parent_kind = self.graph.entity(id.entity).kind;
                if matches!(parent_kind, EntityKind::Common | EntityKind::InlineCommon) {
                    record(&json_path.field("schoolYear"), paths);
                    return Ok(SchemaProperty::Object(self.school_year_enumeration_schema()));
                }
                record(json_path, paths);
                return Ok(SchemaProperty::Scalar(self.school_year_schema()));
            }
            PropertyKind::DomainEntity(_)
            | PropertyKind::Association(_)
            | PropertyKind::Common(_)
            | PropertyKind::InlineCommon(_)
            | PropertyKind::Choice(_) => {
                return Err(ArtifactError::InvalidDefinition(format!(
                    "property {} is not a scalar",
                    property.name
                )));
            }
        };

        record(json_path, paths);
        Ok(SchemaProperty::Scalar(scalar))
    }

    fn target_of(&self, id: PropertyId) -> Result<EntityId> {
        self.graph.property(id).kind.target().ok_or_else(|| {
            ArtifactError::InvalidDefinition(format!(
                "property {} has no referenced entity",
                self.graph.property(id).name
            ))
        })
    }
}

/// The `_ext` extension point, open to unmodeled content
fn extension_point(properties: IndexMap<String, SchemaProperty>) -> SchemaProperty {
    SchemaProperty::Object(SchemaObject {
        schema: None,
        title: None,
        description: Some("optional extension collection".to_string()),
        schema_type: "object",
        properties,
        additional_properties: true,
        required: None,
    })
}

fn string_pattern(
    variant: SchemaVariant,
    is_identity: bool,
    is_required: bool,
    is_collection: bool,
) -> Option<String> {
    if variant != SchemaVariant::Insert {
        return None;
    }
    if is_identity {
        return Some(IDENTITY_STRING_PATTERN.to_string());
    }
    if is_required && !is_collection {
        return Some(REQUIRED_STRING_PATTERN.to_string());
    }
    None
}
