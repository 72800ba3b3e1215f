//! Stage 6: pipeline orchestration and the artifact bundle
//!
//! Runs the stages in order (overlay, property mapping, identity resolution,
//! schema assembly, OpenAPI generation) over a metamodel graph and gathers
//! the results into a serializable `ArtifactSet`, grouped by namespace and
//! keyed by endpoint name. The bundle carries an optional SHA-256
//! fingerprint so repeated runs over the same graph can be compared cheaply.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::mapping::map_properties;
use crate::model::{Entity, EntityKind, MetamodelGraph};
use crate::openapi::{endpoint_name, resource_name, OpenApiGenerator};
use crate::overlay::resolve_overlays;
use crate::paths::EntityJsonPaths;
use crate::resolve::{resolve_entities, FlattenedIdentityProperty};
use crate::schema::{descriptor_document_schema, SchemaAssembler, SchemaVariant};

/// Everything the API layer needs to serve one resource
#[derive(Debug, Clone, Serialize)]
pub struct ApiArtifacts {
    pub resource_name: String,
    pub endpoint_name: String,
    pub is_descriptor: bool,
    /// Validation schema for documents returned by reads
    pub json_schema: Value,
    /// Validation schema for documents accepted by inserts
    pub json_schema_for_insert: Value,
    /// Logical dotted property path to physical JSON paths
    pub entity_json_paths: IndexMap<String, Vec<String>>,
    /// Field pairs merge directives require to hold equal values
    pub equality_constraints: Vec<EqualityConstraint>,
}

/// Two document fields a merge directive requires to be equal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EqualityConstraint {
    pub source_json_path: String,
    pub target_json_path: String,
}

/// The per-namespace slice of the bundle
#[derive(Debug, Clone, Serialize, Default)]
pub struct NamespaceArtifacts {
    /// Resources keyed by endpoint name, in processing order
    pub resources: IndexMap<String, ApiArtifacts>,
}

/// The complete output of one generation run
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSet {
    pub namespaces: IndexMap<String, NamespaceArtifacts>,
    pub open_api_resources: Value,
    pub open_api_descriptors: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Runs the full pipeline over a graph
pub fn generate(graph: &MetamodelGraph, config: &GeneratorConfig) -> Result<ArtifactSet> {
    let overlays = resolve_overlays(graph)?;
    let property_mappings = map_properties(graph);
    let entity_mappings = resolve_entities(graph, &overlays);
    let assembler = SchemaAssembler::new(graph, &property_mappings, &entity_mappings, config);
    let openapi = OpenApiGenerator::new(graph, &property_mappings, &entity_mappings, config);

    let mut namespaces: IndexMap<String, NamespaceArtifacts> = IndexMap::new();
    for namespace in graph.namespaces() {
        namespaces.insert(namespace.clone(), NamespaceArtifacts::default());
    }

    for entity_id in graph.processing_order() {
        let entity = graph.entity(entity_id);
        if !entity.kind.is_resource() {
            continue;
        }

        let artifacts = if entity.kind == EntityKind::Descriptor {
            let schema = serde_json::to_value(descriptor_document_schema())?;
            ApiArtifacts {
                resource_name: resource_name(entity),
                endpoint_name: endpoint_name(entity),
                is_descriptor: true,
                json_schema: schema.clone(),
                json_schema_for_insert: schema,
                entity_json_paths: IndexMap::new(),
                equality_constraints: Vec::new(),
            }
        } else {
            let read = assembler.document_schema(entity_id, SchemaVariant::Read)?;
            let insert = assembler.document_schema(entity_id, SchemaVariant::Insert)?;
            let equality_constraints = equality_constraints(
                entity,
                &entity_mappings[&entity_id].flattened_identity_properties,
                &read.json_paths,
            );
            let entity_json_paths = read
                .json_paths
                .iter()
                .map(|(property_path, json_paths)| {
                    (
                        property_path.as_str().to_string(),
                        json_paths.iter().map(|p| p.as_str().to_string()).collect(),
                    )
                })
                .collect();
            ApiArtifacts {
                resource_name: resource_name(entity),
                endpoint_name: endpoint_name(entity),
                is_descriptor: false,
                json_schema: serde_json::to_value(read.schema)?,
                json_schema_for_insert: serde_json::to_value(insert.schema)?,
                entity_json_paths,
                equality_constraints,
            }
        };

        debug!(
            namespace = %entity.namespace,
            endpoint = %artifacts.endpoint_name,
            "artifacts generated"
        );
        namespaces
            .entry(entity.namespace.clone())
            .or_default()
            .resources
            .insert(artifacts.endpoint_name.clone(), artifacts);
    }

    let mut set = ArtifactSet {
        namespaces,
        open_api_resources: openapi.resources_document()?,
        open_api_descriptors: openapi.descriptors_document()?,
        fingerprint: None,
    };
    if config.output.include_fingerprint {
        set.fingerprint = Some(fingerprint_of(&set)?);
    }

    let resources: usize = set.namespaces.values().map(|n| n.resources.len()).sum();
    info!(resources, namespaces = set.namespaces.len(), "pipeline complete");
    Ok(set)
}

/// Constraints for the merged-away identity leaves: the collapsed field must
/// hold the same value as the field its merge directive retained
fn equality_constraints(
    entity: &Entity,
    flattened: &[FlattenedIdentityProperty],
    paths: &EntityJsonPaths,
) -> Vec<EqualityConstraint> {
    let mut constraints = Vec::new();

    for leaf in flattened {
        if !leaf.merged_away {
            continue;
        }
        let Some(source_logical) = leaf.property_paths.last() else {
            continue;
        };
        let source_segments: Vec<&str> = source_logical.as_str().split('.').collect();

        for directive in &entity.merge_directives {
            if directive.source_path.len() > source_segments.len()
                || directive
                    .source_path
                    .iter()
                    .zip(&source_segments)
                    .any(|(a, b)| a.as_str() != *b)
            {
                continue;
            }
            let target_logical = directive
                .target_path
                .iter()
                .map(String::as_str)
                .chain(source_segments[directive.source_path.len()..].iter().copied())
                .collect::<Vec<&str>>()
                .join(".");
            let (Some(sources), Some(targets)) =
                (paths.get(source_logical.as_str()), paths.get(&target_logical))
            else {
                continue;
            };

            for (source, target) in sources.iter().zip(targets) {
                let constraint = EqualityConstraint {
                    source_json_path: source.as_str().to_string(),
                    target_json_path: target.as_str().to_string(),
                };
                if !constraints.contains(&constraint) {
                    constraints.push(constraint);
                }
            }
            break;
        }
    }

    constraints
}

/// SHA-256 over the serialized bundle, excluding the fingerprint itself
fn fingerprint_of(set: &ArtifactSet) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&set.namespaces)?);
    hasher.update(serde_json::to_vec(&set.open_api_resources)?);
    hasher.update(serde_json::to_vec(&set.open_api_descriptors)?);
    Ok(format!("{:x}", hasher.finalize()))
}
