//! Subclass and extension overlay
//!
//! Produces the effective property list for every entity: subclasses overlay
//! their base's properties with identity renames substituted in place.
//! Extension contributions are left to the schema assembler, which nests them
//! under the `_ext` extension point of the extended entity.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ArtifactError, Result};
use crate::model::{EntityId, MetamodelGraph, PropertyId};

/// The property list an entity exposes after inheritance is applied
#[derive(Debug, Clone, Default)]
pub struct EffectiveEntity {
    /// Assembly-ordered properties, base properties first
    pub properties: Vec<PropertyId>,
    /// Identity properties in declaration order
    pub identity_properties: Vec<PropertyId>,
}

pub type OverlayOutputs = HashMap<EntityId, EffectiveEntity>;

/// Computes the effective property list for every entity in the graph
pub fn resolve_overlays(graph: &MetamodelGraph) -> Result<OverlayOutputs> {
    let mut outputs = OverlayOutputs::new();
    for entity_id in graph.entity_ids() {
        let properties = effective_properties(graph, entity_id)?;
        let identity_properties = properties
            .iter()
            .copied()
            .filter(|id| graph.property(*id).is_identity)
            .collect();
        outputs.insert(
            entity_id,
            EffectiveEntity {
                properties,
                identity_properties,
            },
        );
    }
    debug!(entities = outputs.len(), "overlays resolved");
    Ok(outputs)
}

fn effective_properties(graph: &MetamodelGraph, entity_id: EntityId) -> Result<Vec<PropertyId>> {
    let entity = graph.entity(entity_id);

    let properties: Vec<PropertyId> = if entity.kind.is_subclass() {
        let base = entity.base.ok_or_else(|| ArtifactError::MissingBaseEntity {
            name: entity.name.clone(),
        })?;
        let mut inherited = effective_properties(graph, base)?;

        // identity renames replace the base property in place; everything
        // else is appended after the inherited list
        let mut appended = Vec::new();
        for own_id in graph.property_ids(entity_id) {
            let own = graph.property(own_id);
            match &own.renames_identity {
                Some(base_name) => {
                    let slot = inherited
                        .iter()
                        .position(|id| &graph.property(*id).name == base_name)
                        .ok_or_else(|| ArtifactError::UnresolvableIdentityRename {
                            entity: entity.name.clone(),
                            base_name: base_name.clone(),
                        })?;
                    inherited[slot] = own_id;
                }
                None => appended.push(own_id),
            }
        }
        inherited.extend(appended);
        inherited
    } else {
        graph.property_ids(entity_id).collect()
    };

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphBuilder;

    #[test]
    fn test_identity_rename_substitutes_in_place() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .abstract_entity("EducationOrganization", "doc")
            .integer_identity("EducationOrganizationId", "doc")
            .string("NameOfInstitution", "doc", true, false, Some(75), None);
        builder
            .domain_entity_subclass("CommunityOrganization", "EducationOrganization", "doc")
            .integer_identity_rename("CommunityOrganizationId", "EducationOrganizationId", "doc");
        let graph = builder.build().unwrap();

        let overlays = resolve_overlays(&graph).unwrap();
        let subclass = graph.entity_named("EdFi", "CommunityOrganization").unwrap();
        let effective = &overlays[&subclass];

        assert_eq!(effective.properties.len(), 2);
        assert_eq!(graph.property(effective.properties[0]).name, "CommunityOrganizationId");
        assert_eq!(graph.property(effective.properties[1]).name, "NameOfInstitution");
        assert_eq!(effective.identity_properties.len(), 1);
    }

    #[test]
    fn test_rename_without_matching_base_identity_is_an_error() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .abstract_entity("EducationOrganization", "doc")
            .integer_identity("EducationOrganizationId", "doc");
        builder
            .domain_entity_subclass("CommunityOrganization", "EducationOrganization", "doc")
            .integer_identity_rename("CommunityOrganizationId", "SomethingElse", "doc");
        let graph = builder.build().unwrap();

        assert!(matches!(
            resolve_overlays(&graph),
            Err(ArtifactError::UnresolvableIdentityRename { .. })
        ));
    }

    #[test]
    fn test_extension_does_not_merge_into_base_property_list() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("School", "doc")
            .integer_identity("SchoolId", "doc");
        builder.namespace("Sample");
        builder
            .domain_entity_extension("School", "School", "doc")
            .string("CharterStatus", "doc", false, false, Some(30), None);
        let graph = builder.build().unwrap();

        let overlays = resolve_overlays(&graph).unwrap();
        let school = graph.entity_named("EdFi", "School").unwrap();
        assert_eq!(overlays[&school].properties.len(), 1);

        let extension = graph.entity_named("Sample", "School").unwrap();
        assert_eq!(overlays[&extension].properties.len(), 1);
        assert_eq!(graph.extensions_of(school), vec![extension]);
    }
}
