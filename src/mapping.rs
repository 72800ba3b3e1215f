//! Stage 1: canonical API naming and shape classification per property
//!
//! Every property gets a [`PropertyApiMapping`] describing the JSON names it
//! will take in API documents and which assembly rule applies to it. Names
//! here are still PascalCase; decapitalization happens at emission.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{EntityId, MetamodelGraph, Property, PropertyId, PropertyKind};
use crate::naming::{pluralize, strip_parent_overlap};

/// How a property presents itself in API documents
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyApiMapping {
    pub metamodel_name: String,
    pub kind: PropertyKind,
    /// Role-prefixed name with the parent-prefix elision convention applied
    pub full_name: String,
    /// Role-prefixed name with no elision
    pub full_name_preserving_prefix: String,
    /// Name the property takes at its nesting level (pluralized for
    /// collections, `Reference` suffix for scalar references)
    pub top_level_name: String,
    /// `top_level_name` unless a subclass naming collision forced the
    /// prefix-preserving form
    pub decollisioned_top_level_name: String,
    /// Item name inside a reference collection array
    pub reference_collection_name: String,
    /// Item name inside a descriptor collection array
    pub descriptor_collection_name: String,
    pub is_scalar_reference: bool,
    pub is_reference_collection: bool,
    pub is_descriptor_collection: bool,
    pub is_scalar_common: bool,
    pub is_common_collection: bool,
    pub is_choice: bool,
    pub is_inline_common: bool,
}

pub type PropertyMappings = HashMap<PropertyId, PropertyApiMapping>;

/// Parent-prefix elision applies to commons, choices and non-reference
/// collections; scalar references, entity reference collections and simple
/// scalars keep their full name.
fn elision_applies(property: &Property) -> bool {
    if property.kind.is_entity_reference() {
        return false;
    }
    if matches!(property.kind, PropertyKind::SchoolYearEnumeration) {
        return false;
    }
    property.is_collection || property.kind.is_grouping()
}

fn api_base_name(property: &Property, parent_name: &str) -> String {
    let full = property.full_property_name();
    if elision_applies(property) {
        if let Some(stripped) = strip_parent_overlap(&full, parent_name) {
            return stripped;
        }
    }
    full
}

/// The name a property takes at its nesting level, given a base name
fn top_level_from(property: &Property, base_name: &str) -> String {
    match property.kind {
        PropertyKind::DomainEntity(_) | PropertyKind::Association(_) => {
            if property.is_collection {
                pluralize(base_name)
            } else {
                format!("{base_name}Reference")
            }
        }
        PropertyKind::Descriptor(_) => {
            if property.is_collection {
                pluralize(base_name)
            } else {
                format!("{base_name}Descriptor")
            }
        }
        PropertyKind::SchoolYearEnumeration => match &property.role_name {
            Some(role) => format!("{role}SchoolYearTypeReference"),
            None => "SchoolYearTypeReference".to_string(),
        },
        PropertyKind::Choice(_) | PropertyKind::InlineCommon(_) => base_name.to_string(),
        _ => {
            if property.is_collection {
                pluralize(base_name)
            } else {
                base_name.to_string()
            }
        }
    }
}

fn mapping_for(property: &Property, parent_name: &str) -> PropertyApiMapping {
    mapping_with_base(property, api_base_name(property, parent_name))
}

fn mapping_with_base(property: &Property, base_name: String) -> PropertyApiMapping {
    let full_name_preserving_prefix = property.full_property_name();

    // scalar descriptors carry the Descriptor suffix in their full name, so
    // flattened identity leaves pick it up
    let full_name = match property.kind {
        PropertyKind::Descriptor(_) if !property.is_collection => format!("{base_name}Descriptor"),
        _ => base_name.clone(),
    };

    let top_level_name = top_level_from(property, &base_name);

    PropertyApiMapping {
        metamodel_name: property.name.clone(),
        kind: property.kind,
        full_name,
        full_name_preserving_prefix: full_name_preserving_prefix.clone(),
        decollisioned_top_level_name: top_level_name.clone(),
        top_level_name,
        reference_collection_name: format!("{}Reference", property.full_property_name()),
        descriptor_collection_name: format!("{}Descriptor", property.name),
        is_scalar_reference: property.kind.is_entity_reference() && !property.is_collection,
        is_reference_collection: property.kind.is_entity_reference() && property.is_collection,
        is_descriptor_collection: matches!(property.kind, PropertyKind::Descriptor(_))
            && property.is_collection,
        is_scalar_common: matches!(property.kind, PropertyKind::Common(_)) && !property.is_collection,
        is_common_collection: matches!(property.kind, PropertyKind::Common(_))
            && property.is_collection,
        is_choice: matches!(property.kind, PropertyKind::Choice(_)),
        is_inline_common: matches!(property.kind, PropertyKind::InlineCommon(_)),
    }
}

/// Computes the [`PropertyApiMapping`] for every property in the graph,
/// including subclass naming decollision.
pub fn map_properties(graph: &MetamodelGraph) -> PropertyMappings {
    let mut mappings: PropertyMappings = HashMap::new();

    for entity_id in graph.entity_ids() {
        let entity = graph.entity(entity_id);
        for property_id in graph.property_ids(entity_id) {
            let property = graph.property(property_id);
            mappings.insert(property_id, mapping_for(property, &entity.name));
        }
        retain_prefix_on_sibling_collision(graph, entity_id, &mut mappings);
    }

    decollision_subclass_names(graph, &mut mappings);
    debug!(properties = mappings.len(), "property api mappings computed");
    mappings
}

/// Elision is suppressed when the stripped name would collide with a
/// sibling's physical field name; the property keeps its full unstripped
/// name instead.
fn retain_prefix_on_sibling_collision(
    graph: &MetamodelGraph,
    entity_id: EntityId,
    mappings: &mut PropertyMappings,
) {
    let entity = graph.entity(entity_id);
    let ids: Vec<PropertyId> = graph.property_ids(entity_id).collect();

    let reverted: Vec<PropertyId> = ids
        .iter()
        .copied()
        .filter(|id| {
            let property = graph.property(*id);
            let elided = elision_applies(property)
                && strip_parent_overlap(&property.full_property_name(), &entity.name).is_some();
            elided
                && ids.iter().any(|other| {
                    other != id
                        && mappings[other].top_level_name == mappings[id].top_level_name
                })
        })
        .collect();

    for id in reverted {
        let property = graph.property(id);
        mappings.insert(id, mapping_with_base(property, property.full_property_name()));
    }
}

/// When a subclass property's top-level name matches one inherited from its
/// base, both fall back to their prefix-preserving names.
fn decollision_subclass_names(graph: &MetamodelGraph, mappings: &mut PropertyMappings) {
    for entity_id in graph.entity_ids() {
        let entity = graph.entity(entity_id);
        if !entity.kind.is_subclass() {
            continue;
        }
        let Some(base_id) = entity.base else { continue };

        for own_id in graph.property_ids(entity_id) {
            for base_property_id in base_property_ids(graph, base_id) {
                let own_name = mappings[&own_id].top_level_name.clone();
                let base_name = mappings[&base_property_id].top_level_name.clone();
                if own_name != base_name {
                    continue;
                }
                for id in [own_id, base_property_id] {
                    let property = graph.property(id);
                    let preserving = mappings[&id].full_name_preserving_prefix.clone();
                    let decollisioned = top_level_from(property, &preserving);
                    if let Some(mapping) = mappings.get_mut(&id) {
                        mapping.decollisioned_top_level_name = decollisioned;
                    }
                }
            }
        }
    }
}

fn base_property_ids(graph: &MetamodelGraph, base: EntityId) -> Vec<PropertyId> {
    let mut ids: Vec<PropertyId> = graph.property_ids(base).collect();
    if let Some(parent) = graph.entity(base).base {
        ids.extend(base_property_ids(graph, parent));
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphBuilder;

    fn mapping_of(graph: &MetamodelGraph, entity: &str, index: u32) -> PropertyApiMapping {
        let id = graph.entity_named("EdFi", entity).unwrap();
        let mappings = map_properties(graph);
        mappings[&crate::model::PropertyId { entity: id, index }].clone()
    }

    #[test]
    fn test_scalar_reference_gets_reference_suffix() {
        let mut builder = GraphBuilder::new("EdFi");
        builder.domain_entity("School", "doc").integer_identity("SchoolId", "doc");
        builder
            .domain_entity("Session", "doc")
            .string_identity("SessionName", "doc", Some(60), None)
            .domain_entity_identity("School", "doc");
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "Session", 1);
        assert_eq!(mapping.top_level_name, "SchoolReference");
        assert!(mapping.is_scalar_reference);
    }

    #[test]
    fn test_reference_collection_names() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("ClassPeriod", "doc")
            .string_identity("ClassPeriodName", "doc", Some(30), None);
        builder
            .domain_entity("Section", "doc")
            .string_identity("SectionIdentifier", "doc", Some(30), None)
            .domain_entity_reference("ClassPeriod", "doc", true, true);
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "Section", 1);
        assert_eq!(mapping.top_level_name, "ClassPeriods");
        assert_eq!(mapping.reference_collection_name, "ClassPeriodReference");
        assert!(mapping.is_reference_collection);
    }

    #[test]
    fn test_identity_keeps_parent_prefix() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("Section", "doc")
            .string_identity("SectionIdentifier", "doc", Some(30), None);
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "Section", 0);
        assert_eq!(mapping.full_name, "SectionIdentifier");
        assert_eq!(mapping.top_level_name, "SectionIdentifier");
    }

    #[test]
    fn test_collection_elides_parent_overlap() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("ObjectiveAssessment", "doc")
            .string_identity("IdentificationCode", "doc", Some(30), None)
            .string("AssessmentDescription", "doc", false, true, Some(100), None);
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "ObjectiveAssessment", 1);
        assert_eq!(mapping.full_name, "Description");
        assert_eq!(mapping.top_level_name, "Descriptions");
        assert_eq!(mapping.full_name_preserving_prefix, "AssessmentDescription");
    }

    #[test]
    fn test_elision_suppressed_on_sibling_collision() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("Assessment", "doc")
            .integer_identity("AssessmentIdentifier", "doc")
            .string("AssessmentScore", "doc", false, true, Some(35), None)
            .string("Score", "doc", false, true, Some(35), None);
        let graph = builder.build().unwrap();

        // "AssessmentScore" would elide to "Score", colliding with the
        // sibling; it keeps the unstripped name instead
        let stripped = mapping_of(&graph, "Assessment", 1);
        assert_eq!(stripped.full_name, "AssessmentScore");
        assert_eq!(stripped.top_level_name, "AssessmentScores");

        let sibling = mapping_of(&graph, "Assessment", 2);
        assert_eq!(sibling.top_level_name, "Scores");
    }

    #[test]
    fn test_reference_collection_keeps_parent_overlap() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("EducationContentSuffixName", "doc")
            .string_identity("Name", "doc", Some(30), None);
        builder
            .domain_entity("EducationContent", "doc")
            .string_identity("ContentIdentifier", "doc", Some(30), None)
            .domain_entity_reference("EducationContentSuffixName", "doc", false, true);
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "EducationContent", 1);
        assert_eq!(mapping.top_level_name, "EducationContentSuffixNames");
    }

    #[test]
    fn test_descriptor_names() {
        let mut builder = GraphBuilder::new("EdFi");
        builder.descriptor("GradeLevel", "doc");
        builder
            .domain_entity("Assessment", "doc")
            .integer_identity("AssessmentIdentifier", "doc")
            .descriptor_property("GradeLevel", "doc", false, true)
            .role_name("Assessed")
            .descriptor_property("GradeLevel", "doc", false, false)
            .role_name("Target");
        let graph = builder.build().unwrap();

        let collection = mapping_of(&graph, "Assessment", 1);
        assert_eq!(collection.top_level_name, "AssessedGradeLevels");
        assert_eq!(collection.descriptor_collection_name, "GradeLevelDescriptor");
        assert!(collection.is_descriptor_collection);

        let scalar = mapping_of(&graph, "Assessment", 2);
        assert_eq!(scalar.full_name, "TargetGradeLevelDescriptor");
        assert_eq!(scalar.top_level_name, "TargetGradeLevelDescriptor");
    }

    #[test]
    fn test_descriptor_collection_elides_role_overlap() {
        let mut builder = GraphBuilder::new("EdFi");
        builder.descriptor("GradeLevel", "doc");
        builder
            .domain_entity("LearningObjective", "doc")
            .string_identity("LearningObjectiveId", "doc", Some(10), None)
            .descriptor_property("GradeLevel", "doc", false, true)
            .role_name("Objective");
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "LearningObjective", 1);
        assert_eq!(mapping.full_name, "GradeLevel");
        assert_eq!(mapping.top_level_name, "GradeLevels");
    }

    #[test]
    fn test_school_year_top_level_name() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("StudentSchoolAssociation", "doc")
            .integer_identity("SchoolId", "doc")
            .school_year("doc", false)
            .role_name("ClassOf");
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "StudentSchoolAssociation", 1);
        assert_eq!(mapping.top_level_name, "ClassOfSchoolYearTypeReference");
    }

    #[test]
    fn test_role_name_equal_to_entity_name_not_doubled() {
        let mut builder = GraphBuilder::new("EdFi");
        builder.domain_entity("School", "doc").integer_identity("SchoolId", "doc");
        builder
            .domain_entity("Section", "doc")
            .string_identity("SectionIdentifier", "doc", Some(30), None)
            .domain_entity_reference("School", "doc", true, false)
            .role_name("School");
        let graph = builder.build().unwrap();

        let mapping = mapping_of(&graph, "Section", 1);
        assert_eq!(mapping.top_level_name, "SchoolReference");
    }

    #[test]
    fn test_subclass_collision_preserves_prefixes() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .abstract_entity("EducationOrganization", "doc")
            .integer_identity("Identity", "doc")
            .string("EducationOrganizationCategory", "doc", true, true, Some(30), None);
        builder
            .domain_entity_subclass("School", "EducationOrganization", "doc")
            .string("SchoolCategory", "doc", true, true, Some(30), None);
        let graph = builder.build().unwrap();

        let mappings = map_properties(&graph);
        let base = graph.entity_named("EdFi", "EducationOrganization").unwrap();
        let subclass = graph.entity_named("EdFi", "School").unwrap();

        let base_mapping = &mappings[&crate::model::PropertyId { entity: base, index: 1 }];
        assert_eq!(base_mapping.top_level_name, "Categories");
        assert_eq!(
            base_mapping.decollisioned_top_level_name,
            "EducationOrganizationCategories"
        );

        let subclass_mapping = &mappings[&crate::model::PropertyId { entity: subclass, index: 0 }];
        assert_eq!(subclass_mapping.top_level_name, "Categories");
        assert_eq!(subclass_mapping.decollisioned_top_level_name, "SchoolCategories");
    }
}
