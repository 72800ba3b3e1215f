//! Stage 2: reference resolution and identity flattening
//!
//! Entity-reference properties expand into trees of [`ReferenceComponent`]s
//! built from the referenced entity's identity properties, recursively. The
//! flattened leaves of those trees are what reference objects in API
//! documents are made of. Choice and inline-common groupings are substituted
//! into their parent's property list, each surviving property carrying a
//! [`PropertyModifier`] accumulated down the grouping chain.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{EntityId, MetamodelGraph, PropertyId, PropertyKind};
use crate::naming::decapitalize;
use crate::overlay::OverlayOutputs;
use crate::paths::PropertyPath;

/// Adjustments a property inherits from the grouping chain above it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyModifier {
    /// A choice or optional inline common above this property makes it
    /// individually optional
    pub optional_due_to_parent: bool,
    /// Role names of the groupings above, prepended to JSON names
    pub parent_prefixes: Vec<String>,
}

impl PropertyModifier {
    /// Concatenation of two modifiers, outer first
    pub fn concat(&self, inner: &PropertyModifier) -> PropertyModifier {
        PropertyModifier {
            optional_due_to_parent: self.optional_due_to_parent || inner.optional_due_to_parent,
            parent_prefixes: self
                .parent_prefixes
                .iter()
                .chain(inner.parent_prefixes.iter())
                .cloned()
                .collect(),
        }
    }

    /// Prefixes reset inside reference objects; optionality carries through
    pub fn without_prefixes(&self) -> PropertyModifier {
        PropertyModifier {
            optional_due_to_parent: self.optional_due_to_parent,
            parent_prefixes: Vec::new(),
        }
    }
}

/// The camelCase JSON name of a property under a modifier
pub fn prefixed_name(name: &str, modifier: &PropertyModifier) -> String {
    decapitalize(&format!("{}{name}", modifier.parent_prefixes.concat()))
}

/// A node in the expansion of a reference property
#[derive(Debug, Clone)]
pub enum ReferenceComponent {
    /// A scalar leaf contributing a document field
    Element { source: PropertyId },
    /// An entity reference expanding to the identity of its target
    Group {
        source: PropertyId,
        members: Vec<ReferenceComponent>,
    },
}

/// A leaf of a flattened identity, with the logical paths that reach it
#[derive(Debug, Clone)]
pub struct FlattenedIdentityProperty {
    /// The scalar identity property at the leaf
    pub identity_property: PropertyId,
    /// Accumulated logical paths, one per traversed reference plus the leaf
    pub property_paths: Vec<PropertyPath>,
    /// Reference properties traversed to reach the leaf, leaf last
    pub property_chain: Vec<PropertyId>,
    /// A merge directive collapses this leaf onto another physical field
    pub merged_away: bool,
}

/// A property surviving grouping substitution, with its modifier
#[derive(Debug, Clone)]
pub struct CollectedProperty {
    pub property: PropertyId,
    pub modifier: PropertyModifier,
}

/// Per-entity resolution results consumed by the assemblers
#[derive(Debug, Clone, Default)]
pub struct EntityApiMapping {
    /// Identity properties, groupings pulled up, sorted by full name
    pub identity_properties: Vec<PropertyId>,
    pub flattened_identity_properties: Vec<FlattenedIdentityProperty>,
    /// Assembly-ordered properties with grouping substitution applied
    pub collected_properties: Vec<CollectedProperty>,
}

pub type EntityMappings = HashMap<EntityId, EntityApiMapping>;

/// Resolves every entity, in referenced-before-referencer order
pub fn resolve_entities(graph: &MetamodelGraph, overlays: &OverlayOutputs) -> EntityMappings {
    let mut mappings = EntityMappings::new();
    for entity_id in graph.processing_order() {
        let identity_properties = identity_properties_sorted(graph, overlays, entity_id);
        let flattened_identity_properties = flatten_identity_properties(graph, overlays, entity_id);
        let mut collected_properties = Vec::new();
        collect_properties(
            graph,
            overlays,
            entity_id,
            &PropertyModifier::default(),
            &mut collected_properties,
        );
        mappings.insert(
            entity_id,
            EntityApiMapping {
                identity_properties,
                flattened_identity_properties,
                collected_properties,
            },
        );
    }
    debug!(entities = mappings.len(), "entity resolution complete");
    mappings
}

/// An entity's identity properties with inline-common and choice identities
/// pulled up, sorted by full property name
pub fn identity_properties_sorted(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    entity: EntityId,
) -> Vec<PropertyId> {
    let mut ids = Vec::new();
    gather_identity_properties(graph, overlays, entity, &mut ids);
    ids.sort_by_key(|id| graph.property(*id).full_property_name());
    ids
}

fn gather_identity_properties(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    entity: EntityId,
    out: &mut Vec<PropertyId>,
) {
    let effective = &overlays[&entity];
    out.extend(effective.identity_properties.iter().copied());
    for property_id in &effective.properties {
        match graph.property(*property_id).kind {
            PropertyKind::InlineCommon(target) | PropertyKind::Choice(target) => {
                gather_identity_properties(graph, overlays, target, out);
            }
            _ => {}
        }
    }
}

/// Expands a property into its reference component tree. Revisiting the same
/// property within one chain terminates that branch as already resolved.
pub fn reference_component(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    property: PropertyId,
) -> ReferenceComponent {
    build_component(graph, overlays, property, &mut Vec::new())
}

fn build_component(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    property: PropertyId,
    chain: &mut Vec<PropertyId>,
) -> ReferenceComponent {
    let kind = graph.property(property).kind;
    let target = match kind {
        PropertyKind::DomainEntity(target) | PropertyKind::Association(target)
            if !chain.contains(&property) =>
        {
            target
        }
        _ => return ReferenceComponent::Element { source: property },
    };

    chain.push(property);
    let members = identity_properties_sorted(graph, overlays, target)
        .into_iter()
        .map(|member| build_component(graph, overlays, member, chain))
        .collect();
    chain.pop();

    ReferenceComponent::Group {
        source: property,
        members,
    }
}

/// Flattens an entity's identity into scalar leaves with their logical paths
pub fn flatten_identity_properties(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    entity: EntityId,
) -> Vec<FlattenedIdentityProperty> {
    let mut out = Vec::new();
    for identity in identity_properties_sorted(graph, overlays, entity) {
        let component = reference_component(graph, overlays, identity);
        walk_component(graph, &component, None, &[], &[], &mut out);
    }
    out
}

fn walk_component(
    graph: &MetamodelGraph,
    component: &ReferenceComponent,
    prefix: Option<&PropertyPath>,
    accumulated: &[PropertyPath],
    chain: &[PropertyId],
    out: &mut Vec<FlattenedIdentityProperty>,
) {
    match component {
        ReferenceComponent::Element { source } => {
            let leaf_path = extend_path(prefix, graph, *source);
            let mut property_paths = accumulated.to_vec();
            property_paths.push(leaf_path);
            let mut property_chain = chain.to_vec();
            property_chain.push(*source);
            let merged_away = is_merged_away(graph, &property_chain);
            out.push(FlattenedIdentityProperty {
                identity_property: *source,
                property_paths,
                property_chain,
                merged_away,
            });
        }
        ReferenceComponent::Group { source, members } => {
            let group_path = extend_path(prefix, graph, *source);
            let mut accumulated = accumulated.to_vec();
            accumulated.push(group_path.clone());
            let mut chain = chain.to_vec();
            chain.push(*source);
            for member in members {
                walk_component(graph, member, Some(&group_path), &accumulated, &chain, out);
            }
        }
    }
}

fn extend_path(prefix: Option<&PropertyPath>, graph: &MetamodelGraph, property: PropertyId) -> PropertyPath {
    let name = graph.property(property).full_property_name();
    match prefix {
        Some(path) => path.extend(&name),
        None => PropertyPath::new(name),
    }
}

/// A leaf is merged away when a directive on any entity along its chain names
/// a prefix of the remaining relative path
fn is_merged_away(graph: &MetamodelGraph, chain: &[PropertyId]) -> bool {
    for start in 0..chain.len() {
        let owner = graph.entity(chain[start].entity);
        if owner.merge_directives.is_empty() {
            continue;
        }
        let relative: Vec<String> = chain[start..]
            .iter()
            .map(|id| graph.property(*id).full_property_name())
            .collect();
        for directive in &owner.merge_directives {
            if directive.source_path.len() <= relative.len()
                && directive.source_path[..] == relative[..directive.source_path.len()]
            {
                return true;
            }
        }
    }
    false
}

/// Substitutes choice and inline-common groupings into the property list,
/// accumulating modifiers. Commons stay whole; the assembler descends into
/// them with the modifier chain.
fn collect_properties(
    graph: &MetamodelGraph,
    overlays: &OverlayOutputs,
    entity: EntityId,
    modifier: &PropertyModifier,
    out: &mut Vec<CollectedProperty>,
) {
    for property_id in &overlays[&entity].properties {
        let property = graph.property(*property_id);
        match property.kind {
            PropertyKind::Choice(target) => {
                // choice members are never individually required
                let child = PropertyModifier {
                    optional_due_to_parent: true,
                    parent_prefixes: prefixes_with_role(modifier, property.role_name.as_deref()),
                };
                collect_properties(graph, overlays, target, &child, out);
            }
            PropertyKind::InlineCommon(target) => {
                let child = PropertyModifier {
                    optional_due_to_parent: modifier.optional_due_to_parent || !property.is_required,
                    parent_prefixes: prefixes_with_role(modifier, property.role_name.as_deref()),
                };
                collect_properties(graph, overlays, target, &child, out);
            }
            _ => out.push(CollectedProperty {
                property: *property_id,
                modifier: modifier.clone(),
            }),
        }
    }
}

fn prefixes_with_role(modifier: &PropertyModifier, role_name: Option<&str>) -> Vec<String> {
    let mut prefixes = modifier.parent_prefixes.clone();
    if let Some(role) = role_name {
        prefixes.push(role.to_string());
    }
    prefixes
}

/// Whether a property's document field is required under a modifier
pub fn is_required(graph: &MetamodelGraph, property: PropertyId, modifier: &PropertyModifier) -> bool {
    let p = graph.property(property);
    (p.is_required || p.is_identity) && !modifier.optional_due_to_parent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphBuilder;
    use crate::overlay::resolve_overlays;

    fn course_offering_graph() -> MetamodelGraph {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("School", "doc")
            .integer_identity("SchoolId", "doc");
        builder
            .domain_entity("Session", "doc")
            .string_identity("SessionName", "doc", Some(60), None)
            .school_year_identity("doc")
            .domain_entity_identity("School", "doc");
        builder
            .domain_entity("CourseOffering", "doc")
            .string_identity("LocalCourseCode", "doc", Some(60), None)
            .domain_entity_identity("School", "doc")
            .domain_entity_identity("Session", "doc")
            .merge("Session.School", "School");
        builder.build().unwrap()
    }

    fn paths_of(flattened: &FlattenedIdentityProperty) -> Vec<&str> {
        flattened.property_paths.iter().map(PropertyPath::as_str).collect()
    }

    #[test]
    fn test_flatten_orders_identities_by_full_name() {
        let graph = course_offering_graph();
        let overlays = resolve_overlays(&graph).unwrap();
        let course_offering = graph.entity_named("EdFi", "CourseOffering").unwrap();

        let flattened = flatten_identity_properties(&graph, &overlays, course_offering);
        let leaves: Vec<String> = flattened
            .iter()
            .map(|f| graph.property(f.identity_property).full_property_name())
            .collect();
        // LocalCourseCode, School.SchoolId, then Session's sorted identity
        assert_eq!(
            leaves,
            vec!["LocalCourseCode", "SchoolId", "SchoolId", "SchoolYear", "SessionName"]
        );
    }

    #[test]
    fn test_flatten_accumulates_property_paths() {
        let graph = course_offering_graph();
        let overlays = resolve_overlays(&graph).unwrap();
        let course_offering = graph.entity_named("EdFi", "CourseOffering").unwrap();

        let flattened = flatten_identity_properties(&graph, &overlays, course_offering);
        assert_eq!(paths_of(&flattened[0]), vec!["LocalCourseCode"]);
        assert_eq!(paths_of(&flattened[1]), vec!["School", "School.SchoolId"]);
        assert_eq!(
            paths_of(&flattened[2]),
            vec!["Session", "Session.School", "Session.School.SchoolId"]
        );
    }

    #[test]
    fn test_merge_directive_marks_leaf_merged_away() {
        let graph = course_offering_graph();
        let overlays = resolve_overlays(&graph).unwrap();
        let course_offering = graph.entity_named("EdFi", "CourseOffering").unwrap();

        let flattened = flatten_identity_properties(&graph, &overlays, course_offering);
        // the Session.School.SchoolId leaf is covered by the directive
        assert!(!flattened[1].merged_away);
        assert!(flattened[2].merged_away);
        assert!(!flattened[3].merged_away);
    }

    #[test]
    fn test_cycle_guard_terminates_self_reference() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("LearningStandard", "doc")
            .string_identity("LearningStandardId", "doc", Some(60), None)
            .domain_entity_reference("LearningStandard", "doc", false, false)
            .role_name("Parent");
        let graph = builder.build().unwrap();
        let overlays = resolve_overlays(&graph).unwrap();
        let entity = graph.entity_named("EdFi", "LearningStandard").unwrap();

        // expansion terminates rather than looping
        let flattened = flatten_identity_properties(&graph, &overlays, entity);
        assert_eq!(flattened.len(), 1);
    }

    #[test]
    fn test_choice_children_are_optional_with_role_prefixes() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .inline_common("EducationContentSource", "doc")
            .string("URI", "doc", false, true, Some(30), None);
        builder
            .choice("LearningResourceChoice", "doc")
            .string("LearningResourceMetadataURI", "doc", true, false, Some(30), None)
            .inline_common_property("EducationContentSource", "doc", false)
            .role_name("DerivativeSource");
        builder
            .domain_entity("EducationContent", "doc")
            .string_identity("ContentIdentifier", "doc", Some(30), None)
            .choice_property("LearningResourceChoice", "doc", true);
        let graph = builder.build().unwrap();
        let overlays = resolve_overlays(&graph).unwrap();
        let mappings = resolve_entities(&graph, &overlays);
        let entity = graph.entity_named("EdFi", "EducationContent").unwrap();

        let collected = &mappings[&entity].collected_properties;
        assert_eq!(collected.len(), 3);

        let metadata_uri = &collected[1];
        assert_eq!(graph.property(metadata_uri.property).name, "LearningResourceMetadataURI");
        assert!(metadata_uri.modifier.optional_due_to_parent);
        assert!(metadata_uri.modifier.parent_prefixes.is_empty());

        let derivative = &collected[2];
        assert_eq!(graph.property(derivative.property).name, "URI");
        assert_eq!(derivative.modifier.parent_prefixes, vec!["DerivativeSource"]);
        assert_eq!(
            prefixed_name("URIs", &derivative.modifier),
            "derivativeSourceURIs"
        );
    }
}
