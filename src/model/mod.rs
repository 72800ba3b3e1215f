//! The entity metamodel
//!
//! Entities and their properties live in an arena owned by [`MetamodelGraph`]
//! and are addressed by copyable ids. The derivation pipeline never mutates
//! the graph; every stage produces its own output map keyed by these ids.

pub mod builder;
pub mod loader;

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

pub use builder::GraphBuilder;
pub use loader::GraphDefinition;

/// Arena index of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

/// Arena index of a property, scoped to its declaring entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId {
    pub entity: EntityId,
    pub(crate) index: u32,
}

/// The closed set of entity kinds in the metamodel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    DomainEntity,
    Association,
    AbstractEntity,
    DomainEntitySubclass,
    AssociationSubclass,
    DomainEntityExtension,
    AssociationExtension,
    Common,
    InlineCommon,
    Choice,
    Descriptor,
    Enumeration,
    SchoolYearEnumeration,
}

impl EntityKind {
    /// Subclasses overlay a base entity's properties with their own
    pub fn is_subclass(&self) -> bool {
        matches!(
            self,
            EntityKind::DomainEntitySubclass | EntityKind::AssociationSubclass
        )
    }

    /// Extensions contribute properties to a base entity
    pub fn is_extension(&self) -> bool {
        matches!(
            self,
            EntityKind::DomainEntityExtension | EntityKind::AssociationExtension
        )
    }

    /// Kinds that get their own API document schema
    pub fn has_document_schema(&self) -> bool {
        matches!(
            self,
            EntityKind::DomainEntity
                | EntityKind::Association
                | EntityKind::DomainEntitySubclass
                | EntityKind::AssociationSubclass
        )
    }

    /// Kinds that appear as API resources (paths, tags, endpoints)
    pub fn is_resource(&self) -> bool {
        self.has_document_schema() || matches!(self, EntityKind::Descriptor)
    }
}

/// The closed set of property kinds; reference kinds carry their target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    Boolean,
    Currency,
    Decimal,
    Duration,
    Percent,
    Date,
    DateTime,
    Time,
    Integer,
    Short,
    String,
    Year,
    /// A reference to the fixed school year enumeration
    SchoolYearEnumeration,
    DomainEntity(EntityId),
    Association(EntityId),
    Common(EntityId),
    InlineCommon(EntityId),
    Choice(EntityId),
    Descriptor(EntityId),
    Enumeration(EntityId),
}

impl PropertyKind {
    /// Entity references expand to reference objects of identity leaves
    pub fn is_entity_reference(&self) -> bool {
        matches!(self, PropertyKind::DomainEntity(_) | PropertyKind::Association(_))
    }

    /// Groupings are substituted inline into their parent's property list
    pub fn is_grouping(&self) -> bool {
        matches!(
            self,
            PropertyKind::Common(_) | PropertyKind::InlineCommon(_) | PropertyKind::Choice(_)
        )
    }

    pub fn target(&self) -> Option<EntityId> {
        match self {
            PropertyKind::DomainEntity(id)
            | PropertyKind::Association(id)
            | PropertyKind::Common(id)
            | PropertyKind::InlineCommon(id)
            | PropertyKind::Choice(id)
            | PropertyKind::Descriptor(id)
            | PropertyKind::Enumeration(id) => Some(*id),
            _ => None,
        }
    }
}

/// Value constraints carried by scalar properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facets {
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub total_digits: Option<u32>,
    pub decimal_places: Option<u32>,
}

/// A property declared on an entity
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub documentation: String,
    pub role_name: Option<String>,
    pub kind: PropertyKind,
    pub is_identity: bool,
    pub is_required: bool,
    pub is_collection: bool,
    pub facets: Facets,
    /// On a subclass, the base identity property this one replaces
    pub renames_identity: Option<String>,
}

impl Property {
    /// Role name prefixed onto the declared name; the logical name used in
    /// property paths
    pub fn full_property_name(&self) -> String {
        match &self.role_name {
            // a role name equal to the declared name is not doubled
            Some(role) if role != &self.name => format!("{role}{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Declares two reference paths equal so they collapse to one physical field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeDirective {
    /// Dotted full-property-name path that is merged away
    pub source_path: Vec<String>,
    /// Dotted full-property-name path it is merged into
    pub target_path: Vec<String>,
}

/// An entity in the metamodel
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub namespace: String,
    pub kind: EntityKind,
    pub documentation: String,
    pub properties: Vec<Property>,
    pub base: Option<EntityId>,
    pub merge_directives: Vec<MergeDirective>,
}

/// The immutable entity arena plus lookup and ordering support
#[derive(Debug, Clone)]
pub struct MetamodelGraph {
    entities: Vec<Entity>,
    by_name: HashMap<(String, String), EntityId>,
    namespaces: Vec<String>,
}

impl MetamodelGraph {
    pub(crate) fn new(entities: Vec<Entity>, namespaces: Vec<String>) -> Self {
        let by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.namespace.clone(), e.name.clone()), EntityId(i as u32)))
            .collect();
        MetamodelGraph {
            entities,
            by_name,
            namespaces,
        }
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn property(&self, id: PropertyId) -> &Property {
        &self.entity(id.entity).properties[id.index as usize]
    }

    /// Ids of an entity's declared properties, in declaration order
    pub fn property_ids(&self, entity: EntityId) -> impl Iterator<Item = PropertyId> + '_ {
        (0..self.entity(entity).properties.len() as u32).map(move |index| PropertyId {
            entity,
            index,
        })
    }

    pub fn entity_named(&self, namespace: &str, name: &str) -> Option<EntityId> {
        self.by_name
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len() as u32).map(EntityId)
    }

    /// Namespaces in declaration order
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Extensions declared against the given base entity
    pub fn extensions_of(&self, base: EntityId) -> Vec<EntityId> {
        self.entity_ids()
            .filter(|id| {
                let e = self.entity(*id);
                e.kind.is_extension() && e.base == Some(base)
            })
            .collect()
    }

    /// Entity processing order: referenced entities before their referencers.
    ///
    /// Built from the reference edges of the graph; strongly connected
    /// components (reference cycles) are emitted as units, in reverse
    /// topological order of the condensation.
    pub fn processing_order(&self) -> Vec<EntityId> {
        let mut graph: DiGraph<EntityId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .entity_ids()
            .map(|id| graph.add_node(id))
            .collect();

        for id in self.entity_ids() {
            let entity = self.entity(id);
            for property in &entity.properties {
                if let Some(target) = property.kind.target() {
                    graph.add_edge(nodes[id.0 as usize], nodes[target.0 as usize], ());
                }
            }
            if let Some(base) = entity.base {
                graph.add_edge(nodes[id.0 as usize], nodes[base.0 as usize], ());
            }
        }

        // tarjan_scc yields components with every successor (referenced
        // entity) in an earlier component
        tarjan_scc(&graph)
            .into_iter()
            .flatten()
            .map(|node| graph[node])
            .collect()
    }
}
