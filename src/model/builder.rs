//! Programmatic construction of a [`MetamodelGraph`]
//!
//! The builder records entities and properties by name and wires up
//! cross-entity references when [`GraphBuilder::build`] is called, so
//! declaration order does not matter.

use std::collections::HashMap;

use crate::error::{ArtifactError, Result};
use crate::model::{
    Entity, EntityId, EntityKind, Facets, MergeDirective, MetamodelGraph, Property, PropertyKind,
};

#[derive(Debug, Clone)]
pub(crate) enum PendingKind {
    Scalar(PropertyKind),
    SchoolYear,
    Reference(String),
}

#[derive(Debug, Clone)]
pub(crate) struct PendingProperty {
    pub(crate) name: String,
    pub(crate) documentation: String,
    pub(crate) role_name: Option<String>,
    pub(crate) kind: PendingKind,
    pub(crate) is_identity: bool,
    pub(crate) is_required: bool,
    pub(crate) is_collection: bool,
    pub(crate) facets: Facets,
    pub(crate) renames_identity: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingEntity {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) kind: EntityKind,
    pub(crate) documentation: String,
    pub(crate) base_name: Option<String>,
    pub(crate) properties: Vec<PendingProperty>,
    pub(crate) merge_directives: Vec<MergeDirective>,
}

/// Builds a [`MetamodelGraph`] entity by entity
#[derive(Debug)]
pub struct GraphBuilder {
    namespaces: Vec<String>,
    current_namespace: String,
    entities: Vec<PendingEntity>,
}

impl GraphBuilder {
    pub fn new(namespace: &str) -> Self {
        GraphBuilder {
            namespaces: vec![namespace.to_string()],
            current_namespace: namespace.to_string(),
            entities: Vec::new(),
        }
    }

    /// Switches the namespace new entities are declared in
    pub fn namespace(&mut self, name: &str) -> &mut Self {
        if !self.namespaces.iter().any(|n| n == name) {
            self.namespaces.push(name.to_string());
        }
        self.current_namespace = name.to_string();
        self
    }

    pub(crate) fn push_entity(&mut self, entity: PendingEntity) {
        self.entities.push(entity);
    }

    fn entity(&mut self, name: &str, kind: EntityKind, documentation: &str) -> EntityBuilder<'_> {
        self.entities.push(PendingEntity {
            name: name.to_string(),
            namespace: self.current_namespace.clone(),
            kind,
            documentation: documentation.to_string(),
            base_name: None,
            properties: Vec::new(),
            merge_directives: Vec::new(),
        });
        let index = self.entities.len() - 1;
        EntityBuilder {
            builder: self,
            index,
        }
    }

    fn entity_with_base(
        &mut self,
        name: &str,
        base: &str,
        kind: EntityKind,
        documentation: &str,
    ) -> EntityBuilder<'_> {
        let entity = self.entity(name, kind, documentation);
        entity.builder.entities[entity.index].base_name = Some(base.to_string());
        entity
    }

    pub fn domain_entity(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::DomainEntity, documentation)
    }

    pub fn association(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::Association, documentation)
    }

    pub fn abstract_entity(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::AbstractEntity, documentation)
    }

    pub fn domain_entity_subclass(
        &mut self,
        name: &str,
        base: &str,
        documentation: &str,
    ) -> EntityBuilder<'_> {
        self.entity_with_base(name, base, EntityKind::DomainEntitySubclass, documentation)
    }

    pub fn association_subclass(
        &mut self,
        name: &str,
        base: &str,
        documentation: &str,
    ) -> EntityBuilder<'_> {
        self.entity_with_base(name, base, EntityKind::AssociationSubclass, documentation)
    }

    pub fn domain_entity_extension(
        &mut self,
        name: &str,
        base: &str,
        documentation: &str,
    ) -> EntityBuilder<'_> {
        self.entity_with_base(name, base, EntityKind::DomainEntityExtension, documentation)
    }

    pub fn association_extension(
        &mut self,
        name: &str,
        base: &str,
        documentation: &str,
    ) -> EntityBuilder<'_> {
        self.entity_with_base(name, base, EntityKind::AssociationExtension, documentation)
    }

    pub fn common(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::Common, documentation)
    }

    pub fn inline_common(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::InlineCommon, documentation)
    }

    pub fn choice(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::Choice, documentation)
    }

    pub fn descriptor(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::Descriptor, documentation)
    }

    pub fn enumeration(&mut self, name: &str, documentation: &str) -> EntityBuilder<'_> {
        self.entity(name, EntityKind::Enumeration, documentation)
    }

    /// Resolves names to ids and produces the immutable graph
    pub fn build(self) -> Result<MetamodelGraph> {
        let mut by_name: HashMap<(String, String), EntityId> = HashMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            let key = (entity.namespace.clone(), entity.name.clone());
            if by_name.insert(key, EntityId(i as u32)).is_some() {
                return Err(ArtifactError::DuplicateEntity {
                    name: entity.name.clone(),
                    namespace: entity.namespace.clone(),
                });
            }
        }

        let resolve = |from: &PendingEntity, target: &str, except: Option<EntityId>| {
            by_name
                .get(&(from.namespace.clone(), target.to_string()))
                .copied()
                .filter(|id| Some(*id) != except)
                .or_else(|| {
                    self.namespaces.iter().find_map(|ns| {
                        by_name
                            .get(&(ns.clone(), target.to_string()))
                            .copied()
                            .filter(|id| Some(*id) != except)
                    })
                })
        };

        let mut entities = Vec::with_capacity(self.entities.len());
        for (i, pending) in self.entities.iter().enumerate() {
            // extensions carry their base's name, so base resolution must not
            // find the extension entity itself
            let self_id = EntityId(i as u32);
            let base = match &pending.base_name {
                Some(base_name) => Some(resolve(pending, base_name, Some(self_id)).ok_or_else(
                    || ArtifactError::MissingBaseEntity {
                        name: pending.name.clone(),
                    },
                )?),
                None => {
                    if pending.kind.is_subclass() || pending.kind.is_extension() {
                        return Err(ArtifactError::MissingBaseEntity {
                            name: pending.name.clone(),
                        });
                    }
                    None
                }
            };

            let mut properties = Vec::with_capacity(pending.properties.len());
            for p in &pending.properties {
                let kind = match &p.kind {
                    PendingKind::Scalar(kind) => *kind,
                    PendingKind::SchoolYear => PropertyKind::SchoolYearEnumeration,
                    PendingKind::Reference(target_name) => {
                        let target = resolve(pending, target_name, None).ok_or_else(|| {
                            ArtifactError::UnresolvableReference {
                                entity: pending.name.clone(),
                                property: p.name.clone(),
                                target: target_name.clone(),
                            }
                        })?;
                        reference_kind_for(self.entities[target.0 as usize].kind, target)
                    }
                };
                properties.push(Property {
                    name: p.name.clone(),
                    documentation: p.documentation.clone(),
                    role_name: p.role_name.clone(),
                    kind,
                    is_identity: p.is_identity,
                    is_required: p.is_required,
                    is_collection: p.is_collection,
                    facets: p.facets.clone(),
                    renames_identity: p.renames_identity.clone(),
                });
            }

            entities.push(Entity {
                name: pending.name.clone(),
                namespace: pending.namespace.clone(),
                kind: pending.kind,
                documentation: pending.documentation.clone(),
                properties,
                base,
                merge_directives: pending.merge_directives.clone(),
            });
        }

        Ok(MetamodelGraph::new(entities, self.namespaces))
    }
}

/// The property kind a reference takes is determined by its target's kind
fn reference_kind_for(target_kind: EntityKind, target: EntityId) -> PropertyKind {
    match target_kind {
        EntityKind::Association | EntityKind::AssociationSubclass => {
            PropertyKind::Association(target)
        }
        EntityKind::Common => PropertyKind::Common(target),
        EntityKind::InlineCommon => PropertyKind::InlineCommon(target),
        EntityKind::Choice => PropertyKind::Choice(target),
        EntityKind::Descriptor => PropertyKind::Descriptor(target),
        EntityKind::Enumeration => PropertyKind::Enumeration(target),
        EntityKind::SchoolYearEnumeration => PropertyKind::SchoolYearEnumeration,
        _ => PropertyKind::DomainEntity(target),
    }
}

/// Adds properties to the entity most recently declared on a [`GraphBuilder`]
#[derive(Debug)]
pub struct EntityBuilder<'a> {
    builder: &'a mut GraphBuilder,
    index: usize,
}

impl EntityBuilder<'_> {
    fn push(
        &mut self,
        name: &str,
        documentation: &str,
        kind: PendingKind,
        is_identity: bool,
        is_required: bool,
        is_collection: bool,
        facets: Facets,
    ) -> &mut Self {
        self.builder.entities[self.index].properties.push(PendingProperty {
            name: name.to_string(),
            documentation: documentation.to_string(),
            role_name: None,
            kind,
            is_identity,
            is_required,
            is_collection,
            facets,
            renames_identity: None,
        });
        self
    }

    fn scalar(
        &mut self,
        name: &str,
        documentation: &str,
        kind: PropertyKind,
        required: bool,
        collection: bool,
        facets: Facets,
    ) -> &mut Self {
        self.push(
            name,
            documentation,
            PendingKind::Scalar(kind),
            false,
            required,
            collection,
            facets,
        )
    }

    /// Sets the role name of the most recently added property
    pub fn role_name(&mut self, role: &str) -> &mut Self {
        if let Some(last) = self.builder.entities[self.index].properties.last_mut() {
            last.role_name = Some(role.to_string());
        }
        self
    }

    pub fn boolean(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Boolean, required, collection, Facets::default())
    }

    pub fn currency(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Currency, required, collection, Facets::default())
    }

    pub fn decimal(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
        total_digits: Option<u32>,
        decimal_places: Option<u32>,
    ) -> &mut Self {
        let facets = Facets {
            total_digits,
            decimal_places,
            ..Facets::default()
        };
        self.scalar(name, doc, PropertyKind::Decimal, required, collection, facets)
    }

    pub fn duration(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Duration, required, collection, Facets::default())
    }

    pub fn percent(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Percent, required, collection, Facets::default())
    }

    pub fn date(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Date, required, collection, Facets::default())
    }

    pub fn date_identity(&mut self, name: &str, doc: &str) -> &mut Self {
        self.push(
            name,
            doc,
            PendingKind::Scalar(PropertyKind::Date),
            true,
            false,
            false,
            Facets::default(),
        )
    }

    pub fn datetime(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::DateTime, required, collection, Facets::default())
    }

    pub fn time(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Time, required, collection, Facets::default())
    }

    pub fn integer(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
        min_value: Option<i64>,
        max_value: Option<i64>,
    ) -> &mut Self {
        let facets = Facets {
            min_value,
            max_value,
            ..Facets::default()
        };
        self.scalar(name, doc, PropertyKind::Integer, required, collection, facets)
    }

    pub fn integer_identity(&mut self, name: &str, doc: &str) -> &mut Self {
        self.push(
            name,
            doc,
            PendingKind::Scalar(PropertyKind::Integer),
            true,
            false,
            false,
            Facets::default(),
        )
    }

    pub fn integer_identity_rename(&mut self, name: &str, base_name: &str, doc: &str) -> &mut Self {
        self.push(
            name,
            doc,
            PendingKind::Scalar(PropertyKind::Integer),
            true,
            false,
            false,
            Facets::default(),
        );
        if let Some(last) = self.builder.entities[self.index].properties.last_mut() {
            last.renames_identity = Some(base_name.to_string());
        }
        self
    }

    pub fn short(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
        min_value: Option<i64>,
        max_value: Option<i64>,
    ) -> &mut Self {
        let facets = Facets {
            min_value,
            max_value,
            ..Facets::default()
        };
        self.scalar(name, doc, PropertyKind::Short, required, collection, facets)
    }

    pub fn string(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
        max_length: Option<u32>,
        min_length: Option<u32>,
    ) -> &mut Self {
        let facets = Facets {
            min_length,
            max_length,
            ..Facets::default()
        };
        self.scalar(name, doc, PropertyKind::String, required, collection, facets)
    }

    pub fn string_identity(
        &mut self,
        name: &str,
        doc: &str,
        max_length: Option<u32>,
        min_length: Option<u32>,
    ) -> &mut Self {
        let facets = Facets {
            min_length,
            max_length,
            ..Facets::default()
        };
        self.push(
            name,
            doc,
            PendingKind::Scalar(PropertyKind::String),
            true,
            false,
            false,
            facets,
        )
    }

    pub fn year(&mut self, name: &str, doc: &str, required: bool, collection: bool) -> &mut Self {
        self.scalar(name, doc, PropertyKind::Year, required, collection, Facets::default())
    }

    /// A reference to the fixed school year enumeration; named `SchoolYear`
    /// like every other school year property
    pub fn school_year(&mut self, doc: &str, required: bool) -> &mut Self {
        self.push(
            "SchoolYear",
            doc,
            PendingKind::SchoolYear,
            false,
            required,
            false,
            Facets::default(),
        )
    }

    pub fn school_year_identity(&mut self, doc: &str) -> &mut Self {
        self.push(
            "SchoolYear",
            doc,
            PendingKind::SchoolYear,
            true,
            false,
            false,
            Facets::default(),
        )
    }

    pub fn domain_entity_reference(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
    ) -> &mut Self {
        self.push(
            name,
            doc,
            PendingKind::Reference(name.to_string()),
            false,
            required,
            collection,
            Facets::default(),
        )
    }

    pub fn domain_entity_identity(&mut self, name: &str, doc: &str) -> &mut Self {
        self.push(
            name,
            doc,
            PendingKind::Reference(name.to_string()),
            true,
            false,
            false,
            Facets::default(),
        )
    }

    pub fn association_reference(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
    ) -> &mut Self {
        self.domain_entity_reference(name, doc, required, collection)
    }

    pub fn common_property(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
    ) -> &mut Self {
        self.domain_entity_reference(name, doc, required, collection)
    }

    pub fn inline_common_property(&mut self, name: &str, doc: &str, required: bool) -> &mut Self {
        self.domain_entity_reference(name, doc, required, false)
    }

    pub fn choice_property(&mut self, name: &str, doc: &str, required: bool) -> &mut Self {
        self.domain_entity_reference(name, doc, required, false)
    }

    pub fn descriptor_property(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
    ) -> &mut Self {
        self.domain_entity_reference(name, doc, required, collection)
    }

    pub fn descriptor_identity(&mut self, name: &str, doc: &str) -> &mut Self {
        self.domain_entity_identity(name, doc)
    }

    pub fn enumeration_property(
        &mut self,
        name: &str,
        doc: &str,
        required: bool,
        collection: bool,
    ) -> &mut Self {
        self.domain_entity_reference(name, doc, required, collection)
    }

    /// Declares two reference paths equal; dotted full-property-name paths
    pub fn merge(&mut self, source_path: &str, target_path: &str) -> &mut Self {
        self.builder.entities[self.index]
            .merge_directives
            .push(MergeDirective {
                source_path: source_path.split('.').map(str::to_string).collect(),
                target_path: target_path.split('.').map(str::to_string).collect(),
            });
        self
    }
}
