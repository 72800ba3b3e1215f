//! Serde-deserializable metamodel definitions
//!
//! The CLI accepts a JSON graph definition and converts it into a
//! [`MetamodelGraph`] through the same name resolution the builder uses.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::builder::{GraphBuilder, PendingEntity, PendingKind, PendingProperty};
use crate::model::{EntityKind, Facets, MergeDirective, MetamodelGraph};

/// A whole metamodel as read from a definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub namespaces: Vec<NamespaceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub name: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub documentation: String,
    /// Base entity name for subclasses and extensions
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub merge_directives: Vec<MergeDirectiveDefinition>,
}

/// Scalar kinds plus an untargeted `reference` marker; references name their
/// target entity, defaulting to the property name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKindDefinition {
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
    SchoolYearEnumeration,
    Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    pub kind: PropertyKindDefinition,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub collection: bool,
    #[serde(default)]
    pub renames_identity: Option<String>,
    #[serde(flatten)]
    pub facets: Facets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDirectiveDefinition {
    pub source_path: String,
    pub target_path: String,
}

impl GraphDefinition {
    /// Reads a definition from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolves the definition into an immutable graph
    pub fn into_graph(self) -> Result<MetamodelGraph> {
        let first = self
            .namespaces
            .first()
            .map(|ns| ns.name.clone())
            .unwrap_or_else(|| "EdFi".to_string());
        let mut builder = GraphBuilder::new(&first);

        for namespace in &self.namespaces {
            builder.namespace(&namespace.name);
            for entity in &namespace.entities {
                builder.push_entity(pending_entity_from(entity, &namespace.name));
            }
        }
        builder.build()
    }
}

fn pending_entity_from(definition: &EntityDefinition, namespace: &str) -> PendingEntity {
    PendingEntity {
        name: definition.name.clone(),
        namespace: namespace.to_string(),
        kind: definition.kind,
        documentation: definition.documentation.clone(),
        base_name: definition.base.clone(),
        properties: definition.properties.iter().map(pending_property_from).collect(),
        merge_directives: definition
            .merge_directives
            .iter()
            .map(|m| MergeDirective {
                source_path: m.source_path.split('.').map(str::to_string).collect(),
                target_path: m.target_path.split('.').map(str::to_string).collect(),
            })
            .collect(),
    }
}

fn pending_property_from(definition: &PropertyDefinition) -> PendingProperty {
    use crate::model::PropertyKind;

    let kind = match definition.kind {
        PropertyKindDefinition::Boolean => PendingKind::Scalar(PropertyKind::Boolean),
        PropertyKindDefinition::Currency => PendingKind::Scalar(PropertyKind::Currency),
        PropertyKindDefinition::Decimal => PendingKind::Scalar(PropertyKind::Decimal),
        PropertyKindDefinition::Duration => PendingKind::Scalar(PropertyKind::Duration),
        PropertyKindDefinition::Percent => PendingKind::Scalar(PropertyKind::Percent),
        PropertyKindDefinition::Date => PendingKind::Scalar(PropertyKind::Date),
        PropertyKindDefinition::DateTime => PendingKind::Scalar(PropertyKind::DateTime),
        PropertyKindDefinition::Time => PendingKind::Scalar(PropertyKind::Time),
        PropertyKindDefinition::Integer => PendingKind::Scalar(PropertyKind::Integer),
        PropertyKindDefinition::Short => PendingKind::Scalar(PropertyKind::Short),
        PropertyKindDefinition::String => PendingKind::Scalar(PropertyKind::String),
        PropertyKindDefinition::Year => PendingKind::Scalar(PropertyKind::Year),
        PropertyKindDefinition::SchoolYearEnumeration => PendingKind::SchoolYear,
        PropertyKindDefinition::Reference => {
            PendingKind::Reference(definition.target.clone().unwrap_or_else(|| definition.name.clone()))
        }
    };

    PendingProperty {
        name: definition.name.clone(),
        documentation: definition.documentation.clone(),
        role_name: definition.role_name.clone(),
        kind,
        is_identity: definition.identity,
        is_required: definition.required,
        is_collection: definition.collection,
        facets: definition.facets.clone(),
        renames_identity: definition.renames_identity.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyKind;

    #[test]
    fn test_load_simple_definition() {
        let text = r#"{
            "namespaces": [
                {
                    "name": "EdFi",
                    "entities": [
                        {
                            "name": "School",
                            "kind": "domainEntity",
                            "documentation": "doc",
                            "properties": [
                                { "name": "SchoolId", "kind": "integer", "identity": true }
                            ]
                        },
                        {
                            "name": "Session",
                            "kind": "domainEntity",
                            "documentation": "doc",
                            "properties": [
                                {
                                    "name": "SessionName",
                                    "kind": "string",
                                    "identity": true,
                                    "maxLength": 60
                                },
                                { "name": "School", "kind": "reference", "identity": true }
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let graph = GraphDefinition::from_json(text).unwrap().into_graph().unwrap();
        let session = graph.entity_named("EdFi", "Session").unwrap();
        let school = graph.entity_named("EdFi", "School").unwrap();
        let entity = graph.entity(session);
        assert_eq!(entity.properties.len(), 2);
        assert_eq!(entity.properties[0].facets.max_length, Some(60));
        assert_eq!(entity.properties[1].kind, PropertyKind::DomainEntity(school));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let text = r#"{
            "namespaces": [
                {
                    "name": "EdFi",
                    "entities": [
                        { "name": "School", "kind": "widget" }
                    ]
                }
            ]
        }"#;
        assert!(GraphDefinition::from_json(text).is_err());
    }
}
