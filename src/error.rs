//! Error types for API artifact derivation

use thiserror::Error;

/// Result type for artifact operations
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Artifact derivation errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Unknown entity: {name} in namespace {namespace}")]
    UnknownEntity { name: String, namespace: String },

    #[error("Property {property} on {entity} references unknown entity {target}")]
    UnresolvableReference {
        entity: String,
        property: String,
        target: String,
    },

    #[error("Subclass or extension {name} has no base entity")]
    MissingBaseEntity { name: String },

    #[error("Identity rename on {entity} names no base identity property {base_name}")]
    UnresolvableIdentityRename { entity: String, base_name: String },

    #[error("Merge directive on {entity} has unresolvable path {path}")]
    UnresolvableMergePath { entity: String, path: String },

    #[error("Property name collision on {entity} cannot be qualified away: {name}")]
    UnresolvableCollision { entity: String, name: String },

    #[error("Entity {name} declared twice in namespace {namespace}")]
    DuplicateEntity { name: String, namespace: String },

    #[error("Invalid graph definition: {0}")]
    InvalidDefinition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
