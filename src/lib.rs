//! Metamodel API Schema Generator
//!
//! Derives machine-readable API artifacts from a declarative entity
//! metamodel: per-resource JSON Schema documents (read and insert variants),
//! OpenAPI 3.0.0 documents for resource and descriptor endpoints, and the
//! logical-to-physical property path index the API layer uses to translate
//! queries.
//!
//! ## Pipeline
//!
//! ```text
//! MetamodelGraph
//!   ├── overlay   — subclass/extension effective property lists
//!   ├── mapping   — data-shape classification and JSON field naming
//!   ├── resolve   — identity flattening, merges, collected properties
//!   ├── schema    — JSON Schema assembly + json path index
//!   ├── openapi   — OpenAPI document generation
//!   └── pipeline  — artifact bundle with SHA-256 fingerprint
//! ```
//!
//! Entities are processed in dependency order (referenced entities before
//! referencers); every stage is deterministic, so repeated runs over the
//! same graph produce byte-identical artifacts.

pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod naming;
pub mod openapi;
pub mod overlay;
pub mod paths;
pub mod pipeline;
pub mod resolve;
pub mod schema;

pub use config::GeneratorConfig;
pub use error::{ArtifactError, Result};
pub use model::{GraphBuilder, MetamodelGraph};
pub use pipeline::{generate, ApiArtifacts, ArtifactSet};
pub use schema::{SchemaDocument, SchemaVariant};
