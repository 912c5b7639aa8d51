//! JSON-Schema handling for CRD validation blocks
//!
//! Loading OpenAPI fragments, patching them into a shape the API server
//! accepts, and checking the structural-schema rules.

pub mod openapi;
pub mod patch;
pub mod preserve;
pub mod structural;

pub use openapi::{SchemaLoader, SchemaRef};
pub use patch::patch_empty_types;
pub use preserve::mark_preserve_unknown_fields;
pub use structural::{FieldError, FieldErrorKind, StructuralErrors, validate_structural};

use std::path::PathBuf;

/// Errors raised while loading or decoding schema fragments
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON schema file {}: {source}", path.display())]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse YAML schema file {}: {source}", path.display())]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Schema component '{component}' not found in {}", path.display())]
    MissingComponent { path: PathBuf, component: String },

    #[error("Unresolvable $ref '{reference}' in {}", path.display())]
    DanglingRef { path: PathBuf, reference: String },

    #[error("Cyclic $ref '{reference}' in {}", path.display())]
    CyclicRef { path: PathBuf, reference: String },

    #[error("Cannot decode schema from {} into JSONSchemaProps: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
