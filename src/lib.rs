//! crdgen Library
//!
//! This library provides the core functionality for the crdgen binary.
//! It can be used both as a binary and as a library for testing.

pub mod cli;
pub mod config;
pub mod crd;
pub mod generator;
pub mod schema;

// Re-export commonly used types for convenience
pub use crd::{CrdError, PreserveUnknownFields, VersionSchemas, complete_crd};
pub use generator::Generator;
pub use schema::{SchemaLoader, SchemaRef, validate_structural};
