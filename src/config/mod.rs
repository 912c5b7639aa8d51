//! Configuration system for crdgen
//!
//! A single YAML file describes the CRDs to generate: names, versions, and
//! where each version's schema fragment lives.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{CrdConfig, GenConfig, PrinterColumn, VersionConfig};
