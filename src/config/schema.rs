//! Configuration schema definitions
//!
//! Defines the structure of the generator configuration file using serde.

use crate::schema::SchemaRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenConfig {
    /// Output file for the rendered manifests (stdout when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Comment header written above the manifests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    /// CRDs to generate, in output order
    #[serde(default)]
    pub crds: Vec<CrdConfig>,
}

/// One CustomResourceDefinition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrdConfig {
    /// CRD object name, `<plural>.<group>` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub group: String,

    pub kind: String,

    pub plural: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,

    /// Defaults to `<kind>List`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_kind: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// `Namespaced` or `Cluster`
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Schema of the `status` field for versions with a status subresource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_schema: Option<SchemaRef>,

    pub versions: Vec<VersionConfig>,
}

/// One served version of a CRD
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionConfig {
    pub name: String,

    #[serde(default = "default_true")]
    pub served: bool,

    #[serde(default = "default_false")]
    pub storage: bool,

    #[serde(default = "default_false")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_warning: Option<String>,

    /// Enable the `status` subresource
    #[serde(default = "default_true")]
    pub status_subresource: bool,

    /// Schema of the `spec` field
    pub schema: SchemaRef,

    /// Field paths (relative to `spec`) that keep unknown fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preserve_unknown_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub printer_columns: Vec<PrinterColumn>,
}

/// `additionalPrinterColumns` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrinterColumn {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub json_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl CrdConfig {
    /// Name of the CRD object
    pub fn crd_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.plural, self.group))
    }
}

// Default value functions
fn default_scope() -> String {
    "Namespaced".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}
