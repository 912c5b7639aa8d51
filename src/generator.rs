//! CRD generation pipeline
//!
//! Builds a skeleton for every configured CRD, loads its schema fragments
//! and completes it. The first failure aborts the whole run.

use crate::config::{CrdConfig, GenConfig};
use crate::crd::{PreserveUnknownFields, VersionSchemas, build_skeleton, complete_crd};
use crate::schema::SchemaLoader;
use anyhow::{Context, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

/// Runs the generation pipeline, sharing parsed documents across CRDs
#[derive(Debug, Default)]
pub struct Generator {
    loader: SchemaLoader,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate every CRD in `config`, in configuration order
    pub fn run(&mut self, config: &GenConfig) -> Result<Vec<CustomResourceDefinition>> {
        let crds = config
            .crds
            .iter()
            .map(|crd| {
                self.generate(crd)
                    .with_context(|| format!("Failed to generate CRD {}", crd.crd_name()))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Generated {} CRD(s) from {} OpenAPI document(s)",
            crds.len(),
            self.loader.cached_documents()
        );

        Ok(crds)
    }

    /// Generate a single CRD
    pub fn generate(&mut self, config: &CrdConfig) -> Result<CustomResourceDefinition> {
        let mut crd = build_skeleton(config);

        let mut version_schemas = VersionSchemas::new();
        let mut preserve_unknown_fields = PreserveUnknownFields::new();
        for version in &config.versions {
            let schema = self.loader.load(&version.schema).with_context(|| {
                format!("Cannot load OpenAPI schema for version {}", version.name)
            })?;
            version_schemas.insert(version.name.clone(), schema);

            if !version.preserve_unknown_fields.is_empty() {
                preserve_unknown_fields
                    .insert(version.name.clone(), version.preserve_unknown_fields.clone());
            }
        }

        let status_schema = config
            .status_schema
            .as_ref()
            .map(|status| self.loader.load(status))
            .transpose()
            .context("Cannot load OpenAPI schema for the status field")?;

        complete_crd(
            &mut crd,
            &version_schemas,
            status_schema.as_ref(),
            &preserve_unknown_fields,
        )?;

        Ok(crd)
    }
}
