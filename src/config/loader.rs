//! Configuration loading and validation
//!
//! Handles reading the generator configuration, resolving the files it
//! references, and applying overrides according to precedence rules.

use super::{
    paths,
    schema::{CrdConfig, GenConfig},
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path` with overrides applied
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Configuration file
    ///
    /// Relative schema and output paths are resolved against the directory
    /// holding the configuration file.
    pub fn load(path: &Path) -> Result<GenConfig> {
        let config = Self::load_file(path)?;
        let config = Self::resolve_paths(config, &paths::base_dir(path));
        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<GenConfig> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: GenConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(
            "Loaded {} CRD definition(s) from {}",
            config.crds.len(),
            path.display()
        );

        Ok(config)
    }

    /// Validate configuration
    ///
    /// This performs strict validation - it will fail on:
    /// - An empty CRD list
    /// - Missing group, kind or plural
    /// - A scope other than `Namespaced` or `Cluster`
    /// - No versions, duplicate version names, or not exactly one storage version
    pub fn validate(config: &GenConfig) -> Result<()> {
        if config.crds.is_empty() {
            return Err(anyhow::anyhow!("Configuration must list at least one CRD"));
        }

        let mut seen_names = HashSet::new();
        for crd in &config.crds {
            let name = crd.crd_name();
            Self::validate_crd(crd).with_context(|| format!("Invalid CRD {}", name))?;
            if !seen_names.insert(name.clone()) {
                return Err(anyhow::anyhow!("Duplicate CRD {}", name));
            }
        }

        Ok(())
    }

    fn validate_crd(crd: &CrdConfig) -> Result<()> {
        for (field, value) in [
            ("group", &crd.group),
            ("kind", &crd.kind),
            ("plural", &crd.plural),
        ] {
            if value.is_empty() {
                return Err(anyhow::anyhow!("{} cannot be empty", field));
            }
        }

        if crd.scope != "Namespaced" && crd.scope != "Cluster" {
            return Err(anyhow::anyhow!(
                "scope must be 'Namespaced' or 'Cluster', got '{}'",
                crd.scope
            ));
        }

        if crd.versions.is_empty() {
            return Err(anyhow::anyhow!("at least one version is required"));
        }

        let mut seen_versions = HashSet::new();
        for version in &crd.versions {
            if version.name.is_empty() {
                return Err(anyhow::anyhow!("version name cannot be empty"));
            }
            if !seen_versions.insert(version.name.as_str()) {
                return Err(anyhow::anyhow!("duplicate version '{}'", version.name));
            }
        }

        let storage = crd.versions.iter().filter(|v| v.storage).count();
        if storage != 1 {
            return Err(anyhow::anyhow!(
                "exactly one version must be marked as storage, found {}",
                storage
            ));
        }

        Ok(())
    }

    /// Make every referenced file path relative to `base`
    fn resolve_paths(mut config: GenConfig, base: &Path) -> GenConfig {
        config.output = config.output.map(|output| paths::resolve(base, &output));

        for crd in config.crds.iter_mut() {
            if let Some(status) = crd.status_schema.as_mut() {
                status.file = paths::resolve(base, &status.file);
            }
            for version in crd.versions.iter_mut() {
                version.schema.file = paths::resolve(base, &version.schema.file);
            }
        }

        config
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: GenConfig) -> GenConfig {
        // CRDGEN_OUTPUT override
        if let Ok(output) = std::env::var("CRDGEN_OUTPUT") {
            if !output.is_empty() {
                config.output = Some(output.into());
            }
        }

        config
    }
}
