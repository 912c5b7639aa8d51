//! CLI command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::config::{ConfigLoader, GenConfig, paths};
use crate::crd::{render_manifests, verify_manifests};
use crate::generator::Generator;

/// Main commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate CRD manifests from the configuration
    Generate {
        /// Configuration file (defaults to ./crdgen.yaml or $CRDGEN_CONFIG)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Output file, overriding the configuration (stdout when unset)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Run the full pipeline without writing any output
    Check {
        /// Configuration file (defaults to ./crdgen.yaml or $CRDGEN_CONFIG)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
    /// Check that existing CRD manifests have structural schemas
    Validate {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show version information
    Version,
}

/// Handle a subcommand
pub fn handle_command(cmd: Command) -> Result<()> {
    match cmd {
        Command::Generate { config, output } => {
            let config = load_config(config.as_deref())?;
            let crds = Generator::new().run(&config)?;
            let manifests = render_manifests(&crds, config.header.as_deref())?;

            match output.or(config.output) {
                Some(path) => {
                    write_output(&path, &manifests)?;
                    tracing::info!("Wrote {} CRD(s) to {}", crds.len(), path.display());
                }
                None => print!("{}", manifests),
            }
        }
        Command::Check { config } => {
            let config = load_config(config.as_deref())?;
            let crds = Generator::new().run(&config)?;
            for crd in &crds {
                println!("✓ {}", crd.metadata.name.as_deref().unwrap_or_default());
            }
        }
        Command::Validate { files } => {
            let mut failures = 0;
            for file in &files {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read manifest file: {}", file.display()))?;
                let reports = verify_manifests(&content)
                    .with_context(|| format!("Failed to check {}", file.display()))?;

                if reports.is_empty() {
                    tracing::warn!("No CustomResourceDefinition found in {}", file.display());
                }
                for report in reports {
                    match &report.result {
                        Ok(()) => println!("✓ {} {}", report.crd, report.version),
                        Err(e) => {
                            failures += 1;
                            eprintln!("✗ {}", e);
                        }
                    }
                }
            }

            if failures > 0 {
                return Err(anyhow::anyhow!(
                    "{} CRD version(s) failed structural validation",
                    failures
                ));
            }
        }
        Command::Version => super::display_version(),
    }

    Ok(())
}

/// Load and validate the configuration at `path` (or the default location)
fn load_config(path: Option<&Path>) -> Result<GenConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::default_config_path);

    let config = ConfigLoader::load(&path).context("Failed to load configuration")?;
    ConfigLoader::validate(&config)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn write_output(path: &Path, manifests: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, manifests)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}
