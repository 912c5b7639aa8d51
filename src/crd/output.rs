//! Manifest rendering

use anyhow::{Context, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

/// Render `crds` as one multi-document YAML stream
///
/// Each header line is written as a `# ` comment above the first document.
pub fn render_manifests(crds: &[CustomResourceDefinition], header: Option<&str>) -> Result<String> {
    let mut out = String::new();

    if let Some(header) = header {
        for line in header.lines() {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    for (i, crd) in crds.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        let yaml = serde_yaml::to_string(crd).with_context(|| {
            format!(
                "Failed to serialize CRD {}",
                crd.metadata.name.as_deref().unwrap_or_default()
            )
        })?;
        out.push_str(&yaml);
    }

    Ok(out)
}
