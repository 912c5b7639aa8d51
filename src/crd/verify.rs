//! Structural checks for existing CRD manifests

use super::CrdError;
use crate::schema::validate_structural;
use anyhow::{Context, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::Deserialize;

/// Outcome of checking one version of one CRD
#[derive(Debug)]
pub struct VersionReport {
    pub crd: String,
    pub version: String,
    pub result: Result<(), CrdError>,
}

impl VersionReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Check every CRD version schema in a multi-document YAML stream
///
/// Documents of other kinds are skipped.
pub fn verify_manifests(yaml: &str) -> Result<Vec<VersionReport>> {
    let mut reports = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(yaml).enumerate() {
        let value = serde_json::Value::deserialize(document)
            .with_context(|| format!("Failed to parse YAML document {}", index))?;

        if value.get("kind").and_then(|k| k.as_str()) != Some("CustomResourceDefinition") {
            tracing::debug!("Skipping document {}: not a CustomResourceDefinition", index);
            continue;
        }

        let crd: CustomResourceDefinition = serde_json::from_value(value).with_context(|| {
            format!("Failed to decode CustomResourceDefinition in document {}", index)
        })?;
        reports.extend(verify_crd(&crd));
    }

    Ok(reports)
}

/// Check every version schema of `crd`
pub fn verify_crd(crd: &CustomResourceDefinition) -> Vec<VersionReport> {
    let name = crd.metadata.name.clone().unwrap_or_default();

    crd.spec
        .versions
        .iter()
        .map(|version| {
            let schema = version
                .schema
                .as_ref()
                .and_then(|validation| validation.open_api_v3_schema.as_ref());

            let result = match schema {
                Some(schema) => {
                    validate_structural(schema).map_err(|errors| CrdError::NotStructural {
                        crd: name.clone(),
                        version: version.name.clone(),
                        errors,
                    })
                }
                None => Err(CrdError::MissingSchema {
                    crd: name.clone(),
                    version: version.name.clone(),
                }),
            };

            VersionReport {
                crd: name.clone(),
                version: version.name.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFESTS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: unrelated
---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.io
spec:
  group: example.io
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced
  versions:
  - name: v1
    served: true
    storage: true
    schema:
      openAPIV3Schema:
        type: object
        properties:
          spec:
            type: object
            properties:
              tags:
                type: array
  - name: v2
    served: true
    storage: false
"#;

    #[test]
    fn test_reports_per_version() {
        let reports = verify_manifests(MANIFESTS).unwrap();
        assert_eq!(reports.len(), 2);

        assert_eq!(reports[0].crd, "widgets.example.io");
        assert!(matches!(
            reports[0].result,
            Err(CrdError::NotStructural { .. })
        ));
        assert!(matches!(
            reports[1].result,
            Err(CrdError::MissingSchema { .. })
        ));
    }

    #[test]
    fn test_no_crds() {
        let reports = verify_manifests("apiVersion: v1\nkind: Namespace\n").unwrap();
        assert!(reports.is_empty());
    }
}
