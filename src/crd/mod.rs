//! CRD completion
//!
//! Fills the validation block of every version of a CRD skeleton from
//! generated schema fragments and checks the result is structural.

pub mod output;
pub mod skeleton;
pub mod verify;

pub use output::render_manifests;
pub use skeleton::build_skeleton;
pub use verify::{VersionReport, verify_crd, verify_manifests};

use crate::schema::{
    StructuralErrors, mark_preserve_unknown_fields, patch_empty_types, validate_structural,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceValidation, JSONSchemaProps,
};
use std::collections::{BTreeMap, HashMap};

/// Spec schema for each version, keyed by version name
pub type VersionSchemas = HashMap<String, JSONSchemaProps>;

/// Field paths to mark with `x-kubernetes-preserve-unknown-fields`, keyed by version name
pub type PreserveUnknownFields = HashMap<String, Vec<String>>;

/// Errors raised while completing a CRD
#[derive(Debug, thiserror::Error)]
pub enum CrdError {
    #[error("No OpenAPI schema for version {version} of {crd}")]
    MissingSchema { crd: String, version: String },

    #[error("Cannot convert OpenAPI schema to JSONSchemaProps for {crd}: {source}")]
    Decode {
        crd: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema for version {version} of {crd} is not structural: {errors}")]
    NotStructural {
        crd: String,
        version: String,
        errors: StructuralErrors,
    },
}

/// Complete `crd` in place
///
/// For every version the matching entry of `version_schemas` becomes the
/// `spec` property of the version's `openAPIV3Schema`. Configured paths are
/// marked to preserve unknown fields, untyped nodes are defaulted to
/// objects, and versions with subresources get a `status` property
/// (`status_schema`, or a permissive object). Processing stops at the first
/// version that fails.
///
/// The CRD's `status` and `metadata.creationTimestamp` are cleared so the
/// rendered manifest only carries generated content.
pub fn complete_crd(
    crd: &mut CustomResourceDefinition,
    version_schemas: &VersionSchemas,
    status_schema: Option<&JSONSchemaProps>,
    preserve_unknown_fields: &PreserveUnknownFields,
) -> Result<(), CrdError> {
    let name = crd.metadata.name.clone().unwrap_or_default();

    for version in crd.spec.versions.iter_mut() {
        let source = version_schemas
            .get(&version.name)
            .ok_or_else(|| CrdError::MissingSchema {
                crd: name.clone(),
                version: version.name.clone(),
            })?;
        let mut spec = reencode(source, &name)?;

        if let Some(paths) = preserve_unknown_fields.get(&version.name) {
            for path in paths {
                if !mark_preserve_unknown_fields(&mut spec, path) {
                    tracing::warn!(
                        "Field path '{}' not found in {} version {}",
                        path,
                        name,
                        version.name
                    );
                }
            }
        }

        patch_empty_types(&mut spec);

        let mut properties = BTreeMap::from([("spec".to_string(), spec)]);

        if version.subresources.is_some() {
            let status = match status_schema {
                Some(schema) => reencode(schema, &name)?,
                None => JSONSchemaProps {
                    type_: Some("object".to_string()),
                    x_kubernetes_preserve_unknown_fields: Some(true),
                    ..Default::default()
                },
            };
            properties.insert("status".to_string(), status);
        }

        let root = JSONSchemaProps {
            type_: Some("object".to_string()),
            properties: Some(properties),
            ..Default::default()
        };

        tracing::info!("Checking if the schema is structural for {}", name);
        validate_structural(&root).map_err(|errors| CrdError::NotStructural {
            crd: name.clone(),
            version: version.name.clone(),
            errors,
        })?;

        version.schema = Some(CustomResourceValidation {
            open_api_v3_schema: Some(root),
        });
    }

    crd.metadata.creation_timestamp = None;
    crd.status = None;

    Ok(())
}

/// Round-trip a schema through JSON so the result shares nothing with the input
fn reencode(schema: &JSONSchemaProps, crd: &str) -> Result<JSONSchemaProps, CrdError> {
    serde_json::to_value(schema)
        .and_then(serde_json::from_value)
        .map_err(|source| CrdError::Decode {
            crd: crd.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
        CustomResourceDefinitionSpec, CustomResourceDefinitionVersion,
        CustomResourceSubresourceStatus, CustomResourceSubresources,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    fn skeleton(subresources: bool) -> CustomResourceDefinition {
        CustomResourceDefinition {
            metadata: ObjectMeta {
                name: Some("widgets.example.io".to_string()),
                ..Default::default()
            },
            spec: CustomResourceDefinitionSpec {
                group: "example.io".to_string(),
                scope: "Namespaced".to_string(),
                versions: vec![CustomResourceDefinitionVersion {
                    name: "v1".to_string(),
                    served: true,
                    storage: true,
                    subresources: subresources.then(|| CustomResourceSubresources {
                        status: Some(CustomResourceSubresourceStatus(json!({}))),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            },
            status: None,
        }
    }

    fn schemas(value: serde_json::Value) -> VersionSchemas {
        HashMap::from([("v1".to_string(), serde_json::from_value(value).unwrap())])
    }

    fn root_of(crd: &CustomResourceDefinition) -> &JSONSchemaProps {
        crd.spec.versions[0]
            .schema
            .as_ref()
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .unwrap()
    }

    #[test]
    fn test_spec_wrapped_in_object_root() {
        let mut crd = skeleton(false);
        let input = schemas(json!({
            "type": "object",
            "properties": { "size": { "type": "integer" } }
        }));
        complete_crd(&mut crd, &input, None, &HashMap::new()).unwrap();

        let root = root_of(&crd);
        assert_eq!(root.type_.as_deref(), Some("object"));
        let props = root.properties.as_ref().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["spec"], input["v1"]);
    }

    #[test]
    fn test_missing_version_schema() {
        let mut crd = skeleton(false);
        let err = complete_crd(&mut crd, &HashMap::new(), None, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CrdError::MissingSchema { ref version, .. } if version == "v1"));
    }

    #[test]
    fn test_status_defaults_to_permissive_object() {
        let mut crd = skeleton(true);
        let input = schemas(json!({ "type": "object" }));
        complete_crd(&mut crd, &input, None, &HashMap::new()).unwrap();

        let status = &root_of(&crd).properties.as_ref().unwrap()["status"];
        assert_eq!(status.type_.as_deref(), Some("object"));
        assert_eq!(status.x_kubernetes_preserve_unknown_fields, Some(true));
    }

    #[test]
    fn test_not_structural_aborts() {
        let mut crd = skeleton(false);
        let input = schemas(json!({
            "type": "object",
            "properties": { "list": { "type": "array" } }
        }));
        let err = complete_crd(&mut crd, &input, None, &HashMap::new()).unwrap_err();
        match err {
            CrdError::NotStructural { crd: name, errors, .. } => {
                assert_eq!(name, "widgets.example.io");
                assert_eq!(
                    errors.0[0].path,
                    "openAPIV3Schema.properties[spec].properties[list].items"
                );
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(crd.spec.versions[0].schema.is_none());
    }
}
