//! CRD skeletons built from configuration
//!
//! A skeleton carries names, scope and versions; the validation blocks are
//! filled in later by [`complete_crd`](super::complete_crd).

use crate::config::schema::{CrdConfig, PrinterColumn, VersionConfig};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceColumnDefinition, CustomResourceDefinition, CustomResourceDefinitionNames,
    CustomResourceDefinitionSpec, CustomResourceDefinitionVersion, CustomResourceSubresourceStatus,
    CustomResourceSubresources,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Build the CRD skeleton described by `config`
pub fn build_skeleton(config: &CrdConfig) -> CustomResourceDefinition {
    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(config.crd_name()),
            labels: non_empty_map(&config.labels),
            annotations: non_empty_map(&config.annotations),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: config.group.clone(),
            names: CustomResourceDefinitionNames {
                kind: config.kind.clone(),
                plural: config.plural.clone(),
                singular: config.singular.clone(),
                list_kind: Some(
                    config
                        .list_kind
                        .clone()
                        .unwrap_or_else(|| format!("{}List", config.kind)),
                ),
                short_names: non_empty_vec(&config.short_names),
                categories: non_empty_vec(&config.categories),
            },
            scope: config.scope.clone(),
            versions: config.versions.iter().map(build_version).collect(),
            ..Default::default()
        },
        status: None,
    }
}

fn build_version(config: &VersionConfig) -> CustomResourceDefinitionVersion {
    let printer_columns: Vec<_> = config.printer_columns.iter().map(build_column).collect();

    CustomResourceDefinitionVersion {
        name: config.name.clone(),
        served: config.served,
        storage: config.storage,
        deprecated: config.deprecated.then_some(true),
        deprecation_warning: config.deprecation_warning.clone(),
        additional_printer_columns: (!printer_columns.is_empty()).then_some(printer_columns),
        subresources: config.status_subresource.then(|| CustomResourceSubresources {
            status: Some(CustomResourceSubresourceStatus(serde_json::json!({}))),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_column(column: &PrinterColumn) -> CustomResourceColumnDefinition {
    CustomResourceColumnDefinition {
        name: column.name.clone(),
        type_: column.type_.clone(),
        json_path: column.json_path.clone(),
        description: column.description.clone(),
        format: column.format.clone(),
        priority: column.priority,
    }
}

fn non_empty_map(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

fn non_empty_vec(items: &[String]) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.to_vec())
}
