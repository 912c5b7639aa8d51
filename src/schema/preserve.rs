//! Mark selected fields with `x-kubernetes-preserve-unknown-fields`

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray,
};

/// Set `x-kubernetes-preserve-unknown-fields: true` on the node at `path`
///
/// `path` is dot separated and relative to `schema` (`values`,
/// `components.ingressGateways`). A leading `.` is ignored, and a leading
/// `spec` segment is skipped when `schema` has no `spec` property itself.
/// Array schemas are transparent: if a segment is not a property of the
/// current node the walk continues into its `items` schema.
///
/// Returns `false` when the path does not exist; the schema is then left
/// untouched.
pub fn mark_preserve_unknown_fields(schema: &mut JSONSchemaProps, path: &str) -> bool {
    let mut segments: Vec<&str> = path
        .trim_start_matches('.')
        .split('.')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.first() == Some(&"spec") && !has_property(schema, "spec") {
        segments.remove(0);
    }

    if segments.is_empty() {
        return false;
    }

    match find_node(schema, &segments) {
        Some(node) => {
            node.x_kubernetes_preserve_unknown_fields = Some(true);
            tracing::debug!("Marked '{}' with x-kubernetes-preserve-unknown-fields", path);
            true
        }
        None => false,
    }
}

fn has_property(schema: &JSONSchemaProps, name: &str) -> bool {
    schema
        .properties
        .as_ref()
        .is_some_and(|props| props.contains_key(name))
}

fn find_node<'a>(
    schema: &'a mut JSONSchemaProps,
    segments: &[&str],
) -> Option<&'a mut JSONSchemaProps> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(schema);
    };

    if has_property(schema, head) {
        let child = schema.properties.as_mut()?.get_mut(*head)?;
        return find_node(child, rest);
    }

    match schema.items.as_mut() {
        Some(JSONSchemaPropsOrArray::Schema(items)) => find_node(items, segments),
        _ => None,
    }
}
