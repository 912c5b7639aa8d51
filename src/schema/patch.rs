//! Default untyped schema nodes to permissive objects
//!
//! Generators map "any value" fields (e.g. `google.protobuf.Value`) to a
//! schema without a `type`. The API server rejects those as non-structural,
//! so such nodes become `type: object` with
//! `x-kubernetes-preserve-unknown-fields: true`.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray, JSONSchemaPropsOrBool,
};

/// Walk `schema` and give every untyped node the object type
///
/// Descends through `properties`, `items` and `additionalProperties`.
/// Junctors (`allOf`, `anyOf`, `oneOf`, `not`) are left alone since types
/// are forbidden there.
pub fn patch_empty_types(schema: &mut JSONSchemaProps) {
    let untyped = schema.type_.as_deref().is_none_or(str::is_empty);
    if untyped && schema.x_kubernetes_int_or_string != Some(true) {
        schema.type_ = Some("object".to_string());
        schema.x_kubernetes_preserve_unknown_fields = Some(true);
    }

    if let Some(properties) = schema.properties.as_mut() {
        for property in properties.values_mut() {
            patch_empty_types(property);
        }
    }

    match schema.items.as_mut() {
        Some(JSONSchemaPropsOrArray::Schema(items)) => patch_empty_types(items),
        Some(JSONSchemaPropsOrArray::Schemas(items)) => {
            items.iter_mut().for_each(patch_empty_types);
        }
        None => {}
    }

    if let Some(JSONSchemaPropsOrBool::Schema(additional)) = schema.additional_properties.as_mut() {
        patch_empty_types(additional);
    }
}
