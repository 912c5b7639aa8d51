//! Structural schema validation
//!
//! The API server only accepts CRD schemas that are *structural*: every
//! field has a statically known type, and value validations (`allOf`,
//! `anyOf`, `oneOf`, `not`) only constrain fields that the structural part
//! already declares. This module checks those rules on a
//! `JSONSchemaProps` tree and reports every violation it finds, using
//! the same field paths and wording as the Kubernetes field errors.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray, JSONSchemaPropsOrBool,
};
use std::fmt;

/// Kind of a single validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Forbidden,
    /// Carries the offending value
    Invalid(String),
    NotSupported,
}

/// A single validation failure at a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub kind: FieldErrorKind,
    pub detail: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldErrorKind::Required => write!(f, "{}: Required value: {}", self.path, self.detail),
            FieldErrorKind::Forbidden => write!(f, "{}: Forbidden: {}", self.path, self.detail),
            FieldErrorKind::Invalid(value) => {
                write!(f, "{}: Invalid value: {:?}: {}", self.path, value, self.detail)
            }
            FieldErrorKind::NotSupported => {
                write!(f, "{}: Unsupported value: {}", self.path, self.detail)
            }
        }
    }
}

/// All violations found in one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralErrors(pub Vec<FieldError>);

impl StructuralErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StructuralErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return write!(f, "{}", single);
        }
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", joined)
    }
}

impl std::error::Error for StructuralErrors {}

/// Check that `schema` (an `openAPIV3Schema`) is structural
pub fn validate_structural(schema: &JSONSchemaProps) -> Result<(), StructuralErrors> {
    let mut validator = Validator::default();
    validator.structural(schema, Level::Root, &FieldPath::root());

    if validator.errors.is_empty() {
        Ok(())
    } else {
        Err(StructuralErrors(validator.errors))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Item,
    Field,
}

/// Field path in Kubernetes notation: `openAPIV3Schema.properties[spec].type`
#[derive(Debug, Clone)]
struct FieldPath(String);

impl FieldPath {
    fn root() -> Self {
        Self("openAPIV3Schema".to_string())
    }

    fn child(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }

    fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

fn type_of(s: &JSONSchemaProps) -> &str {
    s.type_.as_deref().unwrap_or("")
}

fn is_set(flag: Option<bool>) -> bool {
    flag == Some(true)
}

fn typed(ty: &str) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(ty.to_string()),
        ..Default::default()
    }
}

/// `anyOf: [{type: integer}, {type: string}]`, the one junctor allowed to carry types
fn is_int_or_string_any_of(any_of: Option<&Vec<JSONSchemaProps>>) -> bool {
    any_of.is_some_and(|branches| branches.as_slice() == [typed("integer"), typed("string")])
}

impl Validator {
    fn push(&mut self, path: FieldPath, kind: FieldErrorKind, detail: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.0,
            kind,
            detail: detail.into(),
        });
    }

    fn required(&mut self, path: FieldPath, detail: impl Into<String>) {
        self.push(path, FieldErrorKind::Required, detail);
    }

    fn forbidden(&mut self, path: FieldPath, detail: impl Into<String>) {
        self.push(path, FieldErrorKind::Forbidden, detail);
    }

    fn invalid(&mut self, path: FieldPath, value: &str, detail: impl Into<String>) {
        self.push(path, FieldErrorKind::Invalid(value.to_string()), detail);
    }

    /// Validate a node in a structural position (root, property, items, additionalProperties)
    fn structural(&mut self, s: &JSONSchemaProps, lvl: Level, path: &FieldPath) {
        self.unsupported_keywords(s, path);

        let ty = type_of(s);
        let int_or_string = is_set(s.x_kubernetes_int_or_string);
        let preserve = is_set(s.x_kubernetes_preserve_unknown_fields);
        let embedded = is_set(s.x_kubernetes_embedded_resource);

        match &s.items {
            Some(JSONSchemaPropsOrArray::Schema(items)) => {
                self.structural(items, Level::Item, &path.child("items"));
            }
            Some(JSONSchemaPropsOrArray::Schemas(_)) => {
                self.forbidden(
                    path.child("items"),
                    "items must be a schema object and not an array",
                );
            }
            None if ty == "array" => self.required(path.child("items"), "must be specified"),
            None => {}
        }

        if let Some(properties) = &s.properties {
            let props_path = path.child("properties");
            for (name, property) in properties {
                self.structural(property, Level::Field, &props_path.key(name));
            }
        }

        self.additional_properties(s, lvl, path);
        self.extensions(s, path);

        if embedded && ty != "object" {
            let detail = "must be object if x-kubernetes-embedded-resource is true";
            if ty.is_empty() {
                self.required(path.child("type"), detail);
            } else {
                self.invalid(path.child("type"), ty, detail);
            }
        } else if ty.is_empty() && !int_or_string && !preserve {
            let detail = match lvl {
                Level::Root => "must not be empty at the root",
                Level::Item => "must not be empty for specified array items",
                Level::Field => "must not be empty for specified object fields",
            };
            self.required(path.child("type"), detail);
        }

        if lvl == Level::Root && !ty.is_empty() && ty != "object" {
            self.invalid(path.child("type"), ty, "must be object at the root");
        }

        if embedded && s.additional_properties.is_some() {
            self.forbidden(
                path.child("additionalProperties"),
                "must not be used if x-kubernetes-embedded-resource is set",
            );
        }

        if lvl == Level::Root || embedded {
            self.object_meta(s, path);
        }

        if embedded && !preserve && s.properties.as_ref().is_none_or(|p| p.is_empty()) {
            self.required(
                path.child("properties"),
                "must not be empty if x-kubernetes-embedded-resource is true without x-kubernetes-preserve-unknown-fields",
            );
        }

        let skip_any_of = int_or_string && is_int_or_string_any_of(s.any_of.as_ref());
        let skip_first_all_of_any_of = int_or_string
            && s
                .all_of
                .as_ref()
                .and_then(|all_of| all_of.first())
                .is_some_and(|first| is_int_or_string_any_of(first.any_of.as_ref()));
        self.value_validation(s, skip_any_of, skip_first_all_of_any_of, path);
        self.junctor_completeness(s, s, path, path);
    }

    fn additional_properties(&mut self, s: &JSONSchemaProps, lvl: Level, path: &FieldPath) {
        let Some(additional) = &s.additional_properties else {
            return;
        };
        let ap_path = path.child("additionalProperties");

        if lvl == Level::Root {
            self.forbidden(ap_path.clone(), "must not be used at the root");
        }
        if s.properties.as_ref().is_some_and(|p| !p.is_empty()) {
            self.forbidden(
                ap_path.clone(),
                "additionalProperties and properties are mutual exclusive",
            );
        }

        match additional {
            JSONSchemaPropsOrBool::Bool(false) => {
                self.forbidden(ap_path, "additionalProperties cannot be set to false");
            }
            JSONSchemaPropsOrBool::Bool(true) => {}
            JSONSchemaPropsOrBool::Schema(schema) => {
                self.structural(schema, Level::Field, &ap_path);
            }
        }
    }

    fn extensions(&mut self, s: &JSONSchemaProps, path: &FieldPath) {
        let preserve_path = path.child("x-kubernetes-preserve-unknown-fields");
        if s.x_kubernetes_preserve_unknown_fields == Some(false) {
            self.invalid(preserve_path.clone(), "false", "must be true or undefined");
        }

        if is_set(s.x_kubernetes_int_or_string) {
            if is_set(s.x_kubernetes_preserve_unknown_fields) {
                self.invalid(
                    preserve_path,
                    "true",
                    "must be false if x-kubernetes-int-or-string is true",
                );
            }
            let ty = type_of(s);
            if !ty.is_empty() {
                self.invalid(
                    path.child("type"),
                    ty,
                    "must be empty if x-kubernetes-int-or-string is true",
                );
            }
        }
    }

    /// `kind`, `apiVersion` and `metadata` at the root or in an embedded resource
    fn object_meta(&mut self, s: &JSONSchemaProps, path: &FieldPath) {
        let Some(properties) = &s.properties else {
            return;
        };
        let props_path = path.child("properties");

        for field in ["kind", "apiVersion"] {
            if let Some(prop) = properties.get(field) {
                let ty = type_of(prop);
                if !ty.is_empty() && ty != "string" {
                    self.invalid(props_path.key(field).child("type"), ty, "must be string");
                }
            }
        }

        let Some(metadata) = properties.get("metadata") else {
            return;
        };
        let meta_path = props_path.key("metadata");
        let ty = type_of(metadata);
        if ty != "object" {
            self.invalid(meta_path.child("type"), ty, "must be object");
        }

        if let Some(meta_props) = &metadata.properties {
            for (name, prop) in meta_props {
                let prop_path = meta_path.child("properties").key(name);
                if name != "name" && name != "generateName" {
                    self.forbidden(
                        prop_path,
                        "must not be specified, only metadata.name and metadata.generateName can be restricted",
                    );
                    continue;
                }
                let prop_ty = type_of(prop);
                if prop_ty != "string" {
                    self.invalid(prop_path.child("type"), prop_ty, "must be string");
                }
            }
        }

        if metadata.additional_properties.is_some() {
            self.forbidden(meta_path.child("additionalProperties"), "must not be specified");
        }
    }

    fn unsupported_keywords(&mut self, s: &JSONSchemaProps, path: &FieldPath) {
        let present = [
            ("$ref", s.ref_path.is_some()),
            ("$schema", s.schema.is_some()),
            ("id", s.id.is_some()),
            ("definitions", s.definitions.is_some()),
            ("dependencies", s.dependencies.is_some()),
            ("patternProperties", s.pattern_properties.is_some()),
            ("additionalItems", s.additional_items.is_some()),
        ];
        for (keyword, set) in present {
            if set {
                self.push(
                    path.child(keyword),
                    FieldErrorKind::NotSupported,
                    format!("{} is not supported in CRD schemas", keyword),
                );
            }
        }

        if is_set(s.unique_items) {
            self.forbidden(
                path.child("uniqueItems"),
                "uniqueItems cannot be set to true since the runtime complexity becomes quadratic",
            );
        }
    }

    /// Validate the junctors of `v` and their nested value validations
    fn value_validation(
        &mut self,
        v: &JSONSchemaProps,
        skip_any_of: bool,
        skip_first_all_of_any_of: bool,
        path: &FieldPath,
    ) {
        if let Some(all_of) = &v.all_of {
            let all_of_path = path.child("allOf");
            for (i, branch) in all_of.iter().enumerate() {
                let skip = skip_first_all_of_any_of && i == 0;
                self.nested(branch, skip, &all_of_path.index(i));
            }
        }

        if let Some(any_of) = &v.any_of {
            if !skip_any_of {
                let any_of_path = path.child("anyOf");
                for (i, branch) in any_of.iter().enumerate() {
                    self.nested(branch, false, &any_of_path.index(i));
                }
            }
        }

        if let Some(one_of) = &v.one_of {
            let one_of_path = path.child("oneOf");
            for (i, branch) in one_of.iter().enumerate() {
                self.nested(branch, false, &one_of_path.index(i));
            }
        }

        if let Some(not) = &v.not {
            self.nested(not, false, &path.child("not"));
        }
    }

    /// A schema inside a junctor: only value validations are allowed
    fn nested(&mut self, v: &JSONSchemaProps, skip_any_of: bool, path: &FieldPath) {
        self.unsupported_keywords(v, path);
        self.value_validation(v, skip_any_of, false, path);

        match &v.items {
            Some(JSONSchemaPropsOrArray::Schema(items)) => {
                self.nested(items, false, &path.child("items"));
            }
            Some(JSONSchemaPropsOrArray::Schemas(_)) => {
                self.forbidden(
                    path.child("items"),
                    "items must be a schema object and not an array",
                );
            }
            None => {}
        }
        if let Some(properties) = &v.properties {
            let props_path = path.child("properties");
            for (name, property) in properties {
                self.nested(property, false, &props_path.key(name));
            }
        }

        if !type_of(v).is_empty() {
            self.forbidden(path.child("type"), "must be empty to be structural");
        }
        if v.additional_properties.is_some() {
            self.forbidden(
                path.child("additionalProperties"),
                "must be undefined to be structural",
            );
        }
        if v.default.is_some() {
            self.forbidden(path.child("default"), "must be undefined to be structural");
        }
        if v.title.as_deref().is_some_and(|t| !t.is_empty()) {
            self.forbidden(path.child("title"), "must be empty to be structural");
        }
        if v.description.as_deref().is_some_and(|d| !d.is_empty()) {
            self.forbidden(path.child("description"), "must be empty to be structural");
        }
        if is_set(v.nullable) {
            self.forbidden(path.child("nullable"), "must be false to be structural");
        }
        if is_set(v.x_kubernetes_preserve_unknown_fields) {
            self.forbidden(
                path.child("x-kubernetes-preserve-unknown-fields"),
                "must be false to be structural",
            );
        }
        if is_set(v.x_kubernetes_embedded_resource) {
            self.forbidden(
                path.child("x-kubernetes-embedded-resource"),
                "must be false to be structural",
            );
        }
        if is_set(v.x_kubernetes_int_or_string) {
            self.forbidden(
                path.child("x-kubernetes-int-or-string"),
                "must be false to be structural",
            );
        }
        if v.x_kubernetes_list_map_keys.as_ref().is_some_and(|k| !k.is_empty()) {
            self.forbidden(
                path.child("x-kubernetes-list-map-keys"),
                "must be empty to be structural",
            );
        }
        if v.x_kubernetes_list_type.is_some() {
            self.forbidden(
                path.child("x-kubernetes-list-type"),
                "must be undefined to be structural",
            );
        }
        if v.x_kubernetes_map_type.is_some() {
            self.forbidden(
                path.child("x-kubernetes-map-type"),
                "must be undefined to be structural",
            );
        }
        if v.x_kubernetes_validations.as_ref().is_some_and(|r| !r.is_empty()) {
            self.forbidden(
                path.child("x-kubernetes-validations"),
                "must be empty to be structural",
            );
        }
    }

    /// Everything a junctor of `v` mentions must exist in the structural node `s`
    fn junctor_completeness(
        &mut self,
        v: &JSONSchemaProps,
        s: &JSONSchemaProps,
        s_path: &FieldPath,
        v_path: &FieldPath,
    ) {
        let junctors = [
            ("allOf", v.all_of.as_deref()),
            ("anyOf", v.any_of.as_deref()),
            ("oneOf", v.one_of.as_deref()),
        ];
        for (name, branches) in junctors {
            for (i, branch) in branches.unwrap_or_default().iter().enumerate() {
                self.nested_completeness(branch, Some(s), s_path, &v_path.child(name).index(i));
            }
        }
        if let Some(not) = &v.not {
            self.nested_completeness(not, Some(s), s_path, &v_path.child("not"));
        }
    }

    fn nested_completeness(
        &mut self,
        v: &JSONSchemaProps,
        s: Option<&JSONSchemaProps>,
        s_path: &FieldPath,
        v_path: &FieldPath,
    ) {
        let Some(s) = s else {
            self.required(s_path.clone(), format!("because it is defined in {}", v_path));
            return;
        };

        self.junctor_completeness(v, s, s_path, v_path);

        if let Some(JSONSchemaPropsOrArray::Schema(v_items)) = &v.items {
            let s_items = match &s.items {
                Some(JSONSchemaPropsOrArray::Schema(items)) => Some(items.as_ref()),
                _ => None,
            };
            self.nested_completeness(
                v_items,
                s_items,
                &s_path.child("items"),
                &v_path.child("items"),
            );
        }

        let Some(v_props) = &v.properties else {
            return;
        };
        for (name, v_prop) in v_props {
            let v_prop_path = v_path.child("properties").key(name);
            if let Some(s_prop) = s.properties.as_ref().and_then(|p| p.get(name)) {
                self.nested_completeness(
                    v_prop,
                    Some(s_prop),
                    &s_path.child("properties").key(name),
                    &v_prop_path,
                );
            } else if let Some(JSONSchemaPropsOrBool::Schema(additional)) =
                &s.additional_properties
            {
                self.nested_completeness(
                    v_prop,
                    Some(additional.as_ref()),
                    &s_path.child("additionalProperties"),
                    &v_prop_path,
                );
            } else {
                self.required(
                    s_path.child("properties").key(name),
                    format!("because it is defined in {}", v_prop_path),
                );
            }
        }
    }
}
