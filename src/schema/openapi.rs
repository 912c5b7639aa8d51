//! OpenAPI fragment loading
//!
//! Reads the documents produced by an OpenAPI encoder, picks a schema out
//! of `components.schemas`, inlines local `$ref`s (structural schemas
//! cannot contain references) and decodes the result into
//! `JSONSchemaProps`.

use super::{SchemaError, SchemaResult};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::JSONSchemaProps;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Location of a schema: a document on disk and an optional component name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRef {
    /// OpenAPI document (JSON or YAML)
    pub file: PathBuf,

    /// Name under `components.schemas`; the whole document when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl SchemaRef {
    pub fn new(file: impl Into<PathBuf>, component: Option<&str>) -> Self {
        Self {
            file: file.into(),
            component: component.map(str::to_string),
        }
    }
}

/// Loads schemas from OpenAPI documents, caching parsed documents by path
#[derive(Debug, Default)]
pub struct SchemaLoader {
    documents: HashMap<PathBuf, Value>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and decode the schema `schema_ref` points at
    pub fn load(&mut self, schema_ref: &SchemaRef) -> SchemaResult<JSONSchemaProps> {
        let value = self.load_value(schema_ref)?;
        serde_json::from_value(value).map_err(|source| SchemaError::Decode {
            path: schema_ref.file.clone(),
            source,
        })
    }

    /// Load the schema as raw JSON with every local `$ref` expanded
    pub fn load_value(&mut self, schema_ref: &SchemaRef) -> SchemaResult<Value> {
        let path = schema_ref.file.as_path();
        let document = self.document(path)?;

        let root = match &schema_ref.component {
            Some(name) => component(document, name).ok_or_else(|| SchemaError::MissingComponent {
                path: path.to_path_buf(),
                component: name.clone(),
            })?,
            None => document,
        };

        let mut stack = Vec::new();
        expand_refs(root, document, path, &mut stack)
    }

    /// Number of documents parsed so far
    pub fn cached_documents(&self) -> usize {
        self.documents.len()
    }

    fn document(&mut self, path: &Path) -> SchemaResult<&Value> {
        match self.documents.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => Ok(&*entry.insert(parse_document(path)?)),
        }
    }
}

fn parse_document(path: &Path) -> SchemaResult<Value> {
    tracing::debug!("Loading OpenAPI document from: {:?}", path);

    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json")
        || content.trim_start().starts_with('{');

    if is_json {
        serde_json::from_str(&content).map_err(|source| SchemaError::ParseJson {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&content).map_err(|source| SchemaError::ParseYaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn component<'a>(document: &'a Value, name: &str) -> Option<&'a Value> {
    document.get("components")?.get("schemas")?.get(name)
}

/// Copy the schema `value`, replacing every `{"$ref": "#/components/schemas/X"}` with X
///
/// Keys next to a `$ref` (usually `description`) override the referenced
/// schema's keys. Only schema positions are expanded; literal values under
/// `default`, `enum`, `example` and the like are copied as they are.
fn expand_refs(
    value: &Value,
    document: &Value,
    path: &Path,
    stack: &mut Vec<String>,
) -> SchemaResult<Value> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };

    let Some(Value::String(reference)) = map.get("$ref") else {
        return expand_keywords(map, serde_json::Map::new(), document, path, stack);
    };

    let dangling = || SchemaError::DanglingRef {
        path: path.to_path_buf(),
        reference: reference.clone(),
    };
    let name = reference.strip_prefix(COMPONENT_REF_PREFIX).ok_or_else(dangling)?;
    if stack.iter().any(|seen| seen == name) {
        return Err(SchemaError::CyclicRef {
            path: path.to_path_buf(),
            reference: reference.clone(),
        });
    }
    let target = component(document, name).ok_or_else(dangling)?;

    stack.push(name.to_string());
    let resolved = expand_refs(target, document, path, stack)?;
    stack.pop();

    match resolved {
        Value::Object(resolved) => {
            let siblings: serde_json::Map<String, Value> = map
                .iter()
                .filter(|(key, _)| *key != "$ref")
                .map(|(key, child)| (key.clone(), child.clone()))
                .collect();
            expand_keywords(&siblings, resolved, document, path, stack)
        }
        other => Ok(other),
    }
}

/// Expand the keywords of one schema object into `into`
fn expand_keywords(
    map: &serde_json::Map<String, Value>,
    mut into: serde_json::Map<String, Value>,
    document: &Value,
    path: &Path,
    stack: &mut Vec<String>,
) -> SchemaResult<Value> {
    for (key, child) in map {
        let expanded = match key.as_str() {
            "properties" | "patternProperties" | "definitions" | "dependencies" => {
                expand_schema_map(child, document, path, stack)?
            }
            "items" | "additionalProperties" | "additionalItems" | "not" | "allOf" | "anyOf"
            | "oneOf" => expand_schema_or_list(child, document, path, stack)?,
            _ => child.clone(),
        };
        into.insert(key.clone(), expanded);
    }
    Ok(Value::Object(into))
}

/// `{name: schema}`; non-schema entries (`dependencies` string lists) are kept
fn expand_schema_map(
    value: &Value,
    document: &Value,
    path: &Path,
    stack: &mut Vec<String>,
) -> SchemaResult<Value> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };
    let mut expanded = serde_json::Map::with_capacity(map.len());
    for (name, schema) in map {
        expanded.insert(name.clone(), expand_refs(schema, document, path, stack)?);
    }
    Ok(Value::Object(expanded))
}

/// A schema, a list of schemas, or a boolean
fn expand_schema_or_list(
    value: &Value,
    document: &Value,
    path: &Path,
    stack: &mut Vec<String>,
) -> SchemaResult<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| expand_refs(item, document, path, stack))
            .collect::<SchemaResult<Vec<_>>>()
            .map(Value::Array),
        other => expand_refs(other, document, path, stack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expand(document: &Value, name: &str) -> SchemaResult<Value> {
        let root = component(document, name).unwrap();
        expand_refs(root, document, Path::new("test.json"), &mut Vec::new())
    }

    #[test]
    fn test_expands_nested_refs() {
        let document = json!({
            "components": { "schemas": {
                "Rule": {
                    "type": "object",
                    "properties": {
                        "port": { "$ref": "#/components/schemas/Port", "description": "target port" },
                        "hosts": { "type": "array", "items": { "$ref": "#/components/schemas/Host" } }
                    }
                },
                "Port": { "type": "integer", "description": "a port" },
                "Host": { "type": "string" }
            }}
        });

        let expanded = expand(&document, "Rule").unwrap();
        assert_eq!(
            expanded,
            json!({
                "type": "object",
                "properties": {
                    "port": { "type": "integer", "description": "target port" },
                    "hosts": { "type": "array", "items": { "type": "string" } }
                }
            })
        );
    }

    #[test]
    fn test_cyclic_ref_is_error() {
        let document = json!({
            "components": { "schemas": {
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/components/schemas/Node" } }
                }
            }}
        });
        assert!(matches!(
            expand(&document, "Node"),
            Err(SchemaError::CyclicRef { .. })
        ));
    }

    #[test]
    fn test_dangling_ref_is_error() {
        let document = json!({
            "components": { "schemas": {
                "A": { "properties": { "b": { "$ref": "#/components/schemas/B" } } },
                "C": { "properties": { "d": { "$ref": "other.json#/D" } } }
            }}
        });
        assert!(matches!(
            expand(&document, "A"),
            Err(SchemaError::DanglingRef { .. })
        ));
        assert!(matches!(
            expand(&document, "C"),
            Err(SchemaError::DanglingRef { .. })
        ));
    }

    #[test]
    fn test_literal_values_with_ref_key_are_kept() {
        let document = json!({
            "components": { "schemas": {
                "A": {
                    "type": "object",
                    "properties": {
                        "cfg": {
                            "type": "object",
                            "x-kubernetes-preserve-unknown-fields": true,
                            "default": { "$ref": "some-literal" },
                            "example": { "$ref": "#/components/schemas/Missing" }
                        },
                        "mode": {
                            "type": "object",
                            "x-kubernetes-preserve-unknown-fields": true,
                            "enum": [{ "$ref": "a" }, { "$ref": "b" }]
                        }
                    }
                }
            }}
        });

        let expanded = expand(&document, "A").unwrap();
        assert_eq!(expanded, document["components"]["schemas"]["A"]);
    }

    #[test]
    fn test_loader_decodes_literal_ref_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.json");
        let document = json!({
            "components": { "schemas": {
                "A": {
                    "type": "object",
                    "properties": {
                        "cfg": {
                            "type": "object",
                            "x-kubernetes-preserve-unknown-fields": true,
                            "default": { "$ref": "some-literal" }
                        }
                    }
                }
            }}
        });
        std::fs::write(&file, document.to_string()).unwrap();

        let schema = SchemaLoader::new()
            .load(&SchemaRef::new(&file, Some("A")))
            .unwrap();
        let cfg = &schema.properties.as_ref().unwrap()["cfg"];
        assert_eq!(
            cfg.default.as_ref().map(|d| &d.0),
            Some(&json!({ "$ref": "some-literal" }))
        );
    }

    #[test]
    fn test_refs_expanded_in_junctors_and_maps() {
        let document = json!({
            "components": { "schemas": {
                "A": {
                    "type": "object",
                    "additionalProperties": { "$ref": "#/components/schemas/S" },
                    "anyOf": [{ "not": { "$ref": "#/components/schemas/S" } }]
                },
                "S": { "type": "string" }
            }}
        });

        assert_eq!(
            expand(&document, "A").unwrap(),
            json!({
                "type": "object",
                "additionalProperties": { "type": "string" },
                "anyOf": [{ "not": { "type": "string" } }]
            })
        );
    }

    #[test]
    fn test_property_named_ref_is_kept() {
        let document = json!({
            "components": { "schemas": {
                "A": { "type": "object", "properties": { "$ref": { "type": "string" } } }
            }}
        });
        assert_eq!(
            expand(&document, "A").unwrap(),
            json!({ "type": "object", "properties": { "$ref": { "type": "string" } } })
        );
    }
}
