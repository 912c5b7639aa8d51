//! CLI command tests
//!
//! Drive `handle_command` the way `main` does, against configurations and
//! manifests written to temporary directories.

use crdgen::cli::{Command, handle_command};
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"
components:
  schemas:
    example.Thing:
      type: object
      properties:
        size:
          type: integer
        extra: {}
"#;

fn write_project(dir: &Path, output: Option<&str>) -> PathBuf {
    std::fs::create_dir_all(dir.join("openapi")).unwrap();
    std::fs::write(dir.join("openapi/thing.gen.yaml"), SCHEMA).unwrap();

    let output = output
        .map(|o| format!("output: {}\n", o))
        .unwrap_or_default();
    let config = format!(
        r#"{}crds:
  - group: example.io
    kind: Thing
    plural: things
    versions:
      - name: v1
        storage: true
        schema:
          file: openapi/thing.gen.yaml
          component: example.Thing
"#,
        output
    );
    let path = dir.join("crdgen.yaml");
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_generate_output_flag_wins_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), Some("from-config/crds.yaml"));
    let flag_output = dir.path().join("nested/out/crds.yaml");

    handle_command(Command::Generate {
        config: Some(config),
        output: Some(flag_output.clone()),
    })
    .unwrap();

    let written = std::fs::read_to_string(&flag_output).unwrap();
    assert!(written.contains("name: things.example.io"));
    assert!(written.contains("x-kubernetes-preserve-unknown-fields: true"));
    assert!(!dir.path().join("from-config").exists());
}

#[test]
fn test_generate_writes_config_output_relative_to_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), Some("manifests/crds.gen.yaml"));

    handle_command(Command::Generate {
        config: Some(config),
        output: None,
    })
    .unwrap();

    let written = std::fs::read_to_string(dir.path().join("manifests/crds.gen.yaml")).unwrap();
    assert!(written.starts_with("apiVersion: apiextensions.k8s.io/v1\n"));
}

#[test]
fn test_generate_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), None);
    std::fs::write(
        dir.path().join("openapi/thing.gen.yaml"),
        "components:\n  schemas:\n    example.Thing:\n      type: object\n      properties:\n        tags:\n          type: array\n",
    )
    .unwrap();
    let output = dir.path().join("out/crds.yaml");

    let err = handle_command(Command::Generate {
        config: Some(config),
        output: Some(output.clone()),
    })
    .unwrap_err();

    assert!(format!("{:#}", err).contains("not structural"));
    assert!(!output.exists());
}

#[test]
fn test_check_runs_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), Some("crds.yaml"));

    handle_command(Command::Check {
        config: Some(config),
    })
    .unwrap();

    assert!(!dir.path().join("crds.yaml").exists());
}

#[test]
fn test_validate_fails_on_non_structural_manifest() {
    let broken =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/manifests/broken.yaml");

    let err = handle_command(Command::Validate {
        files: vec![broken],
    })
    .unwrap_err();

    assert_eq!(err.to_string(), "1 CRD version(s) failed structural validation");
}

#[test]
fn test_validate_fails_on_version_without_schema() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("crd.yaml");
    std::fs::write(
        &manifest,
        r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: things.example.io
spec:
  group: example.io
  names:
    kind: Thing
    plural: things
  scope: Namespaced
  versions:
  - name: v1
    served: true
    storage: true
"#,
    )
    .unwrap();

    assert!(
        handle_command(Command::Validate {
            files: vec![manifest],
        })
        .is_err()
    );
}

#[test]
fn test_validate_accepts_generated_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), None);
    let output = dir.path().join("crds.yaml");

    handle_command(Command::Generate {
        config: Some(config),
        output: Some(output.clone()),
    })
    .unwrap();

    handle_command(Command::Validate {
        files: vec![output],
    })
    .unwrap();
}

#[test]
fn test_validate_missing_file() {
    let err = handle_command(Command::Validate {
        files: vec![PathBuf::from("does/not/exist.yaml")],
    })
    .unwrap_err();

    assert!(err.to_string().contains("Failed to read manifest file"));
}
