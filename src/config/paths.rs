//! Path resolution for configuration and referenced files

use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "crdgen.yaml";

/// Get the configuration file path
///
/// Checks CRDGEN_CONFIG environment variable first, then falls back to
/// `crdgen.yaml` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var("CRDGEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Directory that relative paths in `config_path` are resolved against
pub fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir(Path::new("crdgen.yaml")), PathBuf::from("."));
        assert_eq!(
            base_dir(Path::new("build/crdgen.yaml")),
            PathBuf::from("build")
        );
    }

    #[test]
    fn test_resolve() {
        let base = Path::new("build");
        assert_eq!(
            resolve(base, Path::new("openapi/a.json")),
            PathBuf::from("build/openapi/a.json")
        );
        assert!(resolve(base, &std::env::temp_dir()).is_absolute());
    }
}
