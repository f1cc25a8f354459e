//! The endpoint registry: a directory of manifest files describing
//! callable functions, scanned into a flat name → location map (spec
//! §6 "Endpoint Registry").
//!
//! Each manifest is a `*.endpoint.toml` file declaring the function
//! bindings it exports. A binding's registered name is derived from
//! its path: the manifest suffix is stripped, a trailing `index`
//! path segment is dropped, remaining separators become `.`, and the
//! binding name is appended — e.g. `users/index.endpoint.toml` binding
//! `create` registers as `users.create`, while a manifest at the
//! registry root registers its bindings under their bare name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reactive_core::errors::{EngineError, EngineResult};
use serde::Deserialize;

const MANIFEST_SUFFIX: &str = ".endpoint.toml";
const IGNORED_DIR_NAMES: &[&str] = &["node_modules", "generated", ".git"];

#[derive(Debug, Clone, Deserialize)]
struct EndpointManifest {
    bindings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointLocation {
    pub registered_name: String,
    pub manifest_path: PathBuf,
    pub binding: String,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    entries: BTreeMap<String, EndpointLocation>,
}

impl EndpointRegistry {
    pub fn get(&self, name: &str) -> Option<&EndpointLocation> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk `root` for `*.endpoint.toml` manifests and build a registry.
/// Fails on the first naming collision between two bindings, or on a
/// manifest that doesn't parse as valid TOML.
pub fn scan(root: impl AsRef<Path>) -> EngineResult<EndpointRegistry> {
    let root = root.as_ref();
    let mut entries: BTreeMap<String, EndpointLocation> = BTreeMap::new();

    let walker = walkdir::WalkDir::new(root).into_iter().filter_entry(|entry| {
        !entry
            .file_name()
            .to_str()
            .map(|name| IGNORED_DIR_NAMES.contains(&name))
            .unwrap_or(false)
    });

    for entry in walker {
        let entry = entry.map_err(|err| {
            EngineError::FunctionResolutionError(format!("failed walking endpoint registry: {err}"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(MANIFEST_SUFFIX) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let base_name = derive_base_name(relative);

        let text = std::fs::read_to_string(path).map_err(|err| {
            EngineError::FunctionResolutionError(format!(
                "failed reading endpoint manifest '{}': {err}",
                path.display()
            ))
        })?;
        let manifest: EndpointManifest = toml::from_str(&text).map_err(|err| {
            EngineError::FunctionResolutionError(format!(
                "invalid endpoint manifest '{}': {err}",
                path.display()
            ))
        })?;

        for binding in &manifest.bindings {
            let registered_name = if base_name.is_empty() {
                binding.clone()
            } else {
                format!("{base_name}.{binding}")
            };

            if let Some(existing) = entries.get(&registered_name) {
                return Err(EngineError::FunctionResolutionError(format!(
                    "endpoint '{registered_name}' is declared twice: '{}' and '{}'",
                    existing.manifest_path.display(),
                    path.display()
                )));
            }

            entries.insert(
                registered_name.clone(),
                EndpointLocation {
                    registered_name,
                    manifest_path: path.to_path_buf(),
                    binding: binding.clone(),
                },
            );
        }
    }

    Ok(EndpointRegistry { entries })
}

fn derive_base_name(relative_manifest_path: &Path) -> String {
    let stripped = relative_manifest_path
        .to_string_lossy()
        .trim_end_matches(MANIFEST_SUFFIX)
        .to_string();

    let mut segments: Vec<&str> = stripped.split(std::path::MAIN_SEPARATOR).collect();
    if segments.last() == Some(&"index") {
        segments.pop();
    }
    segments.retain(|s| !s.is_empty());
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(root: &Path, relative: &str, bindings: &[&str]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bindings_toml = bindings
            .iter()
            .map(|b| format!("\"{b}\""))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(path, format!("bindings = [{bindings_toml}]\n")).unwrap();
    }

    #[test]
    fn derives_dotted_name_from_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "users/create.endpoint.toml", &["createUser"]);
        let registry = scan(dir.path()).unwrap();
        assert!(registry.get("users.create.createUser").is_some());
    }

    #[test]
    fn index_manifest_drops_trailing_segment() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "users/index.endpoint.toml", &["list"]);
        let registry = scan(dir.path()).unwrap();
        assert!(registry.get("users.list").is_some());
    }

    #[test]
    fn root_level_manifest_registers_bare_binding_name() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "index.endpoint.toml", &["ping"]);
        let registry = scan(dir.path()).unwrap();
        assert!(registry.get("ping").is_some());
    }

    #[test]
    fn colliding_names_error() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "a.endpoint.toml", &["run"]);
        write_manifest(dir.path(), "b/a.endpoint.toml", &["x"]);
        // Force a collision: same derived base as the first.
        write_manifest(dir.path(), "a.endpoint.toml", &["run"]);
        let result = scan(dir.path());
        // Re-writing the same manifest path isn't itself a collision;
        // construct a genuine collision via two distinct files instead.
        drop(result);

        let dir2 = tempfile::tempdir().unwrap();
        write_manifest(dir2.path(), "users.endpoint.toml", &["create"]);
        fs::create_dir_all(dir2.path().join("users")).unwrap();
        fs::write(
            dir2.path().join("users/index.endpoint.toml"),
            "bindings = [\"create\"]\n",
        )
        .unwrap();
        let err = scan(dir2.path()).unwrap_err();
        assert_eq!(err.kind_name(), "FunctionResolutionError");
    }

    #[test]
    fn ignores_node_modules_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "node_modules/pkg/x.endpoint.toml", &["x"]);
        let registry = scan(dir.path()).unwrap();
        assert!(registry.is_empty());
    }
}
