use crate::error::ResolveError;
use crate::model::ImportIdentity;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where a descriptor lives and which fields route a file.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorLayout {
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Dotted key path, e.g. `routing.container_id`.
    #[serde(default = "default_container_key")]
    pub container_key: String,
    #[serde(default = "default_identity_key")]
    pub identity_key: String,
}

fn default_file_name() -> String {
    "descriptor.json".to_string()
}

fn default_container_key() -> String {
    "container_id".to_string()
}

fn default_identity_key() -> String {
    "identity_name".to_string()
}

impl Default for DescriptorLayout {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            container_key: default_container_key(),
            identity_key: default_identity_key(),
        }
    }
}

impl DescriptorLayout {
    /// The descriptor governing `file`: the one in its own directory, else the
    /// nearest one in an ancestor directory, stopping at `root`.
    pub fn sidecar_for(&self, file: &Path, root: &Path) -> Option<PathBuf> {
        let mut dir = file.parent();
        while let Some(current) = dir {
            let candidate = current.join(&self.file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
            if current == root || !current.starts_with(root) {
                break;
            }
            dir = current.parent();
        }
        None
    }

    pub fn resolve(&self, descriptor: &Path) -> Result<ImportIdentity, ResolveError> {
        let text = match fs::read_to_string(descriptor) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::Missing(descriptor.to_path_buf()))
            }
            Err(source) => {
                return Err(ResolveError::Unreadable {
                    path: descriptor.to_path_buf(),
                    source,
                })
            }
        };
        let document: Value =
            serde_json::from_str(&text).map_err(|e| ResolveError::Malformed {
                path: descriptor.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.identity_from(&document)
            .map_err(|reason| ResolveError::Invalid {
                path: descriptor.to_path_buf(),
                reason,
            })
    }

    fn identity_from(&self, document: &Value) -> Result<ImportIdentity, String> {
        let container = lookup(document, &self.container_key)
            .ok_or_else(|| format!("missing `{}`", self.container_key))?;
        let container_id = parse_container_id(container)
            .ok_or_else(|| format!("`{}` is not a non-negative integer: {}", self.container_key, container))?;

        let name = lookup(document, &self.identity_key)
            .ok_or_else(|| format!("missing `{}`", self.identity_key))?;
        let name = name
            .as_str()
            .ok_or_else(|| format!("`{}` is not a string: {}", self.identity_key, name))?;

        ImportIdentity::new(container_id, name)
            .ok_or_else(|| format!("`{}` is empty", self.identity_key))
    }
}

/// Resolve with the default layout.
pub fn resolve(descriptor: &Path) -> Result<ImportIdentity, ResolveError> {
    DescriptorLayout::default().resolve(descriptor)
}

fn lookup<'a>(document: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(document, |node, key| node.as_object()?.get(key))
}

fn parse_container_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_descriptor(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("descriptor.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn accepts_integer_and_integer_string_ids() {
        let tmp = tempdir().unwrap();
        let path = write_descriptor(tmp.path(), r#"{"container_id": 42, "identity_name": "alice"}"#);
        let identity = resolve(&path).unwrap();
        assert_eq!(identity.container_id(), 42);
        assert_eq!(identity.identity_name(), "alice");

        let path = write_descriptor(tmp.path(), r#"{"container_id": " 7 ", "identity_name": " bob "}"#);
        let identity = resolve(&path).unwrap();
        assert_eq!(identity.container_id(), 7);
        assert_eq!(identity.identity_name(), "bob");

        let path = write_descriptor(tmp.path(), r#"{"container_id": 0, "identity_name": "carol"}"#);
        assert_eq!(resolve(&path).unwrap().container_id(), 0);
    }

    #[test]
    fn rejects_bad_shapes() {
        let tmp = tempdir().unwrap();
        let bad = [
            r#"{"container_id": "abc", "identity_name": "bob"}"#,
            r#"{"container_id": -3, "identity_name": "bob"}"#,
            r#"{"container_id": 4.5, "identity_name": "bob"}"#,
            r#"{"container_id": null, "identity_name": "bob"}"#,
            r#"{"identity_name": "bob"}"#,
            r#"{"container_id": 1}"#,
            r#"{"container_id": 1, "identity_name": "   "}"#,
            r#"{"container_id": 1, "identity_name": 5}"#,
            r#"[1, 2]"#,
        ];
        for body in bad {
            let path = write_descriptor(tmp.path(), body);
            let err = resolve(&path).unwrap_err();
            assert!(
                matches!(err, ResolveError::Invalid { .. }),
                "expected Invalid for {}, got {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn missing_and_malformed_are_distinct() {
        let tmp = tempdir().unwrap();
        let err = resolve(&tmp.path().join("descriptor.json")).unwrap_err();
        assert!(matches!(err, ResolveError::Missing(_)));
        assert!(!err.is_content_error());

        let path = write_descriptor(tmp.path(), "container_id: 1");
        let err = resolve(&path).unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
        assert!(err.is_content_error());
        assert_ne!(
            ResolveError::Missing(path.clone()).to_string(),
            err.to_string()
        );
    }

    #[test]
    fn nested_key_paths() {
        let tmp = tempdir().unwrap();
        let layout = DescriptorLayout {
            container_key: "routing.dataset".to_string(),
            identity_key: "routing.owner".to_string(),
            ..DescriptorLayout::default()
        };
        let path = write_descriptor(
            tmp.path(),
            r#"{"routing": {"dataset": "12", "owner": "dana"}, "notes": "x"}"#,
        );
        let identity = layout.resolve(&path).unwrap();
        assert_eq!(identity.container_id(), 12);
        assert_eq!(identity.identity_name(), "dana");
    }

    #[test]
    fn sidecar_lookup_walks_up_to_root() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("root");
        let deep = root.join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        let layout = DescriptorLayout::default();
        let file = deep.join("img.tif");

        assert_eq!(layout.sidecar_for(&file, &root), None);

        // A descriptor above the root is never used.
        write_descriptor(tmp.path(), "{}");
        assert_eq!(layout.sidecar_for(&file, &root), None);

        let top = write_descriptor(&root, "{}");
        assert_eq!(layout.sidecar_for(&file, &root), Some(top));

        let near = write_descriptor(&deep, "{}");
        assert_eq!(layout.sidecar_for(&file, &root), Some(near));
    }
}
