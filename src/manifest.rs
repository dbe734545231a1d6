//! JSON manifest listing the key files a keystore is populated from.
//!
//! ```json
//! { "keys": { "token-signer": "keys/privatekey.pem" } }
//! ```
//!
//! Relative paths are resolved against the manifest's own directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CryptoError, Result};

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    keys: BTreeMap<String, PathBuf>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a manifest and resolves its relative paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let manifest = Self::from_json(&text)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.resolved_against(base))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CryptoError::Parse(format!("manifest: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CryptoError::Encode(format!("manifest: {e}")))
    }

    pub fn insert(&mut self, identifier: &str, path: impl Into<PathBuf>) {
        self.keys.insert(identifier.to_string(), path.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.keys.iter().map(|(id, path)| (id.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        for path in self.keys.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_key_map() {
        let m = Manifest::from_json(r#"{"keys": {"a": "a.pem", "b": "/abs/b.pem"}}"#).unwrap();
        let entries: Vec<_> = m.entries().collect();
        assert_eq!(
            entries,
            vec![("a", Path::new("a.pem")), ("b", Path::new("/abs/b.pem"))]
        );
    }

    #[test]
    fn missing_keys_field_is_empty() {
        assert!(Manifest::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(
            Manifest::from_json("{keys"),
            Err(CryptoError::Parse(_))
        ));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.json");
        fs::write(&path, r#"{"keys": {"a": "sub/a.pem"}}"#).unwrap();

        let m = Manifest::load(&path).unwrap();
        let (_, resolved) = m.entries().next().unwrap();
        assert_eq!(resolved, dir.path().join("sub/a.pem"));
    }

    #[test]
    fn json_roundtrip() {
        let mut m = Manifest::new();
        m.insert("signer", "signer.pem");
        let back = Manifest::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.len(), 1);
    }
}
