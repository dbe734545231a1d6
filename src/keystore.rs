//! Named registry of private keys.

use dashmap::DashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::crypto::{EncodedKey, PrivateKey, decode_private_key, read_key_file};
use crate::error::Result;
use crate::manifest::Manifest;

/// Maps identifiers to private keys.
///
/// Safe to share between threads; every operation takes `&self`. Adding
/// under an existing identifier replaces the previous key.
#[derive(Default)]
pub struct KeyStore {
    keys: DashMap<String, Arc<PrivateKey>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keystore from every entry of a manifest file.
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new();
        store.load_manifest(path)?;
        Ok(store)
    }

    /// Decodes `encoded` and stores it under `identifier`.
    pub fn add(&self, identifier: &str, encoded: &EncodedKey) -> Result<()> {
        let key = decode_private_key(encoded)?;
        self.insert(identifier, key);
        Ok(())
    }

    /// Parses PEM text and stores it under `identifier`.
    pub fn add_pem(&self, identifier: &str, pem: &str) -> Result<()> {
        self.add(identifier, &EncodedKey::parse(pem)?)
    }

    pub fn add_from_file(&self, identifier: &str, path: impl AsRef<Path>) -> Result<()> {
        self.add(identifier, &read_key_file(path)?)
    }

    /// Adds every key listed in the manifest. Stops at the first key that
    /// fails to load; keys added before it stay in the store.
    pub fn load_manifest(&self, path: impl AsRef<Path>) -> Result<usize> {
        let manifest = Manifest::load(path)?;
        for (identifier, key_path) in manifest.entries() {
            self.add_from_file(identifier, key_path)?;
        }
        Ok(manifest.len())
    }

    /// Stores an already decoded key, returning the one it replaced.
    pub fn insert(&self, identifier: &str, key: PrivateKey) -> Option<Arc<PrivateKey>> {
        let algorithm = key.algorithm();
        let previous = self.keys.insert(identifier.to_string(), Arc::new(key));
        tracing::debug!(
            identifier,
            %algorithm,
            replaced = previous.is_some(),
            "added key to keystore"
        );
        previous
    }

    /// Looks up a key. `None` means the identifier was never added.
    pub fn get(&self, identifier: &str) -> Option<Arc<PrivateKey>> {
        self.keys.get(identifier).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, identifier: &str) -> Option<Arc<PrivateKey>> {
        self.keys.remove(identifier).map(|(_, key)| key)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.keys.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sorted identifiers currently in the store.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::tests::{other_rsa_pair, rsa_pair};
    use crate::crypto::{
        KeyAlgorithm, KeyPair, encode_private_key, encode_public_key, write_private_key,
    };
    use crate::error::CryptoError;
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    fn rsa_pem() -> EncodedKey {
        encode_private_key(rsa_pair().private_key()).unwrap()
    }

    #[test]
    fn lookup_of_unknown_identifier_is_none() {
        let store = KeyStore::new();
        assert!(store.get("missing").is_none());
        assert!(!store.contains("missing"));
        assert!(store.is_empty());
    }

    #[test]
    fn add_then_lookup() {
        let store = KeyStore::new();
        store.add("signer", &rsa_pem()).unwrap();

        let key = store.get("signer").unwrap();
        assert_eq!(key.as_ref(), rsa_pair().private_key());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_pem_text() {
        let store = KeyStore::new();
        store.add_pem("signer", rsa_pem().as_str()).unwrap();
        assert!(store.contains("signer"));
    }

    #[test]
    fn add_replaces_existing_entry() {
        let store = KeyStore::new();
        store.add("signer", &rsa_pem()).unwrap();
        let other = encode_private_key(other_rsa_pair().private_key()).unwrap();
        store.add("signer", &other).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("signer").unwrap().as_ref(),
            other_rsa_pair().private_key()
        );
    }

    #[test]
    fn ecdsa_keys_are_accepted() {
        let store = KeyStore::new();
        let pair = KeyPair::generate_ecdsa().unwrap();
        store
            .add("ec", &encode_private_key(pair.private_key()).unwrap())
            .unwrap();
        assert_eq!(store.get("ec").unwrap().algorithm(), KeyAlgorithm::Ecdsa);
    }

    #[test]
    fn malformed_pem_is_parse_error_and_nothing_is_stored() {
        let store = KeyStore::new();
        assert!(matches!(
            store.add_pem("bad", "garbage"),
            Err(CryptoError::Parse(_))
        ));
        assert!(store.get("bad").is_none());
    }

    #[test]
    fn public_key_is_rejected() {
        let store = KeyStore::new();
        let public = encode_public_key(rsa_pair().public_key()).unwrap();
        assert!(matches!(
            store.add("pub", &public),
            Err(CryptoError::Parse(_))
        ));
    }

    #[test]
    fn add_from_file_works() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("privatekey.pem");
        write_private_key(&path, rsa_pair().private_key()).unwrap();

        let store = KeyStore::new();
        store.add_from_file("signer", &path).unwrap();
        assert!(store.contains("signer"));
    }

    #[test]
    fn add_from_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new();
        assert!(matches!(
            store.add_from_file("signer", dir.path().join("nope.pem")),
            Err(CryptoError::Io(_))
        ));
    }

    #[test]
    fn remove_and_identifiers() {
        let store = KeyStore::new();
        store.add("b", &rsa_pem()).unwrap();
        store.add("a", &rsa_pem()).unwrap();
        assert_eq!(store.identifiers(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.identifiers(), vec!["b".to_string()]);
    }

    #[test]
    fn debug_lists_identifiers_only() {
        let store = KeyStore::new();
        store.add("signer", &rsa_pem()).unwrap();
        assert_eq!(format!("{store:?}"), r#"KeyStore { identifiers: ["signer"] }"#);
    }

    #[test]
    fn load_manifest_adds_every_key() {
        let dir = tempdir().unwrap();
        write_private_key(dir.path().join("rsa.pem"), rsa_pair().private_key()).unwrap();
        let ec = KeyPair::generate_ecdsa().unwrap();
        write_private_key(dir.path().join("ec.pem"), ec.private_key()).unwrap();

        let manifest = dir.path().join("keys.json");
        fs::write(
            &manifest,
            r#"{"keys": {"token-signer": "rsa.pem", "device": "ec.pem"}}"#,
        )
        .unwrap();

        let store = KeyStore::from_manifest(&manifest).unwrap();
        assert_eq!(store.identifiers(), vec!["device", "token-signer"]);
    }

    #[test]
    fn manifest_with_missing_key_file_fails() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("keys.json");
        fs::write(&manifest, r#"{"keys": {"a": "missing.pem"}}"#).unwrap();

        assert!(matches!(
            KeyStore::from_manifest(&manifest),
            Err(CryptoError::Io(_))
        ));
    }

    #[test]
    fn concurrent_add_and_lookup_never_lose_entries() {
        let store = KeyStore::new();
        let key = rsa_pair().private_key().clone();
        let encoded = rsa_pem();
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        thread::scope(|s| {
            for t in 0..THREADS {
                let store = &store;
                let key = key.clone();
                let encoded = &encoded;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let id = format!("key-{t}-{i}");
                        // even threads decode from PEM, odd threads store decoded keys
                        if t % 2 == 0 {
                            store.add(&id, encoded).unwrap();
                        } else {
                            store.insert(&id, key.clone());
                        }
                        let found = store.get(&id).expect("just added");
                        assert_eq!(found.algorithm(), KeyAlgorithm::Rsa);
                        // lookups of other threads' identifiers may miss, never fail
                        let _ = store.get(&format!("key-{}-{i}", (t + 1) % THREADS));
                    }
                });
            }
        });

        assert_eq!(store.len(), THREADS * PER_THREAD);
        for t in 0..THREADS {
            for i in 0..PER_THREAD {
                assert_eq!(store.get(&format!("key-{t}-{i}")).unwrap().as_ref(), &key);
            }
        }
    }

    #[test]
    fn concurrent_replacement_keeps_one_whole_key() {
        let store = KeyStore::new();
        let a = rsa_pair().private_key().clone();
        let b = other_rsa_pair().private_key().clone();
        let (a, b) = (&a, &b);

        thread::scope(|s| {
            for t in 0..4 {
                let store = &store;
                let key = if t % 2 == 0 { a.clone() } else { b.clone() };
                s.spawn(move || {
                    for _ in 0..100 {
                        store.insert("shared", key.clone());
                        let seen = store.get("shared").unwrap();
                        assert!(seen.as_ref() == a || seen.as_ref() == b);
                    }
                });
            }
        });

        assert_eq!(store.len(), 1);
    }
}
