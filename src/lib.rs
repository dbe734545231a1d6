//! RSA and ECDSA P-521 key management, signatures, XChaCha20-Poly1305
//! encryption, HMAC and a named keystore.
//!
//! ```no_run
//! use keyforge::{HashAlgorithm, KeyPair, KeyStore, Signer, encode_private_key};
//!
//! # fn main() -> keyforge::Result<()> {
//! let pair = KeyPair::generate_ecdsa()?;
//! let store = KeyStore::new();
//! store.add("device", &encode_private_key(pair.private_key())?)?;
//!
//! let signer = Signer::new(HashAlgorithm::Sha512);
//! let key = store.get("device").expect("added above");
//! let sig = signer.sign(b"hello", &key)?;
//! assert!(signer.verify(b"hello", &sig, pair.public_key()).is_accept());
//! # Ok(())
//! # }
//! ```

pub mod crypto;
mod error;
mod keystore;
mod manifest;
mod storage;

pub use crate::crypto::{
    EncodedKey, HashAlgorithm, KeyAlgorithm, KeyLabel, KeyPair, PrivateKey, PublicKey,
    RejectReason, Signature, Signer, SymmetricCipher, Verification, compute_mac,
    decode_private_key, decode_public_key, decode_rsa_private_key, encode_private_key,
    encode_public_key, encode_public_key_spki, read_key_file, read_private_key, read_public_key,
    verify_mac, write_key_file, write_private_key, write_public_key,
};
pub use crate::error::{CryptoError, Result};
pub use crate::keystore::KeyStore;
pub use crate::manifest::Manifest;
pub use crate::storage::Storage;
