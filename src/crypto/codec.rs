//! PEM encoding of asymmetric keys and key files.
//!
//! RSA keys use PKCS#1 (`RSA PRIVATE KEY` / `RSA PUBLIC KEY`). P-521 keys use
//! SEC1 for the private half (`EC PRIVATE KEY`) and SubjectPublicKeyInfo for
//! the public half (`PUBLIC KEY`). A `PUBLIC KEY` container may also hold an
//! RSA key; the algorithm identifier inside it decides.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::der::Decode;
use rsa::pkcs8::spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::keys::{KeyAlgorithm, PrivateKey, PublicKey};
use crate::error::{CryptoError, Result};
use crate::storage::Storage;

/// `rsaEncryption`
const RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// `id-ecPublicKey`
const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Type label of a PEM container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLabel {
    RsaPrivate,
    RsaPublic,
    EcPrivate,
    Public,
}

impl KeyLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyLabel::RsaPrivate => "RSA PRIVATE KEY",
            KeyLabel::RsaPublic => "RSA PUBLIC KEY",
            KeyLabel::EcPrivate => "EC PRIVATE KEY",
            KeyLabel::Public => "PUBLIC KEY",
        }
    }

    pub fn is_private(self) -> bool {
        matches!(self, KeyLabel::RsaPrivate | KeyLabel::EcPrivate)
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "RSA PRIVATE KEY" => Some(KeyLabel::RsaPrivate),
            "RSA PUBLIC KEY" => Some(KeyLabel::RsaPublic),
            "EC PRIVATE KEY" => Some(KeyLabel::EcPrivate),
            "PUBLIC KEY" => Some(KeyLabel::Public),
            _ => None,
        }
    }
}

impl fmt::Display for KeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One key in PEM form. The text is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedKey {
    label: KeyLabel,
    pem: Zeroizing<String>,
}

impl EncodedKey {
    /// Checks the PEM boundaries and type label. The payload is validated
    /// when the key is decoded.
    pub fn parse(text: &str) -> Result<Self> {
        let label = pem_rfc7468::decode_label(text.trim_start().as_bytes())
            .map_err(|e| CryptoError::Parse(format!("malformed PEM container: {e}")))?;
        let label = KeyLabel::from_label(label)
            .ok_or_else(|| CryptoError::Parse(format!("unsupported PEM label '{label}'")))?;

        Ok(Self {
            label,
            pem: Zeroizing::new(text.to_string()),
        })
    }

    pub fn label(&self) -> KeyLabel {
        self.label
    }

    pub fn as_str(&self) -> &str {
        &self.pem
    }

    fn new(label: KeyLabel, pem: Zeroizing<String>) -> Self {
        Self { label, pem }
    }

    fn der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let (_, der) = pem_rfc7468::decode_vec(self.pem.trim_start().as_bytes())
            .map_err(|e| CryptoError::Parse(format!("malformed PEM container: {e}")))?;
        Ok(Zeroizing::new(der))
    }
}

impl fmt::Debug for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedKey")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl FromStr for EncodedKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

pub fn encode_private_key(key: &PrivateKey) -> Result<EncodedKey> {
    match key {
        PrivateKey::Rsa(key) => {
            let pem = key
                .to_pkcs1_pem(LineEnding::LF)
                .map_err(|e| CryptoError::Encode(e.to_string()))?;
            Ok(EncodedKey::new(KeyLabel::RsaPrivate, pem))
        }
        PrivateKey::Ecdsa(key) => {
            let pem = key
                .to_sec1_pem(LineEnding::LF)
                .map_err(|e| CryptoError::Encode(e.to_string()))?;
            Ok(EncodedKey::new(KeyLabel::EcPrivate, pem))
        }
    }
}

pub fn encode_public_key(key: &PublicKey) -> Result<EncodedKey> {
    match key {
        PublicKey::Rsa(key) => {
            let pem = key
                .to_pkcs1_pem(LineEnding::LF)
                .map_err(|e| CryptoError::Encode(e.to_string()))?;
            Ok(EncodedKey::new(KeyLabel::RsaPublic, Zeroizing::new(pem)))
        }
        PublicKey::Ecdsa(key) => {
            let pem = key
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| CryptoError::Encode(e.to_string()))?;
            Ok(EncodedKey::new(KeyLabel::Public, Zeroizing::new(pem)))
        }
    }
}

/// Decodes a private key, choosing the family from the container label.
pub fn decode_private_key(encoded: &EncodedKey) -> Result<PrivateKey> {
    match encoded.label() {
        KeyLabel::RsaPrivate => RsaPrivateKey::from_pkcs1_pem(encoded.as_str())
            .map(PrivateKey::Rsa)
            .map_err(|e| CryptoError::Parse(format!("RSA private key: {e}"))),
        KeyLabel::EcPrivate => p521::SecretKey::from_sec1_pem(encoded.as_str())
            .map(PrivateKey::Ecdsa)
            .map_err(|e| CryptoError::Parse(format!("EC private key: {e}"))),
        label => Err(CryptoError::Parse(format!(
            "expected a private key container, found '{label}'"
        ))),
    }
}

/// Decodes an RSA private key. An EC private key is a `WrongKeyType`.
pub fn decode_rsa_private_key(encoded: &EncodedKey) -> Result<RsaPrivateKey> {
    match decode_private_key(encoded)? {
        PrivateKey::Rsa(key) => Ok(key),
        PrivateKey::Ecdsa(_) => Err(CryptoError::WrongKeyType {
            expected: KeyAlgorithm::Rsa.name(),
            found: KeyAlgorithm::Ecdsa.name().to_string(),
        }),
    }
}

/// Decodes a public key that must belong to `expected`.
pub fn decode_public_key(encoded: &EncodedKey, expected: KeyAlgorithm) -> Result<PublicKey> {
    match (encoded.label(), expected) {
        (KeyLabel::RsaPublic, KeyAlgorithm::Rsa) => RsaPublicKey::from_pkcs1_pem(encoded.as_str())
            .map(PublicKey::Rsa)
            .map_err(|e| CryptoError::Parse(format!("RSA public key: {e}"))),
        (KeyLabel::RsaPublic, KeyAlgorithm::Ecdsa) => Err(CryptoError::WrongKeyType {
            expected: expected.name(),
            found: KeyAlgorithm::Rsa.name().to_string(),
        }),
        (KeyLabel::Public, _) => decode_spki(encoded, expected),
        (label, _) => Err(CryptoError::Parse(format!(
            "expected a public key container, found '{label}'"
        ))),
    }
}

fn decode_spki(encoded: &EncodedKey, expected: KeyAlgorithm) -> Result<PublicKey> {
    let der = encoded.der()?;
    let spki = SubjectPublicKeyInfoRef::from_der(&der)
        .map_err(|e| CryptoError::Parse(format!("SubjectPublicKeyInfo: {e}")))?;
    let oid = spki.algorithm.oid;

    match expected {
        KeyAlgorithm::Rsa if oid == RSA_OID => RsaPublicKey::from_public_key_der(&der)
            .map(PublicKey::Rsa)
            .map_err(|e| CryptoError::Parse(format!("RSA public key: {e}"))),
        KeyAlgorithm::Ecdsa if oid == EC_PUBLIC_KEY_OID => {
            p521::PublicKey::from_public_key_der(&der)
                .map(PublicKey::Ecdsa)
                .map_err(|e| CryptoError::Parse(format!("EC public key: {e}")))
        }
        _ => Err(CryptoError::WrongKeyType {
            expected: expected.name(),
            found: describe_oid(oid),
        }),
    }
}

fn describe_oid(oid: ObjectIdentifier) -> String {
    if oid == RSA_OID {
        KeyAlgorithm::Rsa.name().to_string()
    } else if oid == EC_PUBLIC_KEY_OID {
        "EC".to_string()
    } else {
        format!("algorithm {oid}")
    }
}

/// Encodes `key` as a generic `PUBLIC KEY` container regardless of family.
pub fn encode_public_key_spki(key: &PublicKey) -> Result<EncodedKey> {
    let pem = match key {
        PublicKey::Rsa(key) => key.to_public_key_pem(LineEnding::LF),
        PublicKey::Ecdsa(key) => key.to_public_key_pem(LineEnding::LF),
    }
    .map_err(|e| CryptoError::Encode(e.to_string()))?;
    Ok(EncodedKey::new(KeyLabel::Public, Zeroizing::new(pem)))
}

/// Writes one PEM key to `path`, replacing the file atomically. Private
/// containers get owner-only permissions on Unix.
pub fn write_key_file(path: impl AsRef<Path>, key: &EncodedKey) -> Result<()> {
    let path = path.as_ref();
    Storage::new(path.to_path_buf())
        .restricted(key.label().is_private())
        .save(key.as_str().as_bytes())?;
    tracing::debug!(path = %path.display(), label = %key.label(), "wrote key file");
    Ok(())
}

pub fn read_key_file(path: impl AsRef<Path>) -> Result<EncodedKey> {
    let bytes = Zeroizing::new(Storage::new(path.as_ref().to_path_buf()).load()?);
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| CryptoError::Parse(format!("key file is not UTF-8: {e}")))?;
    EncodedKey::parse(text)
}

pub fn write_private_key(path: impl AsRef<Path>, key: &PrivateKey) -> Result<()> {
    write_key_file(path, &encode_private_key(key)?)
}

pub fn write_public_key(path: impl AsRef<Path>, key: &PublicKey) -> Result<()> {
    write_key_file(path, &encode_public_key(key)?)
}

pub fn read_private_key(path: impl AsRef<Path>) -> Result<PrivateKey> {
    decode_private_key(&read_key_file(path)?)
}

pub fn read_public_key(path: impl AsRef<Path>, expected: KeyAlgorithm) -> Result<PublicKey> {
    decode_public_key(&read_key_file(path)?, expected)
}
