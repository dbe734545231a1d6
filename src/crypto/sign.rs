//! Signing and verification for RSA (PKCS#1 v1.5) and ECDSA P-521.
//!
//! Both families sign the digest of the message under the signer's
//! [`HashAlgorithm`] and report verification through one
//! [`Verification`] outcome.

use p521::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p521::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use super::hash::HashAlgorithm;
use super::keys::{PrivateKey, PublicKey};
use crate::error::{CryptoError, Result};

/// Size of a P-521 field element in bytes.
const P521_FIELD_LEN: usize = 66;

/// Signature bytes: PKCS#1 v1.5 for RSA, ASN.1 DER for ECDSA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Why a signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Well-formed, but does not match the message and key.
    Mismatch,
    /// Not a valid signature encoding for the key's family.
    Malformed,
}

/// Outcome of a verification. Rejection is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Accept,
    Reject(RejectReason),
}

impl Verification {
    pub fn is_accept(self) -> bool {
        matches!(self, Verification::Accept)
    }
}

/// Signs and verifies under a fixed digest algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signer {
    hash: HashAlgorithm,
}

impl Signer {
    pub fn new(hash: HashAlgorithm) -> Self {
        Self { hash }
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn sign(&self, message: &[u8], key: &PrivateKey) -> Result<Signature> {
        let digest = self.hash.digest(message);

        match key {
            PrivateKey::Rsa(key) => key
                .sign_with_rng(&mut OsRng, self.hash.pkcs1v15(), &digest)
                .map(Signature)
                .map_err(|e| CryptoError::Signing(format!("RSA: {e}"))),
            PrivateKey::Ecdsa(key) => {
                let signing_key = SigningKey::from_bytes(&key.to_bytes())
                    .map_err(|e| CryptoError::Signing(format!("ECDSA: {e}")))?;
                let signature: EcdsaSignature = signing_key
                    .sign_prehash(&ecdsa_prehash(&digest))
                    .map_err(|e| CryptoError::Signing(format!("ECDSA: {e}")))?;
                Ok(Signature(signature.to_der().as_bytes().to_vec()))
            }
        }
    }

    pub fn verify(&self, message: &[u8], signature: &Signature, key: &PublicKey) -> Verification {
        let digest = self.hash.digest(message);

        match key {
            PublicKey::Rsa(key) => {
                match key.verify(self.hash.pkcs1v15(), &digest, signature.as_bytes()) {
                    Ok(()) => Verification::Accept,
                    Err(_) => Verification::Reject(RejectReason::Mismatch),
                }
            }
            PublicKey::Ecdsa(key) => {
                let Ok(signature) = EcdsaSignature::from_der(signature.as_bytes()) else {
                    return Verification::Reject(RejectReason::Malformed);
                };
                let Ok(verifying_key) = VerifyingKey::from_affine(*key.as_affine()) else {
                    return Verification::Reject(RejectReason::Malformed);
                };
                match verifying_key.verify_prehash(&ecdsa_prehash(&digest), &signature) {
                    Ok(()) => Verification::Accept,
                    Err(_) => Verification::Reject(RejectReason::Mismatch),
                }
            }
        }
    }
}

/// Left-pads the digest to the field size so it is read as the same integer
/// standard ECDSA derives from a digest shorter than the group order.
fn ecdsa_prehash(digest: &[u8]) -> [u8; P521_FIELD_LEN] {
    let mut prehash = [0u8; P521_FIELD_LEN];
    prehash[P521_FIELD_LEN - digest.len()..].copy_from_slice(digest);
    prehash
}
