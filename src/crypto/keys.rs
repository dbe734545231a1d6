//! Asymmetric key types and key pair generation.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{CryptoError, Result};

/// Default RSA modulus size in bits.
pub const RSA_DEFAULT_BITS: usize = 4096;
/// Smallest RSA modulus accepted by [`KeyPair::generate_rsa`].
pub const RSA_MIN_BITS: usize = 1024;
/// Largest RSA modulus whose public key can be decoded again.
pub const RSA_MAX_BITS: usize = 4096;

/// Key family. ECDSA keys always live on NIST P-521.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl KeyAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ecdsa => "ECDSA P-521",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(KeyAlgorithm::Rsa),
            "ecdsa" | "ec" | "p521" => Ok(KeyAlgorithm::Ecdsa),
            other => Err(format!("unknown key algorithm '{other}'")),
        }
    }
}

/// A private key of either family.
///
/// Both inner key types wipe their secret scalars on drop.
#[derive(Clone, PartialEq)]
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    Ecdsa(p521::SecretKey),
}

impl PrivateKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKey::Rsa(_) => KeyAlgorithm::Rsa,
            PrivateKey::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(RsaPublicKey::from(key)),
            PrivateKey::Ecdsa(key) => PublicKey::Ecdsa(key.public_key()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey")
            .field(&self.algorithm())
            .finish_non_exhaustive()
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(key: RsaPrivateKey) -> Self {
        PrivateKey::Rsa(key)
    }
}

impl From<p521::SecretKey> for PrivateKey {
    fn from(key: p521::SecretKey) -> Self {
        PrivateKey::Ecdsa(key)
    }
}

/// A public key of either family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ecdsa(p521::PublicKey),
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Rsa(_) => KeyAlgorithm::Rsa,
            PublicKey::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(key: RsaPublicKey) -> Self {
        PublicKey::Rsa(key)
    }
}

impl From<p521::PublicKey> for PublicKey {
    fn from(key: p521::PublicKey) -> Self {
        PublicKey::Ecdsa(key)
    }
}

/// A private key together with the public key derived from it.
#[derive(Debug, Clone)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generates an RSA key pair with a `bits`-bit modulus.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if bits < RSA_MIN_BITS {
            return Err(CryptoError::KeyGen(format!(
                "RSA modulus of {bits} bits is below the minimum of {RSA_MIN_BITS}"
            )));
        }
        // public keys above this size do not decode
        if bits > RSA_MAX_BITS {
            return Err(CryptoError::KeyGen(format!(
                "RSA modulus of {bits} bits is above the maximum of {RSA_MAX_BITS}"
            )));
        }

        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGen(format!("RSA: {e}")))?;
        tracing::debug!(bits, "generated RSA key pair");

        Ok(Self::from_private(PrivateKey::Rsa(key)))
    }

    /// Generates an ECDSA key pair on P-521.
    pub fn generate_ecdsa() -> Result<Self> {
        let key = p521::SecretKey::random(&mut OsRng);
        tracing::debug!("generated ECDSA P-521 key pair");

        Ok(Self::from_private(PrivateKey::Ecdsa(key)))
    }

    /// Builds a pair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.private.algorithm()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::OnceLock;

    /// 2048-bit RSA pair shared by every test in the crate.
    pub(crate) fn rsa_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate_rsa(2048).unwrap())
    }

    /// A second RSA pair, for wrong-key tests.
    pub(crate) fn other_rsa_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate_rsa(2048).unwrap())
    }

    #[test]
    fn rsa_public_key_is_derived() {
        let pair = rsa_pair();
        assert_eq!(pair.algorithm(), KeyAlgorithm::Rsa);
        assert_eq!(&pair.private_key().public_key(), pair.public_key());
    }

    #[test]
    fn ecdsa_public_key_is_derived() {
        let pair = KeyPair::generate_ecdsa().unwrap();
        assert_eq!(pair.algorithm(), KeyAlgorithm::Ecdsa);
        assert_eq!(pair.public_key().algorithm(), KeyAlgorithm::Ecdsa);
        assert_eq!(&pair.private_key().public_key(), pair.public_key());
    }

    #[test]
    fn ecdsa_keys_are_fresh() {
        let a = KeyPair::generate_ecdsa().unwrap();
        let b = KeyPair::generate_ecdsa().unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn rsa_below_minimum_fails() {
        match KeyPair::generate_rsa(512) {
            Err(CryptoError::KeyGen(msg)) => assert!(msg.contains("512")),
            other => panic!("expected KeyGen error, got: {other:?}"),
        }
    }

    #[test]
    fn rsa_above_maximum_fails() {
        for bits in [RSA_MAX_BITS + 8, 8192] {
            match KeyPair::generate_rsa(bits) {
                Err(CryptoError::KeyGen(msg)) => assert!(msg.contains("maximum")),
                other => panic!("expected KeyGen error, got: {other:?}"),
            }
        }
    }

    #[test]
    fn default_size_is_within_bounds() {
        assert!((RSA_MIN_BITS..=RSA_MAX_BITS).contains(&RSA_DEFAULT_BITS));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let pair = KeyPair::generate_ecdsa().unwrap();
        let out = format!("{:?}", pair.private_key());
        assert_eq!(out, "PrivateKey(Ecdsa, ..)");
    }

    #[test]
    fn parse_algorithm_names() {
        assert_eq!("RSA".parse::<KeyAlgorithm>(), Ok(KeyAlgorithm::Rsa));
        assert_eq!("ecdsa".parse::<KeyAlgorithm>(), Ok(KeyAlgorithm::Ecdsa));
        assert!("dsa".parse::<KeyAlgorithm>().is_err());
    }
}
