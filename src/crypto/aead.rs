use super::hash::HashAlgorithm;
use super::{KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use getrandom::fill;
use zeroize::Zeroizing;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|e| CryptoError::CipherInit(format!("OS random generator unavailable: {e}")))
}

/// Generate a fresh nonce
fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

/// XChaCha20-Poly1305 keyed by the digest of a caller secret.
///
/// Payloads are laid out as `nonce (24) || ciphertext || tag (16)`. The
/// nonce is sampled from the OS for every call and never supplied by the
/// caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymmetricCipher {
    hash: HashAlgorithm,
}

impl SymmetricCipher {
    pub fn new(hash: HashAlgorithm) -> Self {
        Self { hash }
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Derive the cipher key: the first 32 bytes of the secret's digest
    fn derive_key(&self, secret: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let digest = Zeroizing::new(self.hash.digest(secret));
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&digest[..KEY_LEN]);
        key
    }

    fn cipher(&self, secret: &[u8]) -> XChaCha20Poly1305 {
        let key = self.derive_key(secret);
        XChaCha20Poly1305::new(Key::from_slice(key.as_slice()))
    }

    /// Encrypt plaintext
    pub fn encrypt(&self, plaintext: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher(secret);
        let nonce = generate_nonce()?;

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::CipherInit("encryption failed".into()))?;

        let mut payload = Vec::with_capacity(sealed_len(plaintext.len()));
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(payload)
    }

    /// Decrypt a payload produced by [`SymmetricCipher::encrypt`]
    pub fn decrypt(&self, payload: &[u8], secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if payload.len() < NONCE_LEN {
            return Err(CryptoError::TooShort {
                len: payload.len(),
                min: NONCE_LEN,
            });
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = self.cipher(secret);

        let plaintext = cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)?;
        Ok(Zeroizing::new(plaintext))
    }
}

/// Size of the payload produced for a plaintext of `len` bytes.
pub fn sealed_len(len: usize) -> usize {
    NONCE_LEN + len + TAG_LEN
}
