//! HMAC with a per-call hash algorithm.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::hash::HashAlgorithm;
use crate::error::{CryptoError, Result};

fn mac_tag<M: Mac + KeyInit>(message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        <M as Mac>::new_from_slice(key).map_err(|e| CryptoError::MacInit(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Computes `HMAC-<hash>(key, message)`. The tag is as long as the digest.
pub fn compute_mac(message: &[u8], key: &[u8], hash: HashAlgorithm) -> Result<Vec<u8>> {
    match hash {
        HashAlgorithm::Sha256 => mac_tag::<Hmac<Sha256>>(message, key),
        HashAlgorithm::Sha384 => mac_tag::<Hmac<Sha384>>(message, key),
        HashAlgorithm::Sha512 => mac_tag::<Hmac<Sha512>>(message, key),
    }
}

/// Recomputes the tag and compares it in constant time.
pub fn verify_mac(message: &[u8], key: &[u8], tag: &[u8], hash: HashAlgorithm) -> bool {
    match compute_mac(message, key, hash) {
        Ok(expected) => expected.ct_eq(tag).into(),
        Err(_) => false,
    }
}
