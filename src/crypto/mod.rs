//! Cryptographic primitives.
//!
//! Provides key generation and PEM encoding, signatures, authenticated
//! encryption and MACs.

pub mod aead;
pub mod codec;
pub mod hash;
pub mod keys;
pub mod mac;
pub mod sign;

pub use aead::SymmetricCipher;
pub use codec::{
    EncodedKey, KeyLabel, decode_private_key, decode_public_key, decode_rsa_private_key,
    encode_private_key, encode_public_key, encode_public_key_spki, read_key_file,
    read_private_key, read_public_key, write_key_file, write_private_key, write_public_key,
};
pub use hash::HashAlgorithm;
pub use keys::{
    KeyAlgorithm, KeyPair, PrivateKey, PublicKey, RSA_DEFAULT_BITS, RSA_MAX_BITS,
    RSA_MIN_BITS,
};
pub use mac::{compute_mac, verify_mac};
pub use sign::{RejectReason, Signature, Signer, Verification};

/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the Poly1305 authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
