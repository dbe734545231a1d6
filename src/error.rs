use thiserror::Error;

/// Errors returned by every fallible operation of the crate.
///
/// Verification failures are not errors; see [`crate::Verification`].
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGen(String),

    #[error("failed to encode key: {0}")]
    Encode(String),

    #[error("failed to parse key: {0}")]
    Parse(String),

    #[error("wrong key type: expected {expected}, found {found}")]
    WrongKeyType {
        expected: &'static str,
        found: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("cipher initialization failed: {0}")]
    CipherInit(String),

    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("MAC initialization failed: {0}")]
    MacInit(String),

    #[error("authentication failed: wrong secret or corrupted data")]
    Authentication,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
