//! Crate-wide error type. Messages never include secret values or private key
//! material, only names, counts, and the failing stage.

use thiserror::Error;

/// Result alias used throughout the loader.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("encrypted values found but no DOTENV_PUBLIC_KEY is set")]
    MissingPublicKey,
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("sealed box primitive unavailable: {0}")]
    CryptoUnavailable(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
    #[error("path separator must not be empty")]
    InvalidSeparator,
    #[error("path segment `{segment}` contains the separator")]
    SeparatorInSegment { segment: String },
    #[error("{0}")]
    InvalidPath(String),
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("{remaining} encrypted value(s) left unresolved after decryption")]
    UnresolvedCiphertexts { remaining: usize },
    #[error("decryptor failed: {0}")]
    Decryptor(String),
    #[error("required variable(s) missing: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
    #[error("variable `{name}` cannot be stored in the process environment")]
    UnrepresentableInEnvironment { name: String },
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error("key source unreadable: {0}")]
    KeySourceUnreadable(String),
}
