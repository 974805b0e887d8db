//! Base64 Curve25519 key pairs. The private half lives in a `Zeroizing`
//! buffer and is never printed by `Debug`.

use std::fmt;
use std::fs;
use std::path::Path;

use crypto_box::{PublicKey, SecretKey};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::sealed_box::SealedBoxCodec;
use crate::error::{Error, Result};

pub(crate) const KEY_LEN: usize = 32;

/// Default environment variable carrying the private key.
pub const PRIVATE_KEY_ENV: &str = "DOTENV_PRIVATE_KEY";

/// Receiver key pair, both halves base64 encoded with the standard padded alphabet.
pub struct KeyPair {
    public_key: String,
    private_key: Zeroizing<String>,
}

impl KeyPair {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: Zeroizing::new(private_key.into()),
        }
    }

    /// Rebuilds a pair from the private half alone by deriving its public key.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let secret = secret_key_from_b64(private_key.trim())?;
        let public_key = SealedBoxCodec::base64_encode(secret.public_key().as_bytes());
        Ok(Self::new(public_key, private_key.trim()))
    }

    /// Reads the private key from `private_var`. The public key comes from
    /// `public_var` when that is set and non-empty, otherwise it is derived.
    pub fn from_env(public_var: &str, private_var: &str) -> Result<Self> {
        let private_key = Zeroizing::new(
            std::env::var(private_var).map_err(|e| Error::KeySourceUnreadable(format!("{private_var}: {e}")))?,
        );
        match std::env::var(public_var) {
            Ok(public_key) if !public_key.trim().is_empty() => {
                Ok(Self::new(public_key.trim(), private_key.trim()))
            }
            _ => Self::from_private_key(&private_key),
        }
    }

    /// Reads a base64 private key from disk and derives the public half.
    pub fn from_key_file(path: &Path) -> Result<Self> {
        let content = Zeroizing::new(
            fs::read_to_string(path).map_err(|e| Error::KeySourceUnreadable(format!("{e}")))?,
        );
        Self::from_private_key(&content)
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub(crate) fn secret_key(&self) -> Result<SecretKey> {
        secret_key_from_b64(&self.private_key)
    }

    pub(crate) fn decoded_public_key(&self) -> Result<PublicKey> {
        decode_public_key(&self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

pub(crate) fn decode_public_key(encoded: &str) -> Result<PublicKey> {
    let bytes = decode_key(encoded)?;
    Ok(PublicKey::from(bytes))
}

fn secret_key_from_b64(encoded: &str) -> Result<SecretKey> {
    let mut bytes = decode_key(encoded)?;
    let secret = SecretKey::from(bytes);
    bytes.zeroize();
    Ok(secret)
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN]> {
    let mut decoded = SealedBoxCodec::base64_decode(encoded)?;
    if decoded.len() != KEY_LEN {
        let len = decoded.len();
        decoded.zeroize();
        return Err(Error::InvalidKey(format!("expected {KEY_LEN} bytes, got {len}")));
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&decoded);
    decoded.zeroize();
    Ok(key)
}
