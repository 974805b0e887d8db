//! Anonymous sealed-box encryption (X25519 + XSalsa20-Poly1305) for single
//! configuration values. Ciphertexts travel as `encrypted:` followed by the
//! standard padded base64 of the sealed box, so they can sit next to
//! plaintext values in the same dotenv file.

use base64ct::{Base64, Encoding};
use crypto_box::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::crypto::keys::{decode_public_key, KeyPair, KEY_LEN};
use crate::error::{Error, Result};

/// Literal prefix carried by every encrypted value.
pub const ENCRYPTED_MARKER: &str = "encrypted:";

/// Returns true when `value` carries the `encrypted:` marker (case-sensitive).
pub fn is_encrypted_value(value: &str) -> bool {
    value.starts_with(ENCRYPTED_MARKER)
}

/// Strips the marker, returning the base64 ciphertext payload.
pub fn ciphertext_payload(value: &str) -> Option<&str> {
    value.strip_prefix(ENCRYPTED_MARKER)
}

/// Stateless codec; every operation is an associated function.
pub struct SealedBoxCodec;

impl SealedBoxCodec {
    /// Creates a fresh receiver key pair from the operating system RNG.
    pub fn generate_key_pair() -> Result<KeyPair> {
        let mut seed = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| Error::CryptoUnavailable(format!("{e}")))?;
        let secret = SecretKey::from(seed);
        seed.zeroize();

        let public_key = Self::base64_encode(secret.public_key().as_bytes());
        let mut secret_bytes = secret.to_bytes();
        let private_key = Self::base64_encode(&secret_bytes);
        secret_bytes.zeroize();
        Ok(KeyPair::new(public_key, private_key))
    }

    /// Seals `plaintext` to `public_key`. Two calls with the same input give
    /// different ciphertexts because every box uses a fresh ephemeral key.
    pub fn encrypt(plaintext: &str, public_key: &str) -> Result<String> {
        let receiver = decode_public_key(public_key)?;
        let sealed = receiver
            .seal(&mut OsRng, plaintext.as_bytes())
            .map_err(|e| Error::CryptoUnavailable(format!("sealing failed: {e}")))?;
        Ok(format!("{ENCRYPTED_MARKER}{}", Self::base64_encode(&sealed)))
    }

    /// Opens a marked value. Unmarked values are returned unchanged.
    pub fn decrypt(value: &str, key_pair: &KeyPair) -> Result<String> {
        match ciphertext_payload(value) {
            Some(payload) => Self::open_payload(payload, key_pair),
            None => Ok(value.to_string()),
        }
    }

    /// Opens a marker-stripped base64 payload.
    pub fn open_payload(payload: &str, key_pair: &KeyPair) -> Result<String> {
        let ciphertext = Base64::decode_vec(payload)
            .map_err(|_| Error::DecryptionFailed("ciphertext is not valid base64".to_string()))?;

        let secret = key_pair.secret_key()?;
        // The box nonce is derived from the receiver public key.
        if secret.public_key().as_bytes() != key_pair.decoded_public_key()?.as_bytes() {
            return Err(Error::DecryptionFailed(
                "public key does not belong to the private key".to_string(),
            ));
        }

        let plaintext = secret
            .unseal(&ciphertext)
            .map_err(|_| Error::DecryptionFailed("ciphertext did not authenticate".to_string()))?;
        String::from_utf8(plaintext).map_err(|err| {
            err.into_bytes().zeroize();
            Error::DecryptionFailed("plaintext is not valid UTF-8".to_string())
        })
    }

    /// Padded standard alphabet, constant-time with respect to the input bytes.
    pub fn base64_encode(bytes: &[u8]) -> String {
        Base64::encode_string(bytes)
    }

    pub fn base64_decode(encoded: &str) -> Result<Vec<u8>> {
        Base64::decode_vec(encoded).map_err(|e| Error::Base64DecodeFailed(format!("{e}")))
    }
}
