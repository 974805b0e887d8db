//! Sealed-box cryptography for configuration values. `sealed_box` holds the
//! stateless codec and the `encrypted:` marker protocol, `keys` holds the
//! base64 key pair that callers carry around.

pub mod keys;
pub mod sealed_box;

pub use keys::KeyPair;
pub use sealed_box::{ciphertext_payload, is_encrypted_value, SealedBoxCodec, ENCRYPTED_MARKER};
