//! Encryption-aware dotenv loading. Values may be plain text or sealed-box
//! ciphertext tagged `encrypted:`; the loader finds them at any nesting depth,
//! decrypts them locally or through a caller-supplied decryptor, and commits
//! the result into a flat or hierarchical variable store.

pub mod config;
pub mod crypto;
pub mod dotenvx;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod sink;
pub mod source;
pub mod store;
pub mod validator;

pub use dotenvx::Dotenvx;
pub use error::{Error, Result};
