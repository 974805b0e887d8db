//! Steps between parsing and committing. A [`DecryptorMiddleware`] finds
//! sealed values in the parsed entries, hands their ciphertexts to a
//! [`Decryptor`], and splices the plaintexts back so the commit step only
//! ever sees resolved values.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::crypto::{ciphertext_payload, KeyPair, SealedBoxCodec};
use crate::error::{Error, Result};
use crate::parser::Entry;
use crate::scanner::{collect_encrypted_values, is_encrypted, PUBLIC_KEY_SENTINEL};
use crate::sink::{EnvironmentSink, NullSink};
use crate::store::VariableStore;

pub trait Middleware {
    fn process(&self, entries: Vec<Entry>) -> Result<Vec<Entry>>;
}

/// Maps each ciphertext payload to its plaintext for the given public key.
/// Implementations may call out to a remote key holder; the call is blocking.
pub trait Decryptor {
    fn decrypt(&self, public_key: &str, ciphertexts: &IndexSet<String>) -> Result<HashMap<String, String>>;
}

impl<F> Decryptor for F
where
    F: Fn(&str, &IndexSet<String>) -> Result<HashMap<String, String>>,
{
    fn decrypt(&self, public_key: &str, ciphertexts: &IndexSet<String>) -> Result<HashMap<String, String>> {
        self(public_key, ciphertexts)
    }
}

/// Opens ciphertexts locally with a held key pair.
#[derive(Debug)]
pub struct KeyPairDecryptor {
    key_pair: KeyPair,
}

impl KeyPairDecryptor {
    pub fn new(key_pair: KeyPair) -> Self {
        Self { key_pair }
    }
}

impl Decryptor for KeyPairDecryptor {
    fn decrypt(&self, public_key: &str, ciphertexts: &IndexSet<String>) -> Result<HashMap<String, String>> {
        if public_key != self.key_pair.public_key() {
            return Err(Error::DecryptionFailed(
                "values were sealed to a different public key".to_string(),
            ));
        }
        ciphertexts
            .iter()
            .map(|payload| Ok((payload.clone(), SealedBoxCodec::open_payload(payload, &self.key_pair)?)))
            .collect()
    }
}

/// What a [`DecryptorMiddleware`] does when decryption fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Propagate,
    /// Log the failure and hand the entries on unresolved.
    PassThrough,
}

pub struct DecryptorMiddleware<D> {
    decryptor: D,
    policy: FailurePolicy,
}

impl<D: Decryptor> DecryptorMiddleware<D> {
    pub fn new(decryptor: D) -> Self {
        Self {
            decryptor,
            policy: FailurePolicy::Propagate,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `Ok(None)` when the entries hold nothing to decrypt.
    fn resolve(&self, entries: &[Entry]) -> Result<Option<Vec<Entry>>> {
        let mut scratch = VariableStore::flat();
        commit(entries, &mut scratch, &mut NullSink)?;

        let Some(public_key) = is_encrypted(&scratch, None)? else {
            return Ok(None);
        };
        let ciphertexts = collect_encrypted_values(&scratch);
        debug!(count = ciphertexts.len(), "collected encrypted values");

        let decrypted = self.decryptor.decrypt(&public_key, &ciphertexts)?;
        let (resolved, still_encrypted) = replace_encrypted_entries(entries, &decrypted);
        if still_encrypted {
            // Only the surviving value per name matters to the commit step.
            let mut committed = VariableStore::flat();
            commit(&resolved, &mut committed, &mut NullSink)?;
            let remaining = collect_encrypted_values(&committed).len();
            if remaining > 0 {
                return Err(Error::UnresolvedCiphertexts { remaining });
            }
        }
        Ok(Some(resolved))
    }
}

impl<D: Decryptor> Middleware for DecryptorMiddleware<D> {
    fn process(&self, entries: Vec<Entry>) -> Result<Vec<Entry>> {
        match self.resolve(&entries) {
            Ok(Some(resolved)) => Ok(resolved),
            Ok(None) => Ok(entries),
            Err(err) => match self.policy {
                FailurePolicy::Propagate => Err(err),
                FailurePolicy::PassThrough => {
                    warn!(error = %err, "decryption failed, passing entries through unresolved");
                    Ok(entries)
                }
            },
        }
    }
}

/// Entry-sequence counterpart of
/// [`replace_encrypted_values`](crate::scanner::replace_encrypted_values).
/// The sentinel entry is never touched. The flag is true when some entry
/// still carries ciphertext.
pub fn replace_encrypted_entries(
    entries: &[Entry],
    decrypted_by_ciphertext: &HashMap<String, String>,
) -> (Vec<Entry>, bool) {
    let mut still_encrypted = false;
    let resolved = entries
        .iter()
        .map(|entry| {
            if entry.name == PUBLIC_KEY_SENTINEL {
                return entry.clone();
            }
            let Some(payload) = entry.value.as_deref().and_then(ciphertext_payload) else {
                return entry.clone();
            };
            match decrypted_by_ciphertext.get(payload) {
                Some(plaintext) => Entry::new(entry.name.clone(), plaintext.clone()),
                None => {
                    still_encrypted = true;
                    entry.clone()
                }
            }
        })
        .collect();
    (resolved, still_encrypted)
}

/// Writes entries into `store` and mirrors them into `sink`. Entries without
/// a value are removed from both. Returns the number of entries committed.
///
/// Every entry is checked against the sink first; a rejected entry leaves
/// both the store and the sink untouched.
pub fn commit(entries: &[Entry], store: &mut VariableStore, sink: &mut dyn EnvironmentSink) -> Result<usize> {
    for entry in entries {
        sink.check(&entry.name, entry.value.as_deref())?;
    }
    for entry in entries {
        match &entry.value {
            Some(value) => {
                sink.set(&entry.name, value)?;
                store.write(&entry.name, value.as_str());
            }
            None => {
                sink.clear(&entry.name)?;
                store.delete(&entry.name);
            }
        }
    }
    Ok(entries.len())
}
