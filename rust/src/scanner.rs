//! Recursive scans over a [`VariableStore`] that find, collect, decrypt, or
//! substitute `encrypted:` values at any nesting depth. Siblings are visited
//! in insertion order, depth first, so repeated scans are reproducible.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::debug;

use crate::crypto::{ciphertext_payload, is_encrypted_value, KeyPair, SealedBoxCodec};
use crate::error::{Error, Result};
use crate::store::node::Branch;
use crate::store::{VariableNode, VariableStore};

/// Reserved name whose value is the public key every sibling ciphertext was
/// sealed to.
pub const PUBLIC_KEY_SENTINEL: &str = "DOTENV_PUBLIC_KEY";

/// Calls `visit(path, key, value)` for every leaf. `path` ends with `key`.
fn visit_leaves<'a, F>(level: &'a Branch, path: &mut Vec<&'a str>, visit: &mut F)
where
    F: FnMut(&[&'a str], &'a str, &'a str),
{
    for (key, node) in level {
        path.push(key.as_str());
        match node {
            VariableNode::Leaf(value) => visit(path.as_slice(), key.as_str(), value.as_str()),
            VariableNode::Branch(children) => visit_leaves(children, path, visit),
        }
        path.pop();
    }
}

fn owned_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|segment| segment.to_string()).collect()
}

/// Returns the public key the store's ciphertexts were sealed to, or `None`
/// when nothing is encrypted.
///
/// A non-empty `public_key_hint` is the initial candidate; otherwise the first
/// non-empty sentinel leaf wins. Ciphertext without any candidate fails with
/// [`Error::MissingPublicKey`].
pub fn is_encrypted(store: &VariableStore, public_key_hint: Option<&str>) -> Result<Option<String>> {
    let mut candidate = public_key_hint
        .filter(|key| !key.is_empty())
        .map(str::to_string);
    let mut has_encrypted = false;

    visit_leaves(store.root(), &mut Vec::new(), &mut |_, key, value| {
        if key == PUBLIC_KEY_SENTINEL {
            if candidate.is_none() && !value.is_empty() {
                candidate = Some(value.to_string());
            }
        } else if is_encrypted_value(value) {
            has_encrypted = true;
        }
    });

    if !has_encrypted {
        return Ok(None);
    }
    candidate.map(Some).ok_or(Error::MissingPublicKey)
}

/// Marker-stripped payloads of every encrypted leaf except the sentinel,
/// deduplicated in order of first occurrence.
pub fn collect_encrypted_values(store: &VariableStore) -> IndexSet<String> {
    let mut payloads = IndexSet::new();
    visit_leaves(store.root(), &mut Vec::new(), &mut |_, key, value| {
        if key == PUBLIC_KEY_SENTINEL {
            return;
        }
        if let Some(payload) = ciphertext_payload(value) {
            payloads.insert(payload.to_string());
        }
    });
    payloads
}

/// Decrypts every encrypted leaf except the sentinel. All leaves are opened
/// before any is written back, so a failure leaves the store untouched.
pub fn decrypt_in_place(store: &mut VariableStore, key_pair: &KeyPair) -> Result<()> {
    let mut pending = Vec::new();
    visit_leaves(store.root(), &mut Vec::new(), &mut |path, key, value| {
        if key != PUBLIC_KEY_SENTINEL && is_encrypted_value(value) {
            pending.push((owned_path(path), value.to_string()));
        }
    });

    let decrypted = pending
        .into_iter()
        .map(|(path, value)| Ok((path, SealedBoxCodec::decrypt(&value, key_pair)?)))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = decrypted.len(), "decrypted values in place");
    for (path, plaintext) in decrypted {
        store.write_at(path.as_slice(), plaintext);
    }
    Ok(())
}

/// Substitutes encrypted leaves whose payload appears in
/// `decrypted_by_ciphertext`. Returns true when some leaf is still encrypted.
pub fn replace_encrypted_values(
    store: &mut VariableStore,
    decrypted_by_ciphertext: &HashMap<String, String>,
) -> bool {
    let mut still_encrypted = false;
    let mut replacements = Vec::new();
    visit_leaves(store.root(), &mut Vec::new(), &mut |path, key, value| {
        if key == PUBLIC_KEY_SENTINEL {
            return;
        }
        if let Some(payload) = ciphertext_payload(value) {
            match decrypted_by_ciphertext.get(payload) {
                Some(plaintext) => replacements.push((owned_path(path), plaintext.clone())),
                None => still_encrypted = true,
            }
        }
    });

    for (path, plaintext) in replacements {
        store.write_at(path.as_slice(), plaintext);
    }
    still_encrypted
}
