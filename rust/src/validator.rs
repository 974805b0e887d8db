//! Post-load checks over a committed store. A [`Validator`] either insists
//! that its names are present or only checks the ones that are.

use crate::error::{Error, Result};
use crate::store::VariableStore;

#[derive(Debug)]
pub struct Validator<'a> {
    store: &'a VariableStore,
    names: Vec<String>,
}

impl<'a> Validator<'a> {
    /// Rules apply only to names that have a value; absent names pass.
    pub fn if_present<S: AsRef<str>>(store: &'a VariableStore, names: &[S]) -> Self {
        Self {
            store,
            names: names.iter().map(|name| name.as_ref().to_string()).collect(),
        }
    }

    /// Fails with every name that has no value.
    pub fn required(self) -> Result<Self> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| self.store.read(name).is_none())
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(Error::MissingRequired(missing))
        }
    }

    pub fn not_empty(self) -> Result<Self> {
        self.check_each("is empty", |value| !value.trim().is_empty())
    }

    /// Optionally signed decimal digits.
    pub fn is_integer(self) -> Result<Self> {
        self.check_each("is not an integer", |value| {
            let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
    }

    pub fn is_boolean(self) -> Result<Self> {
        self.check_each("is not a boolean", |value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "" | "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off"
            )
        })
    }

    pub fn allowed_values<S: AsRef<str>>(self, allowed: &[S]) -> Result<Self> {
        self.check_each("is not an allowed value", |value| {
            allowed.iter().any(|choice| choice.as_ref() == value)
        })
    }

    /// Values never appear in the error, only the failing names.
    fn check_each<F: Fn(&str) -> bool>(self, reason: &str, check: F) -> Result<Self> {
        let failures: Vec<String> = self
            .names
            .iter()
            .filter(|name| self.store.read(name).is_some_and(|value| !check(value)))
            .map(|name| format!("{name} {reason}"))
            .collect();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::ValidationFailed(failures))
        }
    }
}
