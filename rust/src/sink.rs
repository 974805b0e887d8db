//! Destinations that mirror committed entries outside the store, such as the
//! process environment.

use indexmap::IndexMap;

use crate::error::{Error, Result};

pub trait EnvironmentSink {
    /// Rejects an entry the sink could not store. `value` is `None` for a
    /// cleared name. Called for every entry before any write.
    fn check(&self, _name: &str, _value: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()>;
    fn clear(&mut self, name: &str) -> Result<()>;
}

/// Writes into the process environment. With `overwrite` off, variables that
/// already exist are left alone.
#[derive(Debug, Clone, Copy)]
pub struct ProcessEnvSink {
    pub overwrite: bool,
}

impl ProcessEnvSink {
    pub fn mutable() -> Self {
        Self { overwrite: true }
    }

    pub fn immutable() -> Self {
        Self { overwrite: false }
    }
}

impl EnvironmentSink for ProcessEnvSink {
    // The platform environment cannot hold NUL anywhere, or `=` in a name.
    fn check(&self, name: &str, value: Option<&str>) -> Result<()> {
        if name.is_empty() || name.contains(['=', '\0']) || value.is_some_and(|v| v.contains('\0')) {
            return Err(Error::UnrepresentableInEnvironment {
                name: name.escape_default().to_string(),
            });
        }
        Ok(())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.check(name, Some(value))?;
        if self.overwrite || std::env::var_os(name).is_none() {
            std::env::set_var(name, value);
        }
        Ok(())
    }

    fn clear(&mut self, name: &str) -> Result<()> {
        self.check(name, None)?;
        if self.overwrite {
            std::env::remove_var(name);
        }
        Ok(())
    }
}

/// Records the last value written per name; `None` marks a cleared name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    pub values: IndexMap<String, Option<String>>,
}

impl EnvironmentSink for MemorySink {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), Some(value.to_string()));
        Ok(())
    }

    fn clear(&mut self, name: &str) -> Result<()> {
        self.values.insert(name.to_string(), None);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EnvironmentSink for NullSink {
    fn set(&mut self, _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }
}
