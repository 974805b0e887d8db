//! JSON loader configuration. Describes where the dotenv files live, how
//! names nest, and where the private key comes from; the key itself is never
//! stored in this file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::crypto::keys::PRIVATE_KEY_ENV;
use crate::crypto::KeyPair;
use crate::dotenvx::Dotenvx;
use crate::pipeline::FailurePolicy;
use crate::scanner::PUBLIC_KEY_SENTINEL;
use crate::sink::EnvironmentSink;
use crate::store::{Layout, VariableStore, DEFAULT_SEPARATOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("no usable key source configured")]
    MissingKeySource,
    #[error(transparent)]
    Loader(#[from] crate::error::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct KeySourceConfig {
    /// Inline base64 public key; overrides whatever the key source provides.
    pub public_key: Option<String>,
    /// Environment variable holding the public key. Defaults to `DOTENV_PUBLIC_KEY`.
    pub public_key_env: Option<String>,
    /// Environment variable holding the base64 private key.
    pub private_key_env: Option<String>,
    /// File containing the base64 private key.
    pub private_key_path: Option<PathBuf>,
}

impl KeySourceConfig {
    /// Key source reading `DOTENV_PRIVATE_KEY` and `DOTENV_PUBLIC_KEY`.
    pub fn from_default_env() -> Self {
        Self {
            private_key_env: Some(PRIVATE_KEY_ENV.to_string()),
            ..Self::default()
        }
    }

    pub fn build_key_pair(&self) -> Result<KeyPair, ConfigError> {
        let pair = if let Some(var) = &self.private_key_env {
            let public_var = self.public_key_env.as_deref().unwrap_or(PUBLIC_KEY_SENTINEL);
            KeyPair::from_env(public_var, var)?
        } else if let Some(path) = &self.private_key_path {
            KeyPair::from_key_file(path)?
        } else {
            return Err(ConfigError::MissingKeySource);
        };

        match &self.public_key {
            Some(public_key) => Ok(KeyPair::new(public_key.as_str(), pair.private_key())),
            None => Ok(pair),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoaderConfig {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default = "default_true")]
    pub short_circuit: bool,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_separator")]
    pub separator: String,
    pub keys: Option<KeySourceConfig>,
    #[serde(default)]
    pub on_decrypt_failure: FailurePolicy,
    #[serde(default = "default_true")]
    pub overwrite_env: bool,
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

pub fn load_config(path: impl AsRef<Path>) -> Result<LoaderConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))
}

/// Loads every configured file, decrypting when keys are configured, mirrors
/// the result into `sink`, and checks the required names.
pub fn load_environment(
    config: &LoaderConfig,
    sink: &mut dyn EnvironmentSink,
) -> Result<VariableStore, ConfigError> {
    let store = Dotenvx::from_config(config)?.load(sink)?;
    Dotenvx::required(&store, config.required.as_slice())?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::{load_config, load_environment, ConfigError, KeySourceConfig};
    use crate::crypto::SealedBoxCodec;
    use crate::error::Error;
    use crate::pipeline::FailurePolicy;
    use crate::sink::MemorySink;
    use crate::store::Layout;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn applies_defaults() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), r#"{"paths": ["."]}"#).expect("write");

        let config = load_config(file.path()).expect("config should load");
        assert!(config.short_circuit);
        assert!(config.overwrite_env);
        assert_eq!(config.layout, Layout::Flat);
        assert_eq!(config.separator, ".");
        assert_eq!(config.on_decrypt_failure, FailurePolicy::Propagate);
        assert!(config.keys.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), "{paths: ").expect("write");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn key_source_needs_private_key() {
        let err = KeySourceConfig::default().build_key_pair().unwrap_err();
        assert!(matches!(err, ConfigError::MissingKeySource));
    }

    #[test]
    fn loads_and_decrypts_hierarchical_environment() {
        let pair = SealedBoxCodec::generate_key_pair().expect("keypair");
        let env_dir = tempdir().expect("temp dir");
        let key_file = env_dir.path().join("private.key");
        fs::write(&key_file, pair.private_key()).expect("write key");
        fs::write(
            env_dir.path().join("multilevel.env"),
            format!(
                "DOTENV_PUBLIC_KEY={}\nDB.DRIVER=pdo_mysql\nDB.PASSWORD=\"{}\"\n",
                pair.public_key(),
                SealedBoxCodec::encrypt("pa$$w0rd", pair.public_key()).expect("encrypt"),
            ),
        )
        .expect("write env");

        let payload = json!({
            "paths": [env_dir.path()],
            "names": ["multilevel.env"],
            "layout": "hierarchical",
            "keys": {"private_key_path": key_file},
            "required": ["DB.DRIVER", "DB.PASSWORD"]
        });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let config = load_config(file.path()).expect("config should load");
        let mut sink = MemorySink::default();
        let store = load_environment(&config, &mut sink).expect("environment should load");
        assert_eq!(store.read("DB.PASSWORD"), Some("pa$$w0rd"));
        assert_eq!(store.read("DB.DRIVER"), Some("pdo_mysql"));
        assert_eq!(sink.values.get("DB.PASSWORD"), Some(&Some("pa$$w0rd".to_string())));
    }

    #[test]
    fn missing_required_names_fail() {
        let env_dir = tempdir().expect("temp dir");
        fs::write(env_dir.path().join(".env"), "A=1\n").expect("write env");
        let payload = json!({"paths": [env_dir.path()], "required": ["A", "B"]});
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let config = load_config(file.path()).expect("config should load");
        let err = load_environment(&config, &mut MemorySink::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Loader(Error::MissingRequired(names)) if names == vec!["B"]));
    }
}
