//! Loader facade: read a source, parse it, run middleware, commit into a store.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{ConfigError, LoaderConfig};
use crate::error::{Error, Result};
use crate::parser::{EntryParser, LineParser};
use crate::pipeline::{commit, Decryptor, DecryptorMiddleware, KeyPairDecryptor, Middleware};
use crate::sink::{EnvironmentSink, NullSink};
use crate::source::{FileSource, SourceReader, StringSource};
use crate::store::{Layout, VariableStore, DEFAULT_SEPARATOR};
use crate::validator::Validator;

pub struct Dotenvx {
    source: Box<dyn SourceReader>,
    parser: Box<dyn EntryParser>,
    layout: Layout,
    separator: String,
    middlewares: Vec<Box<dyn Middleware>>,
}

impl Dotenvx {
    /// Flat loader over any source and parser.
    pub fn new(source: impl SourceReader + 'static, parser: impl EntryParser + 'static) -> Self {
        Self {
            source: Box::new(source),
            parser: Box::new(parser),
            layout: Layout::Flat,
            separator: DEFAULT_SEPARATOR.to_string(),
            middlewares: Vec::new(),
        }
    }

    /// Flat loader reading `names` (default `.env`) under each of `paths`.
    pub fn create(paths: Vec<PathBuf>, names: Vec<String>, short_circuit: bool) -> Self {
        Self::new(FileSource::new(paths, names, short_circuit), LineParser)
    }

    /// Builds the loader described by a config file, including a local
    /// decryptor when a key source is configured.
    pub fn from_config(config: &LoaderConfig) -> std::result::Result<Self, ConfigError> {
        let mut dotenvx = Self::create(config.paths.clone(), config.names.clone(), config.short_circuit)
            .with_layout(config.layout, &config.separator)?;
        if let Some(keys) = &config.keys {
            let decryptor = KeyPairDecryptor::new(keys.build_key_pair()?);
            dotenvx.add_middleware(DecryptorMiddleware::new(decryptor).with_policy(config.on_decrypt_failure));
        }
        Ok(dotenvx)
    }

    pub fn with_layout(mut self, layout: Layout, separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(Error::InvalidSeparator);
        }
        self.layout = layout;
        self.separator = separator.to_string();
        Ok(self)
    }

    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Parses content into a flat store without touching any environment.
    pub fn parse(content: &str) -> Result<VariableStore> {
        Self::new(StringSource(content.to_string()), LineParser).load(&mut NullSink)
    }

    pub fn load(&self, sink: &mut dyn EnvironmentSink) -> Result<VariableStore> {
        self.run(None, sink)
    }

    /// Like [`load`](Self::load), but a source that cannot be found yields an
    /// empty store.
    pub fn safe_load(&self, sink: &mut dyn EnvironmentSink) -> Result<VariableStore> {
        match self.load(sink) {
            Err(Error::InvalidPath(reason)) => {
                debug!(%reason, "no environment file loaded");
                self.empty_store()
            }
            other => other,
        }
    }

    /// Loads with an extra decryption step for this call only. Decryptor
    /// failures propagate.
    pub fn load_encrypted<D: Decryptor>(&self, decryptor: D, sink: &mut dyn EnvironmentSink) -> Result<VariableStore> {
        let middleware = DecryptorMiddleware::new(decryptor);
        self.run(Some(&middleware), sink)
    }

    pub fn safe_load_encrypted<D: Decryptor>(
        &self,
        decryptor: D,
        sink: &mut dyn EnvironmentSink,
    ) -> Result<VariableStore> {
        match self.load_encrypted(decryptor, sink) {
            Err(Error::InvalidPath(reason)) => {
                debug!(%reason, "no environment file loaded");
                self.empty_store()
            }
            other => other,
        }
    }

    /// Fails with every name in `names` that has no value in `store`. The
    /// returned validator applies further rules to the same names.
    pub fn required<'a, S: AsRef<str>>(store: &'a VariableStore, names: &[S]) -> Result<Validator<'a>> {
        Validator::if_present(store, names).required()
    }

    /// Validator whose rules only check the names that have a value.
    pub fn if_present<'a, S: AsRef<str>>(store: &'a VariableStore, names: &[S]) -> Validator<'a> {
        Validator::if_present(store, names)
    }

    fn empty_store(&self) -> Result<VariableStore> {
        VariableStore::with_layout(self.layout, &self.separator)
    }

    fn run(&self, extra: Option<&dyn Middleware>, sink: &mut dyn EnvironmentSink) -> Result<VariableStore> {
        let content = self.source.read()?;
        let mut entries = self.parser.parse(&content)?;
        debug!(count = entries.len(), "parsed entries");

        for middleware in &self.middlewares {
            entries = middleware.process(entries)?;
        }
        if let Some(middleware) = extra {
            entries = middleware.process(entries)?;
        }

        let mut store = self.empty_store()?;
        let count = commit(&entries, &mut store, sink)?;
        info!(count, layout = ?self.layout, "loaded environment");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::Dotenvx;
    use crate::crypto::SealedBoxCodec;
    use crate::error::{Error, Result};
    use crate::parser::LineParser;
    use crate::pipeline::KeyPairDecryptor;
    use crate::scanner::PUBLIC_KEY_SENTINEL;
    use crate::sink::{MemorySink, ProcessEnvSink};
    use crate::source::StringSource;
    use crate::store::Layout;
    use indexmap::IndexSet;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn fake_decrypt(_public_key: &str, ciphertexts: &IndexSet<String>) -> Result<HashMap<String, String>> {
        Ok(ciphertexts
            .iter()
            .map(|c| (c.clone(), c.to_lowercase()))
            .collect())
    }

    #[test]
    fn loads_encrypted_flat_file() {
        let pair = SealedBoxCodec::generate_key_pair().expect("keypair");
        let seal = |value: &str| SealedBoxCodec::encrypt(value, pair.public_key()).expect("encrypt");
        let content = format!(
            "{PUBLIC_KEY_SENTINEL}=\"{}\"\nDB_DRIVER=pdo_mysql\nDB_HOST=\"{}\"\nDB_PASSWORD=\"{}\"\nSPACED=\"with spaces\"\nNULL=\n",
            pair.public_key(),
            seal("localhost"),
            seal("pa$$w0rd"),
        );
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join(".env"), content).expect("write");
        let public_key = pair.public_key().to_string();

        let dotenvx = Dotenvx::create(vec![dir.path().to_path_buf()], vec![], true);
        let mut sink = MemorySink::default();
        let store = dotenvx
            .load_encrypted(KeyPairDecryptor::new(pair), &mut sink)
            .expect("load");

        assert_eq!(store.read("DB_DRIVER"), Some("pdo_mysql"));
        assert_eq!(store.read("DB_HOST"), Some("localhost"));
        assert_eq!(store.read("DB_PASSWORD"), Some("pa$$w0rd"));
        assert_eq!(store.read("NULL"), Some(""));
        assert_eq!(store.read(PUBLIC_KEY_SENTINEL), Some(public_key.as_str()));
        assert_eq!(sink.values.len(), 6);
        assert_eq!(sink.values.get("DB_PASSWORD"), Some(&Some("pa$$w0rd".to_string())));
    }

    #[test]
    fn loads_encrypted_hierarchical_source() {
        let content = "DOTENV_PUBLIC_KEY=PUB\nDB.DRIVER=pdo_mysql\nDB.HOST=encrypted:LOCALHOST\nDB.USER=encrypted:USERNAME\n";
        let dotenvx = Dotenvx::new(StringSource(content.to_string()), LineParser)
            .with_layout(Layout::Hierarchical, ".")
            .expect("layout");
        let store = dotenvx
            .load_encrypted(fake_decrypt, &mut MemorySink::default())
            .expect("load");

        let tree = serde_json::to_value(store.materialize()).expect("serialize");
        assert_eq!(
            tree,
            json!({
                "DOTENV_PUBLIC_KEY": "PUB",
                "DB": {"DRIVER": "pdo_mysql", "HOST": "localhost", "USER": "username"}
            })
        );
    }

    #[test]
    fn encrypted_source_without_decryption_keeps_ciphertext() {
        let store = Dotenvx::parse("DOTENV_PUBLIC_KEY=PUB\nDB_HOST=encrypted:XYZ").expect("parse");
        assert_eq!(store.read("DB_HOST"), Some("encrypted:XYZ"));
    }

    #[test]
    fn missing_files_fail_unless_safe() {
        let dir = tempdir().expect("temp dir");
        let dotenvx = Dotenvx::create(vec![dir.path().to_path_buf()], vec![], true);

        let err = dotenvx.load(&mut MemorySink::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));

        let store = dotenvx.safe_load(&mut MemorySink::default()).expect("safe load");
        assert!(store.is_empty());
        let store = dotenvx
            .safe_load_encrypted(fake_decrypt, &mut MemorySink::default())
            .expect("safe load");
        assert!(store.is_empty());
    }

    #[test]
    fn decryption_failure_commits_nothing() {
        let failing = |_: &str, _: &IndexSet<String>| -> Result<HashMap<String, String>> {
            Err(Error::Decryptor("offline".to_string()))
        };
        let dotenvx = Dotenvx::new(
            StringSource("DOTENV_PUBLIC_KEY=PUB\nDB_HOST=encrypted:XYZ\nPLAIN=1".to_string()),
            LineParser,
        );
        let mut sink = MemorySink::default();
        assert!(dotenvx.load_encrypted(failing, &mut sink).is_err());
        assert!(sink.values.is_empty());
    }

    #[test]
    fn required_reports_missing_names() {
        let store = Dotenvx::parse("A=1\nB=").expect("parse");
        assert!(Dotenvx::required(&store, &["A", "B"]).is_ok());

        let err = Dotenvx::required(&store, &["A", "C", "D"]).unwrap_err();
        assert!(matches!(err, Error::MissingRequired(names) if names == vec!["C", "D"]));
    }

    #[test]
    fn if_present_ignores_missing_names() {
        let store = Dotenvx::parse("PORT=8080").expect("parse");
        assert!(Dotenvx::if_present(&store, &["PORT", "HOST"]).is_integer().is_ok());
        assert!(Dotenvx::if_present(&store, &["PORT", "HOST"]).required().is_err());
    }

    #[test]
    fn nul_value_fails_load_without_touching_environment() {
        let dotenvx = Dotenvx::new(
            StringSource("DOTENVX_RS_TEST_LOAD_OK=1\nDOTENVX_RS_TEST_LOAD_NUL=a\u{0}b".to_string()),
            LineParser,
        );
        let err = dotenvx.load(&mut ProcessEnvSink::mutable()).unwrap_err();
        assert!(matches!(err, Error::UnrepresentableInEnvironment { .. }));
        assert!(std::env::var_os("DOTENVX_RS_TEST_LOAD_OK").is_none());
    }
}
