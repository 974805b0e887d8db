//! Resolves configured search paths and file names to one text blob.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_FILE_NAME: &str = ".env";

pub trait SourceReader {
    fn read(&self) -> Result<String>;
}

/// Tries every `path/name` pair in order. With `short_circuit` only the first
/// readable file is used; otherwise all readable files are joined by newlines.
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
    names: Vec<String>,
    short_circuit: bool,
}

impl FileSource {
    pub fn new(paths: Vec<PathBuf>, names: Vec<String>, short_circuit: bool) -> Self {
        let names = if names.is_empty() {
            vec![DEFAULT_FILE_NAME.to_string()]
        } else {
            names
        };
        Self {
            paths,
            names,
            short_circuit,
        }
    }

    fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.paths
            .iter()
            .flat_map(move |dir| self.names.iter().map(move |name| dir.join(name)))
    }
}

impl SourceReader for FileSource {
    fn read(&self) -> Result<String> {
        if self.paths.is_empty() {
            return Err(Error::InvalidPath(
                "At least one environment file path must be provided.".to_string(),
            ));
        }

        let mut contents = Vec::new();
        for candidate in self.candidates() {
            if !candidate.is_file() {
                continue;
            }
            match fs::read_to_string(&candidate) {
                Ok(text) => {
                    debug!(path = %candidate.display(), "read environment file");
                    contents.push(text);
                    if self.short_circuit {
                        break;
                    }
                }
                Err(err) => debug!(path = %candidate.display(), error = %err, "skipping unreadable file"),
            }
        }

        if contents.is_empty() {
            let tried = self
                .paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::InvalidPath(format!(
                "Unable to read any of the environment file(s) at [{tried}]."
            )));
        }
        Ok(contents.join("\n"))
    }
}

/// In-memory source, used by `Dotenvx::parse` and tests.
#[derive(Debug, Clone)]
pub struct StringSource(pub String);

impl SourceReader for StringSource {
    fn read(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
