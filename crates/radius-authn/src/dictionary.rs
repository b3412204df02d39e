//! Pre-loaded RADIUS dictionary resource
//!
//! The dictionary is handed to the RADIUS client untouched; parsing attribute
//! definitions is the client's business.

use crate::config::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw dictionary files loaded from the configured path
#[derive(Debug, Clone)]
pub struct Dictionary {
    path: PathBuf,
    files: Vec<DictionaryFile>,
}

#[derive(Debug, Clone)]
pub struct DictionaryFile {
    pub name: String,
    pub contents: String,
}

impl Dictionary {
    /// Load every regular file under `path`, or `path` itself when it is a file.
    /// Files are kept sorted by name.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| {
            ConfigError::Invalid(format!(
                "Cannot read RADIUS dictionary path {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        if metadata.is_file() {
            files.push(read_file(path)?);
        } else {
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    files.push(read_file(&entry.path())?);
                }
            }
            files.sort_by(|a, b| a.name.cmp(&b.name));
        }

        if files.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "RADIUS dictionary path {} contains no files",
                path.display()
            )));
        }

        debug!(path = %path.display(), files = files.len(), "Loaded RADIUS dictionary");

        Ok(Dictionary {
            path: path.to_path_buf(),
            files,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[DictionaryFile] {
        &self.files
    }
}

fn read_file(path: &Path) -> Result<DictionaryFile, ConfigError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = fs::read_to_string(path)?;
    Ok(DictionaryFile { name, contents })
}
