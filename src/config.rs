// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration store.
//!
//! Agent-fetch keeps a small set of user settings, e.g., the default
//! repository to fetch from, or the directory to download into. These
//! settings live in a flat key-value document named `config.yaml` inside a
//! configuration directory. By default that directory is
//! `$XDG_CONFIG_HOME/agent-fetch`, see [`default_config_dir`].
//!
//! # Write-Through
//!
//! Every mutation is flushed to disk before the mutating call returns. The
//! full document is written to a sibling temporary file first, and then
//! renamed over the old document. Thus, no reader ever observes a partially
//! written configuration.
//!
//! # Malformed Documents
//!
//! Configuration is a convenience. A malformed document is logged as a
//! warning and treated as empty. The next mutation replaces it.
//!
//! [`default_config_dir`]: crate::path::default_config_dir

use std::{
    collections::BTreeMap,
    fs::{read_to_string, rename, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Name of configuration document inside configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Well-known configuration keys.
pub mod keys {
    /// Default repository URL to fetch from.
    pub const REPO_URL: &str = "repo_url";

    /// Default branch to fetch from.
    pub const BRANCH: &str = "branch";

    /// Default path to index document.
    pub const INDEX: &str = "index";

    /// Default directory to resolve relative targets against.
    pub const OUTPUT_DIR: &str = "output_dir";

    /// All well-known keys.
    pub const ALL: [&str; 4] = [REPO_URL, BRANCH, INDEX, OUTPUT_DIR];
}

/// Persistent key-value settings.
///
/// # Invariant
///
/// - Keys are never empty.
/// - In-memory mapping always matches the document on disk after a
///   successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Open configuration store in target directory.
    ///
    /// Loads `config.yaml` from target directory. Missing directory or
    /// document means empty store. Neither is created until the first
    /// mutation.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if document exists but cannot be read.
    #[instrument(skip(dir), level = "debug")]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        debug!("open configuration store: {:?}", path.display());

        let values = match read_to_string(&path) {
            Ok(content) => parse_document(&path, &content),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(ConfigError::Read {
                    source: err,
                    path: path.clone(),
                })
            }
        };

        Ok(Self { path, values })
    }

    /// Get value of key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.values.get(key.as_ref()).map(String::as_str)
    }

    /// Set key to value, and persist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::EmptyKey`] if key is empty.
    /// - Return [`ConfigError::CreateDir`], [`ConfigError::Serialize`], or
    ///   [`ConfigError::Write`] if store cannot be persisted.
    #[instrument(skip(self, key, value), level = "debug")]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }

        let value = value.into();
        debug!("set {key:?} to {value:?}");
        let previous = self.values.insert(key.clone(), value);
        if let Err(err) = self.persist() {
            // INVARIANT: Memory never runs ahead of disk.
            match previous {
                Some(previous) => self.values.insert(key, previous),
                None => self.values.remove(&key),
            };
            return Err(err);
        }

        Ok(())
    }

    /// Delete key, and persist.
    ///
    /// Deleting a key that is not set does nothing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::CreateDir`], [`ConfigError::Serialize`], or
    ///   [`ConfigError::Write`] if store cannot be persisted.
    #[instrument(skip(self, key), level = "debug")]
    pub fn delete(&mut self, key: impl AsRef<str>) -> Result<()> {
        let Some(previous) = self.values.remove(key.as_ref()) else {
            debug!("{:?} not set, nothing to delete", key.as_ref());
            return Ok(());
        };

        debug!("delete {:?}", key.as_ref());
        if let Err(err) = self.persist() {
            self.values.insert(key.as_ref().to_string(), previous);
            return Err(err);
        }

        Ok(())
    }

    /// Full mapping of keys to values.
    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Path to configuration document.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn persist(&self) -> Result<()> {
        if let Some(dir) = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            mkdirp::mkdirp(dir).map_err(|err| ConfigError::CreateDir {
                source: err,
                path: dir.to_path_buf(),
            })?;
        }

        let content = serde_yaml::to_string(&self.values)?;
        let staging = self.path.with_extension("yaml.tmp");
        write(&staging, content.as_bytes()).map_err(|err| ConfigError::Write {
            source: err,
            path: staging.clone(),
        })?;
        rename(&staging, &self.path).map_err(|err| ConfigError::Write {
            source: err,
            path: self.path.clone(),
        })?;

        Ok(())
    }
}

fn parse_document(path: &Path, content: &str) -> BTreeMap<String, String> {
    if content.trim().is_empty() {
        return BTreeMap::new();
    }

    match serde_yaml::from_str::<Option<BTreeMap<String, String>>>(content) {
        Ok(values) => values.unwrap_or_default(),
        Err(err) => {
            warn!(
                "ignoring malformed configuration at {:?}: {err}",
                path.display()
            );
            BTreeMap::new()
        }
    }
}

/// Configuration store error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration document exists, but cannot be read.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration document cannot be written.
    #[error("failed to write configuration at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration directory cannot be created.
    #[error("failed to create configuration directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] serde_yaml::Error),

    /// Configuration keys cannot be empty.
    #[error("configuration key cannot be empty")]
    EmptyKey,
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
