// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fetch orchestration.
//!
//! Download selected index entries from a GitHub repository, and write them
//! to their local targets. The orchestrator itself is thin. It only walks the
//! entries in order and glues two collaborators together:
//!
//! - [`ContentClient`]: requests the bytes behind a raw content URL.
//! - [`ContentWriter`]: persists bytes to a local target path.
//!
//! # Failure Policy
//!
//! Entries are processed one at a time, in input order. A failure to fetch or
//! write one entry is recorded in that entry's [`EntryOutcome`], and the batch
//! moves on to the next entry. Callers inspect the resulting [`FetchReport`]
//! to decide what counts as success.

use crate::{
    github::RepositoryRef,
    index::{IndexDocument, IndexEntry, ParseError},
    path::{expand_path, ExpandError},
};

use indicatif::ProgressBar;
use reqwest::{Client, StatusCode};
use std::{
    fs::write,
    future::Future,
    path::{Component, Path, PathBuf},
    string::FromUtf8Error,
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Layer of indirection for requesting remote content.
pub trait ContentClient {
    /// Request bytes served at target URL.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Content access through HTTP.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Construct new HTTP client.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::Client`] if TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

impl ContentClient for HttpClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Http {
                source: err,
                url: url.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|err| FetchError::Http {
            source: err,
            url: url.to_string(),
        })?;
        debug!("received {} bytes from {url}", bytes.len());

        Ok(bytes.to_vec())
    }
}

/// Layer of indirection for persisting fetched content.
pub trait ContentWriter {
    /// Write contents to target path.
    ///
    /// Returns the path that was actually written to.
    fn write(&self, target: &Path, contents: &[u8]) -> Result<PathBuf, WriteError>;
}

/// Content persistence through the local file system.
///
/// Targets get shell expansion. Relative targets are resolved against a root
/// directory. Missing parent directories are created.
#[derive(Debug, Default, Clone)]
pub struct FileWriter {
    root: PathBuf,
}

impl FileWriter {
    /// Construct new file writer rooted at target directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve where a target ends up on disk.
    ///
    /// # Errors
    ///
    /// - Return [`WriteError::Expand`] if shell expansion fails.
    pub fn resolve(&self, target: &Path) -> Result<PathBuf, WriteError> {
        let expanded = expand_path(target.to_string_lossy()).map_err(|err| WriteError::Expand {
            source: err,
            target: target.to_path_buf(),
        })?;

        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(self.root.join(expanded))
        }
    }
}

impl ContentWriter for FileWriter {
    fn write(&self, target: &Path, contents: &[u8]) -> Result<PathBuf, WriteError> {
        let path = self.resolve(target)?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            mkdirp::mkdirp(dir).map_err(|err| WriteError::CreateDir {
                source: err,
                path: dir.to_path_buf(),
            })?;
        }

        write(&path, contents).map_err(|err| WriteError::Write {
            source: err,
            path: path.clone(),
        })?;

        Ok(path)
    }
}

/// Sequential fetcher of index entries.
#[derive(Debug)]
pub struct Fetcher<C = HttpClient, W = FileWriter>
where
    C: ContentClient,
    W: ContentWriter,
{
    client: C,
    writer: W,
    bar: ProgressBar,
}

impl<C, W> Fetcher<C, W>
where
    C: ContentClient,
    W: ContentWriter,
{
    /// Construct new fetcher.
    ///
    /// Progress is hidden until a visible bar is given through
    /// [`Fetcher::with_progress`].
    pub fn new(client: C, writer: W) -> Self {
        Self {
            client,
            writer,
            bar: ProgressBar::hidden(),
        }
    }

    /// Report progress through target progress bar.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Download and parse an index document stored inside the repository.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteIndexError::Fetch`] if index cannot be downloaded.
    /// - Return [`RemoteIndexError::Encoding`] if index is not UTF-8.
    /// - Return [`RemoteIndexError::Parse`] if index is invalid.
    /// - Return [`RemoteIndexError::UnsafeTarget`] if an entry target is not a
    ///   plain relative path.
    #[instrument(skip(self, repository), level = "debug")]
    pub async fn fetch_index(
        &self,
        repository: &RepositoryRef,
        source_path: &str,
    ) -> Result<IndexDocument, RemoteIndexError> {
        let url = repository.raw_content_url(source_path);
        info!("fetch index from {url}");
        let bytes = self.client.fetch(&url).await?;
        let content = String::from_utf8(bytes)?;
        let document: IndexDocument = content.parse()?;

        // INVARIANT: Remote targets stay inside the output directory.
        if let Some(entry) = document.iter().find(|entry| !is_confined(entry.target())) {
            return Err(RemoteIndexError::UnsafeTarget {
                name: entry.name().to_string(),
                target: entry.target().to_path_buf(),
            });
        }

        Ok(document)
    }

    /// Fetch every entry, and write each to its target.
    ///
    /// Never stops early. Outcomes are reported in the same order as the
    /// given entries.
    #[instrument(skip(self, repository, entries), level = "debug")]
    pub async fn fetch_entries(
        &self,
        repository: &RepositoryRef,
        entries: &[IndexEntry],
    ) -> FetchReport {
        self.bar.set_length(entries.len() as u64);
        self.bar.set_position(0);

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            self.bar.set_message(entry.name().to_string());
            let url = repository.raw_content_url(entry.source());
            let result = self.fetch_entry(&url, entry).await;

            self.bar.suspend(|| match &result {
                Ok(path) => info!("fetched {:?} into {:?}", entry.name(), path.display()),
                Err(err) => warn!("failed to fetch {:?}: {err}", entry.name()),
            });

            outcomes.push(EntryOutcome {
                entry: entry.clone(),
                url,
                result,
            });
            self.bar.inc(1);
        }

        self.bar.finish_and_clear();
        FetchReport { outcomes }
    }

    async fn fetch_entry(&self, url: &str, entry: &IndexEntry) -> Result<PathBuf, EntryError> {
        debug!("request {url}");
        let contents = self.client.fetch(url).await?;
        let path = self.bar.suspend(|| self.writer.write(entry.target(), &contents))?;

        Ok(path)
    }
}

/// Check that target is relative, never climbs upward, and has nothing for
/// shell expansion to act on.
fn is_confined(target: &Path) -> bool {
    let text = target.to_string_lossy();
    if text.starts_with('~') || text.contains('$') {
        return false;
    }

    target
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Result of fetching a single entry.
#[derive(Debug)]
pub struct EntryOutcome {
    /// Entry that was fetched.
    pub entry: IndexEntry,

    /// Raw content URL that was requested.
    pub url: String,

    /// Path written to, or reason for failure.
    pub result: Result<PathBuf, EntryError>,
}

impl EntryOutcome {
    /// Check if entry was fetched and written.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch fetch in input order.
#[derive(Debug, Default)]
pub struct FetchReport {
    outcomes: Vec<EntryOutcome>,
}

impl FetchReport {
    /// All outcomes in input order.
    pub fn outcomes(&self) -> &[EntryOutcome] {
        self.outcomes.as_slice()
    }

    /// Outcomes of entries that failed.
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    /// Number of entries fetched and written.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    /// Number of entries that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Check if every entry was fetched and written.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Remote content cannot be requested.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP client cannot be constructed.
    #[error("failed to construct HTTP client")]
    Client(#[source] reqwest::Error),

    /// Request did not complete.
    #[error("request to {url} failed")]
    Http {
        #[source]
        source: reqwest::Error,
        url: String,
    },

    /// Request completed with non-success status.
    #[error("request to {url} returned {status}")]
    Status { status: StatusCode, url: String },
}

/// Fetched content cannot be persisted.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Shell expansion failed on target.
    #[error("failed to expand target {:?}", target.display())]
    Expand {
        #[source]
        source: ExpandError,
        target: PathBuf,
    },

    /// Parent directory of target cannot be created.
    #[error("failed to create directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Target cannot be written.
    #[error("failed to write to {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Failure of a single entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Index document inside repository cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum RemoteIndexError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("remote index is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Entry target could land outside the output directory.
    #[error("remote index entry {name:?} has unsafe target {:?}", target.display())]
    UnsafeTarget { name: String, target: PathBuf },
}
