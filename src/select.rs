// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Entry selection.
//!
//! Decide which entries of an index document should be fetched. Selection is
//! kept apart from fetching so the core never depends on terminal I/O. All
//! selectors hand back entries in document order, no matter the order in
//! which the user picked them.

use crate::index::{IndexDocument, IndexEntry};

use inquire::{InquireError, MultiSelect};
use tracing::{debug, instrument};

/// Layer of indirection for picking entries to fetch.
pub trait Selector {
    /// Select subset of entries from index document.
    fn select(&self, document: &IndexDocument) -> Result<Vec<IndexEntry>>;
}

/// Select every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectAll;

impl Selector for SelectAll {
    fn select(&self, document: &IndexDocument) -> Result<Vec<IndexEntry>> {
        Ok(document.entries().to_vec())
    }
}

/// Select entries by name without prompting.
///
/// Every entry whose name matches one of the given names is selected.
/// Duplicate entry names are all selected.
#[derive(Debug, Default, Clone)]
pub struct NameSelector {
    names: Vec<String>,
}

impl NameSelector {
    /// Construct new name selector.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Selector for NameSelector {
    /// Select entries matching names.
    ///
    /// # Errors
    ///
    /// - Return [`SelectError::UnknownEntry`] if a name matches no entry.
    fn select(&self, document: &IndexDocument) -> Result<Vec<IndexEntry>> {
        if let Some(unknown) = self
            .names
            .iter()
            .find(|name| !document.iter().any(|entry| entry.name() == name.as_str()))
        {
            return Err(SelectError::UnknownEntry(unknown.clone()));
        }

        Ok(document
            .iter()
            .filter(|entry| self.names.iter().any(|name| name == entry.name()))
            .cloned()
            .collect())
    }
}

/// Select entries through interactive multi-select prompt.
///
/// Typing into the prompt filters the listing.
#[derive(Debug, Clone)]
pub struct PromptSelector {
    message: String,
    page_size: usize,
}

impl PromptSelector {
    /// Construct new prompt selector.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            page_size: 15,
        }
    }

    /// Number of entries shown at once.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for PromptSelector {
    fn default() -> Self {
        Self::new("Select entries to fetch")
    }
}

impl Selector for PromptSelector {
    /// Prompt user to pick entries.
    ///
    /// Empty index documents are never prompted for.
    ///
    /// # Errors
    ///
    /// - Return [`SelectError::Prompt`] if prompt fails or is cancelled.
    #[instrument(skip(self, document), level = "debug")]
    fn select(&self, document: &IndexDocument) -> Result<Vec<IndexEntry>> {
        if document.is_empty() {
            debug!("nothing to select from");
            return Ok(Vec::new());
        }

        let mut picked = MultiSelect::new(self.message.as_str(), document.entries().to_vec())
            .with_page_size(self.page_size)
            .raw_prompt()?;

        // INVARIANT: Hand back entries in document order.
        picked.sort_by_key(|option| option.index);

        Ok(picked.into_iter().map(|option| option.value).collect())
    }
}

/// Entry selection error types.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Interactive prompt failed.
    #[error(transparent)]
    Prompt(#[from] InquireError),

    /// Requested name matches no entry.
    #[error("no index entry named {0:?}")]
    UnknownEntry(String),
}

/// Friendly result alias :3
pub type Result<T, E = SelectError> = std::result::Result<T, E>;
