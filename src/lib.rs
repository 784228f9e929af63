// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fetch documentation files from GitHub repositories.
//!
//! Agent-fetch downloads files like `AGENTS.md` out of a GitHub repository.
//! What gets downloaded, and where it ends up locally, is declared by an
//! [index document](index). Each index entry is resolved into a raw content
//! URL through [`RepositoryRef`], downloaded by a [`Fetcher`], and written to
//! its local target.
//!
//! # See Also
//!
//! 1. [`IndexDocument`]
//! 2. [`ConfigStore`]

pub mod config;
pub mod fetch;
pub mod github;
pub mod index;
pub mod path;
pub mod select;

pub use config::ConfigStore;
pub use fetch::{FetchReport, Fetcher, FileWriter, HttpClient};
pub use github::RepositoryRef;
pub use index::{IndexDocument, IndexEntry};
