// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Index document layout.
//!
//! An __index__ is a declarative listing of files to fetch from a remote
//! repository. Each entry names a human readable label, a source path relative
//! to the root of the repository, and a local target path that the fetched
//! content will be written to.
//!
//! # General Layout
//!
//! The index is a YAML document (JSON works too, being a subset of YAML) with
//! one top-level field named `agents`. That field holds a list of entries:
//!
//! ```yaml
//! agents:
//!   - name: Root Guide
//!     source: AGENTS.md
//!     target: downloads/root.md
//!   - name: API Guide
//!     source: services/api/AGENTS.md
//!     target: downloads/api.md
//! ```
//!
//! Entries keep their declaration order. Unknown fields are ignored so newer
//! index files can still be read by older versions of this tool. However, one
//! bad entry makes the whole index invalid. An index is never partially
//! trusted.

use serde::Deserialize;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    slice::Iter,
    str::FromStr,
};
use tracing::{debug, instrument};

/// Parsed index document.
///
/// Ordered listing of [`IndexEntry`] in declaration order. Can be empty.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct IndexDocument {
    entries: Vec<IndexEntry>,
}

impl IndexDocument {
    /// Read and parse index document at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ParseError::Read`] if file cannot be read.
    /// - Return any other [`ParseError`] if the content is not a valid index.
    #[instrument(skip(path), level = "debug")]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        debug!("read index document: {:?}", path.as_ref().display());
        let content = read_to_string(path.as_ref()).map_err(|err| ParseError::Read {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        content.parse()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[IndexEntry] {
        self.entries.as_slice()
    }

    /// Iterate through entries in declaration order.
    pub fn iter(&self) -> Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index lists no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take ownership of entries.
    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }
}

impl FromStr for IndexDocument {
    type Err = ParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let raw: RawIndex = serde_yaml::from_str(data)?;
        let entries = raw
            .agents
            .into_iter()
            .enumerate()
            .map(|(position, raw)| IndexEntry::try_from_raw(position, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }
}

impl<'doc> IntoIterator for &'doc IndexDocument {
    type Item = &'doc IndexEntry;
    type IntoIter = Iter<'doc, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Single entry of an index document.
///
/// # Invariant
///
/// - All fields are non-empty.
/// - Source path is relative, and never walks out of the repository root.
/// - Source and target are independent of each other.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IndexEntry {
    name: String,
    source: String,
    target: PathBuf,
}

impl IndexEntry {
    fn try_from_raw(position: usize, raw: RawEntry) -> Result<Self> {
        let name = required(position, "name", raw.name)?;
        let source = required(position, "source", raw.source)?;
        let target = required(position, "target", raw.target)?;

        if source.starts_with(['/', '\\']) || Path::new(&source).is_absolute() {
            return Err(ParseError::AbsoluteSource {
                position,
                path: source,
            });
        }

        if source.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ParseError::TraversalSource {
                position,
                path: source,
            });
        }

        Ok(Self {
            name,
            source,
            target: PathBuf::from(target),
        })
    }

    /// Human readable label.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Path of file relative to repository root.
    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    /// Local path to write fetched content to.
    pub fn target(&self) -> &Path {
        self.target.as_path()
    }
}

impl Display for IndexEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} ({} -> {})",
            self.name,
            self.source,
            self.target.display()
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    agents: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

fn required(position: usize, field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        None => Err(ParseError::MissingField { position, field }),
        Some(value) if value.trim().is_empty() => Err(ParseError::EmptyField { position, field }),
        Some(value) => Ok(value),
    }
}

/// Index parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Index file cannot be read.
    #[error("failed to read index at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Index is not well-formed, or does not have the expected shape.
    #[error("malformed index document")]
    Yaml(#[from] serde_yaml::Error),

    /// Entry lacks a required field.
    #[error("index entry {position} is missing field {field:?}")]
    MissingField {
        position: usize,
        field: &'static str,
    },

    /// Entry has a required field that is blank.
    #[error("index entry {position} has empty field {field:?}")]
    EmptyField {
        position: usize,
        field: &'static str,
    },

    /// Entry source is an absolute path.
    #[error("index entry {position} has absolute source path {path:?}")]
    AbsoluteSource { position: usize, path: String },

    /// Entry source walks out of repository root.
    #[error("index entry {position} has source path {path:?} that escapes the repository")]
    TraversalSource { position: usize, path: String },
}

/// Friendly result alias :3
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    #[test]
    fn parse_index_document() -> anyhow::Result<()> {
        let result: IndexDocument = indoc! {r#"
            agents:
              - name: Root Guide
                source: AGENTS.md
                target: downloads/root.md
              - name: API Guide
                source: services/api/AGENTS.md
                target: downloads/api.md
        "#}
        .parse()?;

        pretty_assertions::assert_eq!(result.len(), 2);
        pretty_assertions::assert_eq!(result.entries()[0].name(), "Root Guide");
        pretty_assertions::assert_eq!(result.entries()[0].source(), "AGENTS.md");
        pretty_assertions::assert_eq!(result.entries()[0].target(), Path::new("downloads/root.md"));
        pretty_assertions::assert_eq!(result.entries()[1].name(), "API Guide");
        pretty_assertions::assert_eq!(result.entries()[1].source(), "services/api/AGENTS.md");
        pretty_assertions::assert_eq!(result.entries()[1].target(), Path::new("downloads/api.md"));

        Ok(())
    }

    #[test]
    fn parse_preserves_declaration_order() -> anyhow::Result<()> {
        let result: IndexDocument = indoc! {r#"
            agents:
              - { name: zeta, source: z/AGENTS.md, target: z.md }
              - { name: alpha, source: a/AGENTS.md, target: a.md }
              - { name: mid, source: m/AGENTS.md, target: m.md }
              - { name: alpha, source: b/AGENTS.md, target: b.md }
        "#}
        .parse()?;

        let names = result.iter().map(IndexEntry::name).collect::<Vec<_>>();
        pretty_assertions::assert_eq!(names, vec!["zeta", "alpha", "mid", "alpha"]);

        Ok(())
    }

    #[test]
    fn parse_empty_agent_listing() -> anyhow::Result<()> {
        let result: IndexDocument = "agents: []".parse()?;
        assert!(result.is_empty());

        Ok(())
    }

    #[test]
    fn parse_json_index_document() -> anyhow::Result<()> {
        let result: IndexDocument =
            r#"{"agents": [{"name": "Root", "source": "AGENTS.md", "target": "root.md"}]}"#
                .parse()?;
        pretty_assertions::assert_eq!(result.len(), 1);
        pretty_assertions::assert_eq!(result.entries()[0].name(), "Root");

        Ok(())
    }

    #[test]
    fn parse_ignores_unknown_fields() -> anyhow::Result<()> {
        let result: IndexDocument = indoc! {r#"
            version: 2
            agents:
              - name: Root Guide
                source: AGENTS.md
                target: root.md
                description: not used yet
        "#}
        .parse()?;
        pretty_assertions::assert_eq!(result.len(), 1);

        Ok(())
    }

    #[test_case("name"; "missing name")]
    #[test_case("source"; "missing source")]
    #[test_case("target"; "missing target")]
    #[test]
    fn parse_rejects_missing_field(field: &str) {
        let mut fields = vec![
            ("name", "Second"),
            ("source", "second/AGENTS.md"),
            ("target", "second.md"),
        ];
        fields.retain(|(key, _)| *key != field);
        let second = fields
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        let data = format!(
            "agents:\n  - {{ name: First, source: AGENTS.md, target: first.md }}\n  - {{ {second} }}\n"
        );

        let result = data.parse::<IndexDocument>();
        match result {
            Err(ParseError::MissingField { position, field: missing }) => {
                pretty_assertions::assert_eq!(position, 1);
                pretty_assertions::assert_eq!(missing, field);
            }
            other => panic!("expected missing field error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_empty_field() {
        let result = "agents:\n  - { name: '  ', source: AGENTS.md, target: a.md }"
            .parse::<IndexDocument>();
        assert!(matches!(
            result,
            Err(ParseError::EmptyField { position: 0, field: "name" })
        ));
    }

    #[test_case("/etc/passwd"; "leading slash")]
    #[test_case("\\windows\\AGENTS.md"; "leading backslash")]
    #[test]
    fn parse_rejects_absolute_source(source: &str) {
        let data = format!("agents:\n  - {{ name: bad, source: '{source}', target: a.md }}");
        let result = data.parse::<IndexDocument>();
        assert!(matches!(result, Err(ParseError::AbsoluteSource { .. })));
    }

    #[test_case("../AGENTS.md"; "leading parent")]
    #[test_case("docs/../../AGENTS.md"; "nested parent")]
    #[test]
    fn parse_rejects_traversal_source(source: &str) {
        let data = format!("agents:\n  - {{ name: bad, source: '{source}', target: a.md }}");
        let result = data.parse::<IndexDocument>();
        assert!(matches!(result, Err(ParseError::TraversalSource { .. })));
    }

    #[test]
    fn parse_allows_dotted_names_in_source() -> anyhow::Result<()> {
        let result: IndexDocument =
            "agents:\n  - { name: ok, source: '.github/..agents/AGENTS.md', target: a.md }"
                .parse()?;
        pretty_assertions::assert_eq!(result.entries()[0].source(), ".github/..agents/AGENTS.md");

        Ok(())
    }

    #[test_case("agents: [broken"; "not well formed")]
    #[test_case("- name: Root"; "top level is a list")]
    #[test_case("entries: []"; "missing agents field")]
    #[test_case("agents: {name: Root}"; "agents is not a list")]
    #[test]
    fn parse_rejects_unexpected_shape(data: &str) {
        let result = data.parse::<IndexDocument>();
        assert!(matches!(result, Err(ParseError::Yaml(_))));
    }

    #[test]
    fn display_index_entry() -> anyhow::Result<()> {
        let result: IndexDocument =
            "agents:\n  - { name: Root Guide, source: AGENTS.md, target: downloads/root.md }"
                .parse()?;
        pretty_assertions::assert_eq!(
            result.entries()[0].to_string(),
            "Root Guide (AGENTS.md -> downloads/root.md)"
        );

        Ok(())
    }
}
