// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! GitHub repository resolution.
//!
//! Turn a GitHub repository URL into a [`RepositoryRef`], and build
//! __raw content URLs__ from it. A raw content URL serves the bytes of a
//! single file on a given branch, bypassing the HTML interface:
//!
//! ```text
//! https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{source_path}
//! ```
//!
//! Nothing here touches the network.
//!
//! # Branch Precedence
//!
//! 1. Branch supplied explicitly by the caller.
//! 2. Branch embedded in the URL through a `/tree/{branch}` or
//!    `/blob/{branch}/...` suffix.
//! 3. Fallback branch, e.g., one taken from configuration.
//! 4. [`DEFAULT_BRANCH`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use url::Url;

/// Branch used when neither the caller nor the URL names one.
pub const DEFAULT_BRANCH: &str = "main";

const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

/// Parsed identity of a GitHub repository.
///
/// # Invariant
///
/// - Owner and repo are non-empty, and never contain a `/`.
/// - Repo never carries a trailing `.git`.
/// - Branch is pinned once named by the URL or the caller.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RepositoryRef {
    owner: String,
    repo: String,
    branch: String,
    pinned: bool,
}

impl RepositoryRef {
    /// Parse repository URL.
    ///
    /// Branch comes from the URL if it has one, or falls back to
    /// [`DEFAULT_BRANCH`].
    ///
    /// # Errors
    ///
    /// - Return [`InvalidUrlError::Malformed`] if URL cannot be parsed.
    /// - Return [`InvalidUrlError::NotGitHub`] if host is not GitHub.
    /// - Return [`InvalidUrlError::MissingSegment`] if owner or repo cannot
    ///   be extracted.
    pub fn parse(url: impl AsRef<str>) -> Result<Self> {
        let input = url.as_ref().trim();

        // INVARIANT: Treat "github.com/owner/repo" as HTTPS.
        let parsed = if input.contains("://") {
            Url::parse(input)
        } else {
            Url::parse(&format!("https://{input}"))
        }
        .map_err(|err| InvalidUrlError::Malformed {
            source: err,
            url: input.to_string(),
        })?;

        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(InvalidUrlError::NotGitHub {
                url: input.to_string(),
            });
        }

        match parsed.host_str() {
            Some("github.com" | "www.github.com") => {}
            _ => {
                return Err(InvalidUrlError::NotGitHub {
                    url: input.to_string(),
                })
            }
        }

        let segments = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        let owner = match segments.first() {
            Some(owner) => owner.to_string(),
            None => {
                return Err(InvalidUrlError::MissingSegment {
                    segment: "owner",
                    url: input.to_string(),
                })
            }
        };

        let repo = segments
            .get(1)
            .copied()
            .map(|repo| repo.strip_suffix(".git").unwrap_or(repo))
            .filter(|repo| !repo.is_empty())
            .ok_or_else(|| InvalidUrlError::MissingSegment {
                segment: "repo",
                url: input.to_string(),
            })?
            .to_string();

        let (branch, pinned) = match (segments.get(2), segments.get(3)) {
            (Some(&"tree" | &"blob"), Some(branch)) => (branch.to_string(), true),
            _ => (DEFAULT_BRANCH.to_string(), false),
        };

        Ok(Self {
            owner,
            repo,
            branch,
            pinned,
        })
    }

    /// Override branch.
    ///
    /// Blank branch names count as no branch at all, and leave the current
    /// branch untouched.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        if let Some(branch) = non_blank(branch.into()) {
            self.branch = branch;
            self.pinned = true;
        }
        self
    }

    /// Replace [`DEFAULT_BRANCH`] with another fallback branch.
    ///
    /// Does nothing if the branch was already named by the URL or through
    /// [`RepositoryRef::with_branch`], or if the fallback is blank.
    pub fn with_fallback_branch(mut self, branch: impl Into<String>) -> Self {
        if self.pinned {
            return self;
        }

        if let Some(branch) = non_blank(branch.into()) {
            self.branch = branch;
        }
        self
    }

    /// Owner of repository.
    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }

    /// Name of repository.
    pub fn repo(&self) -> &str {
        self.repo.as_str()
    }

    /// Branch to fetch content from.
    pub fn branch(&self) -> &str {
        self.branch.as_str()
    }

    /// Build raw content URL for a file in the repository.
    ///
    /// Source path is used verbatim, except that one leading `/` is dropped.
    pub fn raw_content_url(&self, source_path: impl AsRef<str>) -> String {
        let source_path = source_path.as_ref();
        let source_path = source_path.strip_prefix('/').unwrap_or(source_path);
        format!(
            "{RAW_CONTENT_HOST}/{}/{}/{}/{source_path}",
            self.owner, self.repo, self.branch
        )
    }
}

impl Display for RepositoryRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

fn non_blank(branch: String) -> Option<String> {
    (!branch.trim().is_empty()).then_some(branch)
}

/// Parse repository URL, letting an explicit branch take precedence.
///
/// # Errors
///
/// - Return [`InvalidUrlError`] if URL is not a valid GitHub repository URL.
pub fn parse_repository_url(url: impl AsRef<str>, branch: Option<&str>) -> Result<RepositoryRef> {
    let repository = RepositoryRef::parse(url)?;
    Ok(match branch {
        Some(branch) => repository.with_branch(branch),
        None => repository,
    })
}

/// Build raw content URL for a file in a repository.
///
/// # Errors
///
/// - Return [`InvalidUrlError`] if repository URL is not a valid GitHub
///   repository URL.
pub fn build_raw_content_url(
    repository_url: impl AsRef<str>,
    source_path: impl AsRef<str>,
    branch: Option<&str>,
) -> Result<String> {
    Ok(parse_repository_url(repository_url, branch)?.raw_content_url(source_path))
}

/// Repository URL does not have the shape of a GitHub repository URL.
#[derive(Debug, thiserror::Error)]
pub enum InvalidUrlError {
    /// URL cannot be parsed at all.
    #[error("malformed repository URL {url:?}")]
    Malformed {
        #[source]
        source: url::ParseError,
        url: String,
    },

    /// URL does not point to GitHub.
    #[error("repository URL {url:?} does not point to github.com")]
    NotGitHub { url: String },

    /// URL lacks owner or repository segment.
    #[error("repository URL {url:?} has no {segment} segment")]
    MissingSegment { segment: &'static str, url: String },
}

/// Friendly result alias :3
pub type Result<T, E = InvalidUrlError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("https://github.com/octocat/hello-world", "octocat", "hello-world", "main"; "plain")]
    #[test_case("https://github.com/octocat/hello-world/", "octocat", "hello-world", "main"; "trailing slash")]
    #[test_case("https://github.com/octocat/hello-world.git", "octocat", "hello-world", "main"; "git suffix")]
    #[test_case("http://www.github.com/octocat/hello-world", "octocat", "hello-world", "main"; "http with www")]
    #[test_case("github.com/octocat/hello-world", "octocat", "hello-world", "main"; "no scheme")]
    #[test_case("https://github.com/octocat/hello-world/tree/dev", "octocat", "hello-world", "dev"; "tree branch")]
    #[test_case("https://github.com/octocat/hello-world/blob/v2/docs/AGENTS.md", "octocat", "hello-world", "v2"; "blob branch")]
    #[test_case("https://github.com/octocat/hello-world/issues/12", "octocat", "hello-world", "main"; "unrelated suffix")]
    #[test_case("https://github.com/octocat/hello-world?tab=readme#top", "octocat", "hello-world", "main"; "query and fragment")]
    #[test]
    fn parse_repository_ref(url: &str, owner: &str, repo: &str, branch: &str) {
        let result = RepositoryRef::parse(url).unwrap();
        pretty_assertions::assert_eq!(result.owner(), owner);
        pretty_assertions::assert_eq!(result.repo(), repo);
        pretty_assertions::assert_eq!(result.branch(), branch);
    }

    #[test_case("https://gitlab.com/foo/bar"; "other host")]
    #[test_case("ftp://github.com/foo/bar"; "other scheme")]
    #[test_case("https://raw.githubusercontent.com/foo/bar/main/README.md"; "raw host")]
    #[test]
    fn parse_rejects_non_github_url(url: &str) {
        let result = RepositoryRef::parse(url);
        assert!(matches!(result, Err(InvalidUrlError::NotGitHub { .. })));
    }

    #[test_case("https://github.com/"; "no owner")]
    #[test_case("https://github.com/octocat"; "no repo")]
    #[test_case("https://github.com/octocat/.git"; "empty repo after suffix")]
    #[test]
    fn parse_rejects_missing_segment(url: &str) {
        let result = RepositoryRef::parse(url);
        assert!(matches!(result, Err(InvalidUrlError::MissingSegment { .. })));
    }

    #[test]
    fn parse_rejects_malformed_url() {
        let result = RepositoryRef::parse("https://exa mple.com/foo/bar");
        assert!(matches!(result, Err(InvalidUrlError::Malformed { .. })));
    }

    #[test]
    fn explicit_branch_takes_precedence() -> anyhow::Result<()> {
        let url = "https://github.com/octocat/hello-world/tree/dev";
        pretty_assertions::assert_eq!(parse_repository_url(url, None)?.branch(), "dev");
        pretty_assertions::assert_eq!(parse_repository_url(url, Some("release"))?.branch(), "release");
        pretty_assertions::assert_eq!(
            parse_repository_url("https://github.com/octocat/hello-world", Some("release"))?
                .branch(),
            "release"
        );

        Ok(())
    }

    #[test_case(""; "empty")]
    #[test_case("  "; "whitespace")]
    #[test]
    fn blank_branch_counts_as_unspecified(branch: &str) {
        let url = "https://github.com/octocat/hello-world";
        pretty_assertions::assert_eq!(
            build_raw_content_url(url, "AGENTS.md", Some(branch)).unwrap(),
            "https://raw.githubusercontent.com/octocat/hello-world/main/AGENTS.md"
        );

        let result = RepositoryRef::parse(url).unwrap().with_fallback_branch(branch);
        pretty_assertions::assert_eq!(result.branch(), "main");

        let result = parse_repository_url(url, Some(branch))
            .unwrap()
            .with_fallback_branch("trunk");
        pretty_assertions::assert_eq!(result.branch(), "trunk");

        let result = parse_repository_url(format!("{url}/tree/dev"), Some(branch)).unwrap();
        pretty_assertions::assert_eq!(result.branch(), "dev");
    }

    #[test]
    fn fallback_branch_never_overrides_named_branch() -> anyhow::Result<()> {
        let result = RepositoryRef::parse("https://github.com/octocat/hello-world")?
            .with_fallback_branch("trunk");
        pretty_assertions::assert_eq!(result.branch(), "trunk");

        let result = RepositoryRef::parse("https://github.com/octocat/hello-world/tree/dev")?
            .with_fallback_branch("trunk");
        pretty_assertions::assert_eq!(result.branch(), "dev");

        let result = parse_repository_url("https://github.com/octocat/hello-world", Some("v1"))?
            .with_fallback_branch("trunk");
        pretty_assertions::assert_eq!(result.branch(), "v1");

        Ok(())
    }

    #[test]
    fn build_raw_content_url_for_source_path() -> anyhow::Result<()> {
        let result = build_raw_content_url(
            "https://github.com/octocat/hello-world",
            "README.md",
            Some("main"),
        )?;
        pretty_assertions::assert_eq!(
            result,
            "https://raw.githubusercontent.com/octocat/hello-world/main/README.md"
        );

        let result = build_raw_content_url(
            "https://github.com/octocat/hello-world.git",
            "services/api/AGENTS.md",
            None,
        )?;
        pretty_assertions::assert_eq!(
            result,
            "https://raw.githubusercontent.com/octocat/hello-world/main/services/api/AGENTS.md"
        );

        Ok(())
    }

    #[test]
    fn build_raw_content_url_strips_one_leading_slash() -> anyhow::Result<()> {
        let repository = RepositoryRef::parse("https://github.com/octocat/hello-world")?;
        pretty_assertions::assert_eq!(
            repository.raw_content_url("/AGENTS.md"),
            "https://raw.githubusercontent.com/octocat/hello-world/main/AGENTS.md"
        );
        pretty_assertions::assert_eq!(
            repository.raw_content_url("//AGENTS.md"),
            "https://raw.githubusercontent.com/octocat/hello-world/main//AGENTS.md"
        );

        Ok(())
    }

    #[test]
    fn build_raw_content_url_is_deterministic() -> anyhow::Result<()> {
        let first = build_raw_content_url("https://github.com/a/b/tree/x", "docs/AGENTS.md", None)?;
        let second =
            build_raw_content_url("https://github.com/a/b/tree/x", "docs/AGENTS.md", None)?;
        pretty_assertions::assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn build_raw_content_url_rejects_invalid_repository() {
        let result = build_raw_content_url("https://gitlab.com/foo/bar", "README.md", None);
        assert!(result.is_err());
    }
}
