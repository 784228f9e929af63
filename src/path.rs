// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that agent-fetch needs to
//! read or write, i.e., its configuration directory and any user supplied
//! path that may contain shell syntax.

use std::path::PathBuf;

/// Determine default absolute path to configuration directory.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/agent-fetch` as the default
/// absolute path for configuration. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_dir() -> Result<PathBuf, NoWayHome> {
    dirs::config_dir()
        .map(|path| path.join("agent-fetch"))
        .ok_or(NoWayHome)
}

/// Perform shell expansion on a user supplied path.
///
/// Expands leading tilde to home directory, and any environment variable
/// references.
///
/// # Errors
///
/// - Return [`ExpandError`] if referenced environment variable is not set.
pub fn expand_path(path: impl AsRef<str>) -> Result<PathBuf, ExpandError> {
    Ok(PathBuf::from(shellexpand::full(path.as_ref())?.into_owned()))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Shell expansion failed on path.
#[derive(Clone, Debug, thiserror::Error)]
#[error(transparent)]
pub struct ExpandError(#[from] shellexpand::LookupError<std::env::VarError>);
