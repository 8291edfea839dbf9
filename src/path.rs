// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Name of project-level configuration file at the top of a work tree.
pub const PROJECT_CONFIG_FILE: &str = "hookstrap.toml";

/// Name of hook framework configuration file at the top of a work tree.
pub const FRAMEWORK_CONFIG_FILE: &str = ".pre-commit-config.yaml";

/// Name of the hook script that Git runs before recording a commit.
pub const PRE_COMMIT_HOOK: &str = "pre-commit";

/// Determine default absolute path to user-level configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/hookstrap/config.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoConfigDir`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn user_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("hookstrap").join("config.toml"))
        .ok_or(NoConfigDir)
}

/// Determine path of project-level configuration file in a work tree.
pub fn project_config_file(work_tree: impl AsRef<Path>) -> PathBuf {
    work_tree.as_ref().join(PROJECT_CONFIG_FILE)
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoConfigDir;

/// Friendly result alias :3
pub type Result<T, E = NoConfigDir> = std::result::Result<T, E>;
