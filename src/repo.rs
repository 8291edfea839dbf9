// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git work tree discovery.
//!
//! Everything Hookstrap writes lands inside a Git work tree: the hook script
//! goes into the repository's hook directory, and the hook framework
//! configuration goes next to the project's sources. Thus, the work tree must
//! be resolved before any other step runs, so a run outside of one can fail
//! without touching the file system.
//!
//! # Hook Directory
//!
//! Git looks for hooks in `$GIT_DIR/hooks` unless `core.hooksPath` says
//! otherwise. A relative `core.hooksPath` is resolved against the top of the
//! work tree, matching how Git itself resolves it when running hooks.

use crate::path::{FRAMEWORK_CONFIG_FILE, PRE_COMMIT_HOOK};

use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Resolved Git work tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    git_dir: PathBuf,
    hooks_dir: PathBuf,
}

impl Workspace {
    /// Discover work tree containing target path.
    ///
    /// Searches target path and its parents for a Git repository.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::NotARepository`] if no repository encloses the
    ///   target path.
    /// - Return [`RepoError::BareRepository`] if the repository has no work
    ///   tree.
    /// - Return [`RepoError::Git2`] if repository configuration cannot be
    ///   read.
    #[instrument(skip(path), level = "debug")]
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repository = Repository::discover(path).map_err(|err| match err.code() {
            ErrorCode::NotFound => RepoError::NotARepository {
                path: path.to_path_buf(),
            },
            _ => RepoError::Git2(err),
        })?;

        let root = repository
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| RepoError::BareRepository {
                path: repository.path().to_path_buf(),
            })?;
        let git_dir = repository.path().to_path_buf();

        let hooks_dir = match repository.config()?.get_path("core.hooksPath") {
            Ok(custom) if custom.is_absolute() => custom,
            Ok(custom) => root.join(custom),
            Err(_) => git_dir.join("hooks"),
        };

        debug!(
            "found work tree {:?} with hooks at {:?}",
            root.display(),
            hooks_dir.display()
        );

        Ok(Self {
            root,
            git_dir,
            hooks_dir,
        })
    }

    /// Top of the work tree.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Repository's Git directory.
    pub fn git_dir(&self) -> &Path {
        self.git_dir.as_path()
    }

    /// Directory Git runs hooks from.
    pub fn hooks_dir(&self) -> &Path {
        self.hooks_dir.as_path()
    }

    /// Path of the pre-commit hook script.
    pub fn pre_commit_hook(&self) -> PathBuf {
        self.hooks_dir.join(PRE_COMMIT_HOOK)
    }

    /// Path of the hook framework configuration file.
    pub fn framework_config(&self) -> PathBuf {
        self.root.join(FRAMEWORK_CONFIG_FILE)
    }
}

/// Work tree discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Target path is not inside a Git repository.
    #[error("{:?} is not inside a git repository", path.display())]
    NotARepository { path: PathBuf },

    /// Repository has no work tree to format or install hooks for.
    #[error("repository at {:?} is bare", path.display())]
    BareRepository { path: PathBuf },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
type Result<T, E = RepoError> = std::result::Result<T, E>;
