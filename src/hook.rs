// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Commit hook installation.
//!
//! Installs two artifacts into a work tree:
//!
//! 1. The pre-commit hook script in the repository's hook directory. It is
//!    always rewritten, so the last install wins.
//! 2. The hook framework configuration at the top of the work tree. It is
//!    only written when absent, so user edits survive reinstalls unless
//!    forced.
//!
//! # Atomicity
//!
//! Both artifacts are written through [`write_atomic`]. Content goes into a
//! temporary file next to the destination, which is flushed, given its final
//! permissions, and renamed over the destination. If anything fails before the
//! rename, the temporary file is discarded on drop and the destination keeps
//! whatever it had before. A hook is never left truncated or without its
//! executable bit.
//!
//! # See Also
//!
//! - [githooks](https://git-scm.com/docs/githooks)
//! - [`script`]
//! - [`framework`]

pub mod framework;
pub mod script;

use crate::{
    config::FormatSettings,
    hook::framework::{FrameworkConfig, FrameworkError},
    repo::Workspace,
    report::{RunResult, Step},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// In-memory description of a hook file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    pub path: PathBuf,
    pub body: String,
    pub executable: bool,
}

/// What an install did to one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing existed, file was written.
    Created,

    /// Existing file was overwritten.
    Replaced,

    /// Existing file was left alone.
    Kept,
}

impl Display for InstallOutcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Created => fmt.write_str("created"),
            Self::Replaced => fmt.write_str("replaced"),
            Self::Kept => fmt.write_str("kept existing"),
        }
    }
}

/// Installs hook script and hook framework configuration.
#[derive(Debug, Clone)]
pub struct HookInstaller {
    workspace: Workspace,
    settings: FormatSettings,
    force: bool,
}

impl HookInstaller {
    /// Construct new installer for target work tree.
    ///
    /// Requiring a [`Workspace`] means the work tree was already discovered,
    /// so an installer cannot exist outside of a repository.
    pub fn new(workspace: Workspace, settings: FormatSettings) -> Self {
        Self {
            workspace,
            settings,
            force: false,
        }
    }

    /// Overwrite existing hook framework configuration.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Hook script to install.
    pub fn hook_spec(&self) -> HookSpec {
        HookSpec {
            path: self.workspace.pre_commit_hook(),
            body: script::render(&self.settings),
            executable: true,
        }
    }

    /// Install both artifacts.
    ///
    /// # Errors
    ///
    /// - Return [`HookError`] if either artifact cannot be written. An
    ///   artifact written before the failure stays in place.
    #[instrument(skip(self), level = "debug")]
    pub fn install(&self) -> Result<Vec<RunResult>> {
        let script = self.install_script()?;
        let config = self.install_framework_config()?;

        let config_result = match config {
            InstallOutcome::Kept => RunResult::skipped(
                Step::FrameworkConfig,
                format!(
                    "{} already exists, use --force to overwrite",
                    self.workspace.framework_config().display()
                ),
            ),
            outcome => RunResult::passed(
                Step::FrameworkConfig,
                true,
                format!("{outcome} {}", self.workspace.framework_config().display()),
            ),
        };

        Ok(vec![
            RunResult::passed(
                Step::HookScript,
                true,
                format!("{script} {}", self.workspace.pre_commit_hook().display()),
            ),
            config_result,
        ])
    }

    /// Install pre-commit hook script, replacing any existing one.
    ///
    /// # Errors
    ///
    /// - Return [`HookError::Write`] if the script cannot be written.
    pub fn install_script(&self) -> Result<InstallOutcome> {
        let spec = self.hook_spec();
        let outcome = if spec.path.exists() {
            match fs::read_to_string(&spec.path) {
                Ok(existing) if existing.contains(script::MARKER) => {}
                _ => warn!(
                    "replacing foreign pre-commit hook at {:?}",
                    spec.path.display()
                ),
            }
            InstallOutcome::Replaced
        } else {
            InstallOutcome::Created
        };

        write_atomic(&spec.path, spec.body.as_bytes(), spec.executable)?;
        info!("{outcome} pre-commit hook at {:?}", spec.path.display());

        Ok(outcome)
    }

    /// Install hook framework configuration unless one already exists.
    ///
    /// # Errors
    ///
    /// - Return [`HookError::Framework`] if the configuration cannot be
    ///   rendered.
    /// - Return [`HookError::Write`] if the configuration cannot be written.
    pub fn install_framework_config(&self) -> Result<InstallOutcome> {
        let path = self.workspace.framework_config();
        let exists = path.exists();
        if exists && !self.force {
            info!("keep existing {:?}", path.display());
            return Ok(InstallOutcome::Kept);
        }

        let config = FrameworkConfig::standard(&self.settings);
        write_atomic(&path, config.render()?.as_bytes(), false)?;

        let outcome = if exists {
            InstallOutcome::Replaced
        } else {
            InstallOutcome::Created
        };
        info!("{outcome} {:?}", path.display());

        Ok(outcome)
    }
}

/// Atomically replace file contents.
///
/// # Errors
///
/// - Return [`HookError::Write`] if any part of the write fails. The
///   destination is untouched in that case.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8], executable: bool) -> Result<()> {
    write_atomic_with(path, executable, |file| file.write_all(contents))
}

/// Atomically replace file contents produced by target writer.
///
/// The writer receives the temporary file. Returning an error from it aborts
/// the write and discards the temporary file.
///
/// # Errors
///
/// - Return [`HookError::Write`] if the writer or any file operation fails.
pub fn write_atomic_with<W>(path: impl AsRef<Path>, executable: bool, writer: W) -> Result<()>
where
    W: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let write_error = |source: io::Error| HookError::Write {
        source,
        path: path.to_path_buf(),
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    mkdirp::mkdirp(&parent).map_err(write_error)?;

    // INVARIANT: Temporary file lives in the destination directory so the
    // final rename never crosses file systems.
    let mut temp = NamedTempFile::new_in(&parent).map_err(write_error)?;
    writer(temp.as_file_mut()).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    set_mode(temp.path(), executable).map_err(write_error)?;

    debug!("persist {:?} to {:?}", temp.path().display(), path.display());
    temp.persist(path).map_err(|err| write_error(err.error))?;

    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o755 } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _executable: bool) -> io::Result<()> {
    Ok(())
}

/// Hook installation error types.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// File could not be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Hook framework configuration could not be rendered.
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

/// Friendly result alias :3
type Result<T, E = HookError> = std::result::Result<T, E>;
