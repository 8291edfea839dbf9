// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Formatting tool provisioning for Python projects under Git.
//!
//! Hookstrap wires a small set of external tools into a project's commit
//! workflow: the __black__ formatter, the __isort__ import sorter, the
//! __flake8__ style checker, and the __pre-commit__ hook framework. None of
//! their logic lives here. Hookstrap only makes sure they are present, runs
//! them in the right order, and installs a commit hook that runs them on
//! staged files.
//!
//! # Procedure
//!
//! A full bootstrap performs the following steps in order:
//!
//! 1. Discover the Git work tree. Nothing is written outside of one.
//! 2. Probe the search path for each required tool, installing missing ones
//!    when allowed.
//! 3. Sort imports, format, then lint the project's source files.
//! 4. Atomically install the pre-commit hook and, if absent, the hook
//!    framework configuration.
//!
//! Each step reports a [`RunResult`](crate::report::RunResult). Only blocking
//! steps can fail the run. Lint findings are advisory.

pub mod bootstrap;
pub mod config;
pub mod fileset;
pub mod format;
pub mod hook;
pub mod path;
pub mod probe;
pub mod repo;
pub mod report;
pub mod runner;

pub use bootstrap::{Bootstrap, BootstrapOptions};
pub use config::Settings;
pub use fileset::FileSet;
pub use format::{FormatMode, FormattingRunner};
pub use hook::{HookInstaller, InstallOutcome};
pub use probe::{Installer, ProbeReport, Prober, ToolRequirement};
pub use repo::Workspace;
pub use report::{RunResult, StepStatus, Summary};
pub use runner::{SystemRunner, ToolOutput, ToolRunner};

/// Failure taxonomy visible to the command-line layer.
///
/// Every component maps its own error type into one of these variants. The
/// binary decides the exit code from them alone.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not run inside a usable Git work tree.
    #[error(transparent)]
    Environment(#[from] repo::RepoError),

    /// Required tool cannot be resolved or installed.
    #[error(transparent)]
    ToolMissing(#[from] probe::ProbeError),

    /// Import sorter or formatter failed in blocking mode.
    #[error("{step} failed with {}", exit_code_display(*code))]
    FormattingToolFailure {
        step: report::Step,
        code: Option<i32>,
    },

    /// Project files expected by the setup are absent.
    #[error("missing required project files: {}", display_paths(paths))]
    MissingProjectFiles { paths: Vec<std::path::PathBuf> },

    /// Hook, hook framework configuration, or project directory could not be
    /// written.
    #[error(transparent)]
    Write(#[from] hook::HookError),

    /// File set could not be collected.
    #[error(transparent)]
    FileSet(#[from] fileset::FileSetError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

fn exit_code_display(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".into(),
    }
}

fn display_paths(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
