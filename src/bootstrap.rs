// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Full environment bootstrap.
//!
//! Strings every other component together into one idempotent procedure.
//! Running it twice in a row leaves the work tree in the same state as
//! running it once, provided the external tools themselves are idempotent.
//!
//! # Ordering
//!
//! Everything that can fail without side effects runs first: workspace
//! discovery, the required project file check, and the tool probe. Only once
//! those pass does anything get installed, formatted, or written. A bootstrap
//! run outside of a repository therefore leaves the file system untouched.

use crate::{
    config::Settings,
    fileset::FileSet,
    format::{FormatMode, FormattingRunner},
    hook::{HookError, HookInstaller},
    probe::{Installer, ProbeError, Prober, ToolRequirement},
    repo::Workspace,
    report::{RunResult, Step, Summary},
    runner::{SystemRunner, ToolRunner},
    Error, Result,
};

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Command-line overrides of a bootstrap run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Fail on missing tools instead of installing them.
    pub no_install: bool,

    /// Warn instead of failing on missing required project files.
    pub allow_missing: bool,

    /// Skip the formatting pass.
    pub no_format: bool,

    /// Overwrite existing hook framework configuration.
    pub force: bool,
}

/// Bootstrap procedure over one work tree.
#[derive(Debug, Clone)]
pub struct Bootstrap<R = SystemRunner>
where
    R: ToolRunner,
{
    settings: Settings,
    options: BootstrapOptions,
    search_path: OsString,
    runner: R,
}

impl Bootstrap<SystemRunner> {
    /// Construct new bootstrap over the current `PATH` with real processes.
    pub fn new(settings: Settings, options: BootstrapOptions) -> Self {
        Self::with_runner(
            settings,
            options,
            env::var_os("PATH").unwrap_or_default(),
            SystemRunner::new(),
        )
    }
}

impl<R> Bootstrap<R>
where
    R: ToolRunner,
{
    /// Construct new bootstrap with target search path and tool runner.
    pub fn with_runner(
        settings: Settings,
        options: BootstrapOptions,
        search_path: impl Into<OsString>,
        runner: R,
    ) -> Self {
        Self {
            settings,
            options,
            search_path: search_path.into(),
            runner,
        }
    }

    /// Run the full procedure against the work tree containing target path.
    ///
    /// Returns the summary of every step. A summary can still hold a blocking
    /// failure of the sorter or formatter, see [`Summary::failure`].
    ///
    /// # Errors
    ///
    /// - Return [`Error::Environment`] if target path is not inside a work
    ///   tree.
    /// - Return [`Error::MissingProjectFiles`] if required project files are
    ///   absent without override.
    /// - Return [`Error::ToolMissing`] if tools remain missing after the
    ///   install attempt, or may not be installed.
    /// - Return [`Error::Write`] if a directory, hook, or configuration file
    ///   cannot be written.
    #[instrument(skip(self, path), level = "debug")]
    pub fn run(&self, path: impl AsRef<Path>) -> Result<Summary> {
        let workspace = Workspace::discover(path)?;
        info!("bootstrap work tree {:?}", workspace.root().display());

        let mut summary = Summary::new();
        summary.push(self.check_required_files(&workspace)?);
        summary.extend(self.provision_tools(&workspace)?);

        if let Some(result) = self.create_directories(&workspace)? {
            summary.push(result);
        }

        if self.options.no_format {
            for step in [Step::Sort, Step::Format, Step::Lint] {
                summary.push(RunResult::skipped(step, "disabled by --no-format"));
            }
        } else {
            let files = FileSet::collect(workspace.root(), &self.settings.format)?;
            let formatter = FormattingRunner::new(
                self.settings.format.clone(),
                FormatMode::Apply,
                &self.runner,
            );
            summary.extend(formatter.run(&files));
        }

        let installer = HookInstaller::new(workspace, self.settings.format.clone())
            .force(self.options.force);
        summary.extend(installer.install()?);

        Ok(summary)
    }

    /// Verify presence of every required project file.
    ///
    /// File contents are never inspected.
    ///
    /// # Errors
    ///
    /// - Return [`Error::MissingProjectFiles`] if any file is absent, unless
    ///   missing files are allowed.
    pub fn check_required_files(&self, workspace: &Workspace) -> Result<RunResult> {
        let required = &self.settings.bootstrap.required_files;
        let missing = missing_files(workspace.root(), required);

        if missing.is_empty() {
            return Ok(RunResult::passed(
                Step::RequiredFiles,
                true,
                format!("{} required files present", required.len()),
            ));
        }

        let listing = missing
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if self.options.allow_missing || self.settings.bootstrap.allow_missing_files {
            warn!("continuing without required project files: {listing}");
            return Ok(RunResult::skipped(
                Step::RequiredFiles,
                format!("missing but allowed: {listing}"),
            ));
        }

        Err(Error::MissingProjectFiles { paths: missing })
    }

    /// Probe tools, install missing ones, then probe again.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ToolMissing`] if installation is disabled or fails,
    ///   or if a tool is still missing afterwards.
    pub fn provision_tools(&self, workspace: &Workspace) -> Result<Vec<RunResult>> {
        let requirements = ToolRequirement::standard(&self.settings);
        let prober = Prober::new(self.search_path.clone(), &self.runner);

        let report = prober.probe(&requirements);
        if report.is_complete() {
            return Ok(vec![report.to_run_result()]);
        }

        let installer = Installer::new(
            self.settings.bootstrap.installer.clone(),
            self.settings.bootstrap.auto_install && !self.options.no_install,
            workspace.root(),
            &self.runner,
        );
        let mut results = installer.install_missing(&report)?;

        // INVARIANT: Installed tools only count once the search path proves it.
        let report = prober.probe(&requirements);
        if !report.is_complete() {
            return Err(ProbeError::ToolMissing {
                tools: report.missing_names(),
            }
            .into());
        }

        results.insert(0, report.to_run_result());
        Ok(results)
    }

    /// Create configured project directories.
    ///
    /// Returns `None` if no directories are configured.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Write`] if a directory cannot be created.
    pub fn create_directories(&self, workspace: &Workspace) -> Result<Option<RunResult>> {
        let directories = &self.settings.bootstrap.directories;
        if directories.is_empty() {
            return Ok(None);
        }

        for directory in directories {
            let path = workspace.root().join(directory);
            mkdirp::mkdirp(&path).map_err(|err| HookError::Write {
                source: err,
                path: path.clone(),
            })?;
        }

        let listing = directories
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!("ensured project directories: {listing}");

        Ok(Some(RunResult::passed(Step::Directories, true, listing)))
    }
}

/// Paths of target files that do not exist beneath root.
fn missing_files(root: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|file| !root.join(file).is_file())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::StepStatus,
        runner::{Invocation, RunnerError, ToolOutput},
    };
    use git2::Repository;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Runner that must never be reached.
    struct NoRunner;

    impl ToolRunner for NoRunner {
        fn run(&self, invocation: &Invocation) -> crate::runner::Result<ToolOutput> {
            Err(RunnerError::NotFound {
                program: invocation.program().into(),
            })
        }
    }

    fn snapshot(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in ignore::WalkBuilder::new(root)
            .standard_filters(false)
            .build()
        {
            paths.push(entry?.path().to_path_buf());
        }
        paths.sort();
        Ok(paths)
    }

    fn settings_without_required_files() -> Settings {
        let mut settings = Settings::default();
        settings.bootstrap.required_files.clear();
        settings
    }

    #[test]
    fn outside_repository_fails_without_writes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("main.py"), "import sys\n")?;
        let before = snapshot(dir.path())?;

        let bootstrap = Bootstrap::with_runner(
            Settings::default(),
            BootstrapOptions::default(),
            "",
            NoRunner,
        );
        let result = bootstrap.run(dir.path());

        assert!(matches!(result, Err(Error::Environment(_))));
        assert_eq!(snapshot(dir.path())?, before);

        Ok(())
    }

    #[test]
    fn missing_project_files_fail_before_writes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        Repository::init(dir.path())?;
        let before = snapshot(dir.path())?;

        let bootstrap = Bootstrap::with_runner(
            Settings::default(),
            BootstrapOptions::default(),
            "",
            NoRunner,
        );
        let result = bootstrap.run(dir.path());

        match result {
            Err(Error::MissingProjectFiles { paths }) => assert_eq!(paths.len(), 3),
            other => panic!("expected missing project files, got {other:?}"),
        }
        assert_eq!(snapshot(dir.path())?, before);

        Ok(())
    }

    #[test]
    fn allowed_missing_files_are_skipped() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        Repository::init(dir.path())?;
        let workspace = Workspace::discover(dir.path())?;
        let options = BootstrapOptions {
            allow_missing: true,
            ..BootstrapOptions::default()
        };

        let bootstrap = Bootstrap::with_runner(Settings::default(), options, "", NoRunner);
        let result = bootstrap.check_required_files(&workspace)?;
        assert_eq!(result.status, StepStatus::Skipped);

        Ok(())
    }

    #[test]
    fn missing_tools_without_install_fail() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        Repository::init(dir.path())?;
        let options = BootstrapOptions {
            no_install: true,
            ..BootstrapOptions::default()
        };

        let bootstrap =
            Bootstrap::with_runner(settings_without_required_files(), options, "", NoRunner);
        let result = bootstrap.run(dir.path());

        match result {
            Err(Error::ToolMissing(ProbeError::ToolMissing { tools })) => {
                assert_eq!(tools, vec!["isort", "black", "flake8", "pre-commit"]);
            }
            other => panic!("expected missing tools, got {other:?}"),
        }
        let workspace = Workspace::discover(dir.path())?;
        assert!(!workspace.pre_commit_hook().exists());

        Ok(())
    }

    #[test]
    fn create_directories_is_idempotent() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        Repository::init(dir.path())?;
        let workspace = Workspace::discover(dir.path())?;
        let mut settings = settings_without_required_files();
        settings.bootstrap.directories = vec![PathBuf::from("reports"), PathBuf::from("logs/run")];

        let bootstrap =
            Bootstrap::with_runner(settings, BootstrapOptions::default(), "", NoRunner);
        bootstrap.create_directories(&workspace)?;
        let result = bootstrap.create_directories(&workspace)?;

        assert_eq!(result.map(|result| result.status), Some(StepStatus::Passed));
        assert!(dir.path().join("reports").is_dir());
        assert!(dir.path().join("logs/run").is_dir());

        Ok(())
    }
}
