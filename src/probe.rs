// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tool presence probing and installation.
//!
//! Hookstrap depends on four external tools: isort, black, flake8, and
//! pre-commit. Before anything runs, the [`Prober`] resolves each of them on
//! the search path and partitions them into present and missing. Probing is
//! read-only. Whether a missing tool gets installed is the caller's call,
//! made through an [`Installer`].
//!
//! # Robustness
//!
//! Sandboxed environments often deny access to parts of the search path. A
//! directory or candidate that cannot be inspected is skipped, and a tool
//! that cannot be positively resolved is reported as missing. So is a tool
//! that resolves but cannot answer `--version`. The probe itself never
//! fails.

use crate::{
    config::Settings,
    report::{RunResult, Step},
    runner::{Invocation, SystemRunner, ToolRunner},
};

use std::{
    cmp::Ordering,
    env,
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, instrument, warn};

/// Names of the tools every project needs, in invocation order.
pub const STANDARD_TOOLS: [&str; 4] = ["isort", "black", "flake8", "pre-commit"];

/// External tool that must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    /// Human-facing tool name.
    pub name: String,

    /// Executable looked up on the search path.
    pub command: String,

    /// Package that provides the executable.
    pub package: String,

    /// Lowest acceptable version, if any.
    pub min_version: Option<Version>,
}

impl ToolRequirement {
    /// Construct new requirement whose command and package share its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            command: name.clone(),
            package: name.clone(),
            name,
            min_version: None,
        }
    }

    /// Require at least target version.
    pub fn with_min_version(mut self, version: Version) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Build the standard requirement list.
    ///
    /// Minimum versions come from the `[tools]` table of the settings.
    /// Entries naming unknown tools, or holding unparsable versions, are
    /// ignored with a warning.
    pub fn standard(settings: &Settings) -> Vec<Self> {
        for name in settings.tools.keys() {
            if !STANDARD_TOOLS.contains(&name.as_str()) {
                warn!("ignoring version constraint for unknown tool {name:?}");
            }
        }

        STANDARD_TOOLS
            .iter()
            .map(|name| {
                let requirement = Self::new(*name);
                match settings.tools.get(*name).map(|raw| raw.parse::<Version>()) {
                    Some(Ok(version)) => requirement.with_min_version(version),
                    Some(Err(err)) => {
                        warn!("ignoring minimum version for {name}: {err}");
                        requirement
                    }
                    None => requirement,
                }
            })
            .collect()
    }
}

/// Dotted numeric version, e.g., `23.12.1`.
///
/// Missing trailing components compare as zero, so `23.1` equals `23.1.0`.
#[derive(Debug, Clone, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    /// Extract first dotted numeric version from free-form text.
    ///
    /// Tools print their version in all sorts of ways, e.g., "black, 23.12.1
    /// (compiled: yes)" or "7.0.0 (mccabe: 0.7.0) CPython 3.12.1 on Linux".
    /// The first token made of digits and at least one dot wins.
    pub fn extract(text: &str) -> Option<Self> {
        text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .map(|token| token.trim_matches('.'))
            .filter(|token| token.contains('.'))
            .find_map(|token| token.parse().ok())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let parts = data
            .trim()
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError(data.to_string()))?;

        if parts.is_empty() {
            return Err(VersionError(data.to_string()));
        }

        Ok(Self(parts))
    }
}

impl Display for Version {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let parts = self.0.iter().map(u64::to_string).collect::<Vec<_>>();
        fmt.write_str(parts.join(".").as_str())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for index in 0..len {
            let lhs = self.0.get(index).copied().unwrap_or(0);
            let rhs = other.0.get(index).copied().unwrap_or(0);
            match lhs.cmp(&rhs) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }

        Ordering::Equal
    }
}

/// Version string could not be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid version {0:?}")]
pub struct VersionError(String);

/// Tool that was resolved on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentTool {
    pub requirement: ToolRequirement,
    pub path: PathBuf,
    pub version: Option<Version>,
}

/// Tool that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTool {
    pub requirement: ToolRequirement,
    pub reason: MissingReason,
}

/// Why a tool counts as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// No candidate on the search path.
    NotFound,

    /// A candidate exists but could not be inspected.
    Inaccessible,

    /// Version could not be determined while a minimum is required.
    VersionUnknown,

    /// Tool exists but fails to report its version.
    Broken,

    /// Found version is below the required minimum.
    Outdated { found: Version, required: Version },
}

impl Display for MissingReason {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NotFound => fmt.write_str("not found"),
            Self::Inaccessible => fmt.write_str("not accessible"),
            Self::VersionUnknown => fmt.write_str("version unknown"),
            Self::Broken => fmt.write_str("fails to run `--version`"),
            Self::Outdated { found, required } => {
                write!(fmt, "version {found} is older than {required}")
            }
        }
    }
}

/// Partition of requirements into present and missing tools.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub present: Vec<PresentTool>,
    pub missing: Vec<MissingTool>,
}

impl ProbeReport {
    /// Every requirement is satisfied.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Names of missing tools.
    pub fn missing_names(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|tool| tool.requirement.name.clone())
            .collect()
    }

    /// Convert report into a summary entry.
    pub fn to_run_result(&self) -> RunResult {
        if self.is_complete() {
            RunResult::passed(Step::Probe, true, self.to_string())
        } else {
            RunResult::failed(Step::Probe, true, None, self.to_string())
        }
    }
}

impl Display for ProbeReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for tool in &self.present {
            let version = tool
                .version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown version".into());
            writeln!(
                fmt,
                "found {} {version} at {}",
                tool.requirement.name,
                tool.path.display()
            )?;
        }

        for tool in &self.missing {
            writeln!(fmt, "missing {}: {}", tool.requirement.name, tool.reason)?;
        }

        Ok(())
    }
}

/// Read-only tool resolver.
#[derive(Debug, Clone)]
pub struct Prober<R = SystemRunner>
where
    R: ToolRunner,
{
    search_path: OsString,
    runner: R,
}

impl Prober<SystemRunner> {
    /// Construct new prober over the current `PATH`.
    pub fn from_env() -> Self {
        Self::new(env::var_os("PATH").unwrap_or_default(), SystemRunner::new())
    }
}

impl<R> Prober<R>
where
    R: ToolRunner,
{
    /// Construct new prober over target search path.
    ///
    /// The runner is only used to query versions.
    pub fn new(search_path: impl Into<OsString>, runner: R) -> Self {
        Self {
            search_path: search_path.into(),
            runner,
        }
    }

    /// Partition requirements into present and missing tools.
    #[instrument(skip(self, requirements), level = "debug")]
    pub fn probe(&self, requirements: &[ToolRequirement]) -> ProbeReport {
        let mut report = ProbeReport::default();

        for requirement in requirements {
            match self.probe_one(requirement) {
                Ok(tool) => {
                    debug!("{} resolved to {:?}", requirement.name, tool.path.display());
                    report.present.push(tool);
                }
                Err(reason) => {
                    debug!("{} missing: {reason}", requirement.name);
                    report.missing.push(MissingTool {
                        requirement: requirement.clone(),
                        reason,
                    });
                }
            }
        }

        report
    }

    fn probe_one(&self, requirement: &ToolRequirement) -> Result<PresentTool, MissingReason> {
        let path = self.resolve(&requirement.command)?;
        let version = self.query_version(&path)?;

        if let Some(required) = &requirement.min_version {
            match &version {
                None => return Err(MissingReason::VersionUnknown),
                Some(found) if found < required => {
                    return Err(MissingReason::Outdated {
                        found: found.clone(),
                        required: required.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(PresentTool {
            requirement: requirement.clone(),
            path,
            version,
        })
    }

    /// Resolve command to an executable file on the search path.
    ///
    /// Commands with a path component are resolved against the current
    /// directory instead of being searched for.
    pub fn resolve(&self, command: &str) -> Result<PathBuf, MissingReason> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(command, Some(&self.search_path), &cwd).map_err(|err| {
            debug!("cannot resolve {command}: {err}");
            self.diagnose(command)
        })
    }

    /// Tell an absent command apart from one hidden behind an unreadable
    /// search path entry.
    fn diagnose(&self, command: &str) -> MissingReason {
        for dir in env::split_paths(&self.search_path) {
            match fs::metadata(dir.join(command)) {
                Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                    debug!("cannot inspect {:?}: {err}", dir.display());
                    return MissingReason::Inaccessible;
                }
                _ => continue,
            }
        }

        MissingReason::NotFound
    }

    /// Ask a resolved tool for its version.
    ///
    /// A tool that cannot answer `--version` successfully is broken, e.g., a
    /// wrapper script whose interpreter lost the package it launches.
    fn query_version(&self, path: &Path) -> Result<Option<Version>, MissingReason> {
        let cwd = path.parent().unwrap_or(Path::new("."));
        let invocation = Invocation::new(path.to_string_lossy(), cwd).arg("--version");
        match self.runner.run(&invocation) {
            Ok(output) if output.success() => Ok(Version::extract(&output.message())),
            Ok(output) => {
                debug!("{invocation} exited with {:?}", output.code);
                Err(MissingReason::Broken)
            }
            Err(err) => {
                debug!("{invocation} could not run: {err}");
                Err(MissingReason::Broken)
            }
        }
    }
}

/// Policy-gated installer for missing tools.
#[derive(Debug, Clone)]
pub struct Installer<R = SystemRunner>
where
    R: ToolRunner,
{
    command: Vec<String>,
    enabled: bool,
    cwd: PathBuf,
    runner: R,
}

impl<R> Installer<R>
where
    R: ToolRunner,
{
    /// Construct new installer.
    ///
    /// Each package is installed by running target command with the package
    /// name appended, from target directory.
    pub fn new(command: Vec<String>, enabled: bool, cwd: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            command,
            enabled,
            cwd: cwd.into(),
            runner,
        }
    }

    /// Install every missing tool of a probe report.
    ///
    /// Returns one summary entry per installed package.
    ///
    /// # Errors
    ///
    /// - Return [`ProbeError::ToolMissing`] if tools are missing while
    ///   installation is disabled.
    /// - Return [`ProbeError::InstallFailed`] if the installer command cannot
    ///   run or exits non-zero for any package.
    #[instrument(skip(self, report), level = "debug")]
    pub fn install_missing(&self, report: &ProbeReport) -> Result<Vec<RunResult>> {
        if report.is_complete() {
            return Ok(Vec::new());
        }

        if !self.enabled {
            return Err(ProbeError::ToolMissing {
                tools: report.missing_names(),
            });
        }

        let (program, base_args) = self.command.split_first().ok_or(ProbeError::NoInstaller)?;
        let mut results = Vec::new();
        for tool in &report.missing {
            let package = tool.requirement.package.as_str();
            info!("install {package}");
            let invocation = Invocation::new(program.as_str(), &self.cwd)
                .args(base_args)
                .arg(package);

            let output = self
                .runner
                .run(&invocation)
                .map_err(|err| ProbeError::InstallFailed {
                    package: package.to_string(),
                    output: err.to_string(),
                })?;

            if !output.success() {
                return Err(ProbeError::InstallFailed {
                    package: package.to_string(),
                    output: output.message(),
                });
            }

            results.push(RunResult::passed(
                Step::Install {
                    package: package.to_string(),
                },
                true,
                output.message(),
            ));
        }

        Ok(results)
    }
}

/// Tool provisioning error types.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Tools are missing and may not be installed.
    #[error("required tools missing: {}", tools.join(", "))]
    ToolMissing { tools: Vec<String> },

    /// Package installer failed.
    #[error("failed to install {package}:\n{output}")]
    InstallFailed { package: String, output: String },

    /// Package installer command is empty.
    #[error("no package installer configured")]
    NoInstaller,
}

/// Friendly result alias :3
type Result<T, E = ProbeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunnerError, ToolOutput};
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::cell::RefCell;

    /// Runner answering every invocation with one canned output.
    struct CannedRunner {
        output: Option<ToolOutput>,
        seen: RefCell<Vec<String>>,
    }

    impl CannedRunner {
        fn new(output: Option<ToolOutput>) -> Self {
            Self {
                output,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for CannedRunner {
        fn run(&self, invocation: &Invocation) -> crate::runner::Result<ToolOutput> {
            self.seen.borrow_mut().push(invocation.to_string());
            self.output.clone().ok_or(RunnerError::NotFound {
                program: invocation.program().to_string(),
            })
        }
    }

    fn version_output(text: &str) -> Option<ToolOutput> {
        Some(ToolOutput {
            code: Some(0),
            stdout: text.into(),
            stderr: String::new(),
        })
    }

    #[test_case("black, 23.12.1 (compiled: yes)", "23.12.1"; "black style")]
    #[test_case("7.0.0 (mccabe: 0.7.0) CPython 3.12.1 on Linux", "7.0.0"; "flake8 style")]
    #[test_case("pre-commit 3.6.0", "3.6.0"; "pre-commit style")]
    #[test_case("isort 5.13.2.", "5.13.2"; "trailing dot")]
    #[test]
    fn extract_version(text: &str, expect: &str) {
        use pretty_assertions::assert_eq;
        let result = Version::extract(text).map(|version| version.to_string());
        assert_eq!(result, Some(expect.to_string()));
    }

    #[test]
    fn extract_version_without_digits() {
        assert_eq!(Version::extract("unknown"), None);
    }

    #[test_case("23.1", "23.1.0", Ordering::Equal; "padding")]
    #[test_case("22.12.0", "23.1", Ordering::Less; "major")]
    #[test_case("5.13.2", "5.9", Ordering::Greater; "numeric not lexical")]
    #[test]
    fn compare_versions(lhs: &str, rhs: &str, expect: Ordering) -> anyhow::Result<()> {
        use pretty_assertions::assert_eq;
        let lhs: Version = lhs.parse()?;
        let rhs: Version = rhs.parse()?;
        assert_eq!(lhs.cmp(&rhs), expect);

        Ok(())
    }

    #[test]
    fn standard_requirements_pick_up_min_versions() {
        let mut settings = Settings::default();
        settings.tools.insert("black".into(), "23.1".into());
        settings.tools.insert("flake8".into(), "not-a-version".into());

        let result = ToolRequirement::standard(&settings);
        let names = result.iter().map(|req| req.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, STANDARD_TOOLS.to_vec());
        assert_eq!(result[1].min_version, Some("23.1".parse().unwrap()));
        assert_eq!(result[2].min_version, None);
    }

    #[test]
    fn empty_search_path_reports_everything_missing() {
        let prober = Prober::new("", CannedRunner::new(None));
        let report = prober.probe(&[ToolRequirement::new("black"), ToolRequirement::new("isort")]);
        assert!(report.present.is_empty());
        assert_eq!(report.missing_names(), vec!["black", "isort"]);
        assert!(report
            .missing
            .iter()
            .all(|tool| tool.reason == MissingReason::NotFound));
    }

    #[cfg(unix)]
    mod on_disk {
        use super::*;
        use pretty_assertions::assert_eq;
        use simple_test_case::test_case;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_tool(dir: &Path, name: &str, mode: u32) -> anyhow::Result<PathBuf> {
            let path = dir.join(name);
            fs::write(&path, "#!/bin/sh\necho 1.0.0\n")?;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))?;
            Ok(path)
        }

        #[test]
        fn resolve_executable_on_search_path() -> anyhow::Result<()> {
            let empty = TempDir::new()?;
            let bin = TempDir::new()?;
            let expect = fake_tool(bin.path(), "black", 0o755)?;
            let search_path = env::join_paths([empty.path(), bin.path()])?;

            let prober = Prober::new(search_path, CannedRunner::new(version_output("black, 24.2.0")));
            let report = prober.probe(&[ToolRequirement::new("black")]);
            let expect = vec![PresentTool {
                requirement: ToolRequirement::new("black"),
                path: expect,
                version: Some("24.2.0".parse()?),
            }];
            assert_eq!(report.present, expect);
            assert!(report.is_complete());

            Ok(())
        }

        #[test]
        fn non_executable_file_is_missing() -> anyhow::Result<()> {
            let bin = TempDir::new()?;
            fake_tool(bin.path(), "flake8", 0o644)?;

            let prober = Prober::new(bin.path().as_os_str(), CannedRunner::new(None));
            let report = prober.probe(&[ToolRequirement::new("flake8")]);
            assert_eq!(report.missing_names(), vec!["flake8"]);

            Ok(())
        }

        #[test]
        fn outdated_tool_is_missing() -> anyhow::Result<()> {
            let bin = TempDir::new()?;
            fake_tool(bin.path(), "isort", 0o755)?;

            let prober = Prober::new(bin.path().as_os_str(), CannedRunner::new(version_output("5.9.3")));
            let requirement = ToolRequirement::new("isort").with_min_version("5.13".parse()?);
            let report = prober.probe(&[requirement]);
            let expect = MissingReason::Outdated {
                found: "5.9.3".parse()?,
                required: "5.13".parse()?,
            };
            assert_eq!(report.missing[0].reason, expect);

            Ok(())
        }

        #[test]
        fn unknown_version_with_minimum_is_missing() -> anyhow::Result<()> {
            let bin = TempDir::new()?;
            fake_tool(bin.path(), "isort", 0o755)?;

            let prober = Prober::new(bin.path().as_os_str(), CannedRunner::new(version_output("isort")));
            let requirement = ToolRequirement::new("isort").with_min_version("5.0".parse()?);
            let report = prober.probe(&[requirement]);
            assert_eq!(report.missing[0].reason, MissingReason::VersionUnknown);

            Ok(())
        }

        #[test_case(Some(1); "version exits non-zero")]
        #[test_case(None; "version cannot run")]
        #[test]
        fn broken_tool_is_missing(code: Option<i32>) -> anyhow::Result<()> {
            use pretty_assertions::assert_eq;
            let bin = TempDir::new()?;
            fake_tool(bin.path(), "black", 0o755)?;

            let output = code.map(|code| ToolOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: "ModuleNotFoundError: No module named 'black'".into(),
            });
            let prober = Prober::new(bin.path().as_os_str(), CannedRunner::new(output));
            let report = prober.probe(&[ToolRequirement::new("black")]);

            assert!(report.present.is_empty());
            assert_eq!(report.missing[0].reason, MissingReason::Broken);

            Ok(())
        }

        #[test]
        fn unreadable_search_path_entry_is_missing() -> anyhow::Result<()> {
            let locked = TempDir::new()?;
            fake_tool(locked.path(), "flake8", 0o000)?;
            fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o000))?;

            let prober = Prober::new(locked.path().as_os_str(), CannedRunner::new(version_output("7.0.0")));
            let report = prober.probe(&[ToolRequirement::new("flake8")]);

            // INVARIANT: Restore access so the directory can be cleaned up.
            fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755))?;

            assert!(report.present.is_empty());
            assert!(matches!(
                report.missing[0].reason,
                MissingReason::Inaccessible | MissingReason::NotFound
            ));

            Ok(())
        }
    }

    #[test]
    fn installer_disabled_reports_missing_tools() {
        let report = ProbeReport {
            present: Vec::new(),
            missing: vec![MissingTool {
                requirement: ToolRequirement::new("black"),
                reason: MissingReason::NotFound,
            }],
        };
        let installer = Installer::new(
            vec!["pip".into(), "install".into()],
            false,
            ".",
            CannedRunner::new(None),
        );
        let result = installer.install_missing(&report);
        assert!(matches!(result, Err(ProbeError::ToolMissing { tools }) if tools == vec!["black"]));
    }

    #[test]
    fn installer_runs_command_per_missing_package() -> anyhow::Result<()> {
        let report = ProbeReport {
            present: Vec::new(),
            missing: ["black", "flake8"]
                .map(|name| MissingTool {
                    requirement: ToolRequirement::new(name),
                    reason: MissingReason::NotFound,
                })
                .to_vec(),
        };
        let runner = CannedRunner::new(version_output("Successfully installed"));
        let installer = Installer::new(
            ["python3", "-m", "pip", "install"].map(String::from).to_vec(),
            true,
            ".",
            &runner,
        );

        let results = installer.install_missing(&report)?;
        assert_eq!(results.len(), 2);
        assert_eq!(
            runner.seen.borrow().clone(),
            vec![
                "python3 -m pip install black".to_string(),
                "python3 -m pip install flake8".to_string(),
            ]
        );

        Ok(())
    }

    #[test]
    fn installer_failure_names_package() {
        let report = ProbeReport {
            present: Vec::new(),
            missing: vec![MissingTool {
                requirement: ToolRequirement::new("isort"),
                reason: MissingReason::NotFound,
            }],
        };
        let installer = Installer::new(
            vec!["pip".into(), "install".into()],
            true,
            ".",
            CannedRunner::new(Some(ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "no network".into(),
            })),
        );
        let result = installer.install_missing(&report);
        assert!(matches!(
            result,
            Err(ProbeError::InstallFailed { package, output }) if package == "isort" && output == "no network"
        ));
    }
}
