// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Step results and final summary.
//!
//! Each step of a run leaves behind a [`RunResult`]. The [`Summary`] collects
//! them and decides whether the run as a whole failed. Only a failed
//! __blocking__ step fails the run; advisory steps, like linting, are
//! reported but never change the exit code.

use crate::format::LintItem;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Named step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Resolve required tools.
    Probe,

    /// Install one missing package.
    Install { package: String },

    /// Check for project files the setup expects.
    RequiredFiles,

    /// Create project directories.
    Directories,

    /// Sort imports with isort.
    Sort,

    /// Format code with black.
    Format,

    /// Check code style with flake8.
    Lint,

    /// Write the pre-commit hook script.
    HookScript,

    /// Write the hook framework configuration.
    FrameworkConfig,
}

impl Display for Step {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Probe => fmt.write_str("tool probe"),
            Self::Install { package } => write!(fmt, "install {package}"),
            Self::RequiredFiles => fmt.write_str("required project files"),
            Self::Directories => fmt.write_str("project directories"),
            Self::Sort => fmt.write_str("isort (import sorting)"),
            Self::Format => fmt.write_str("black (code formatting)"),
            Self::Lint => fmt.write_str("flake8 (style checking)"),
            Self::HookScript => fmt.write_str("pre-commit hook"),
            Self::FrameworkConfig => fmt.write_str("pre-commit configuration"),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub step: Step,
    pub status: StepStatus,

    /// Failure of this step fails the run.
    pub blocking: bool,

    /// Exit code of the external tool, if one ran.
    pub exit_code: Option<i32>,

    /// Captured stdout and stderr.
    pub output: String,

    /// Style findings, only filled by the lint step.
    pub lint: Vec<LintItem>,
}

impl RunResult {
    /// Construct passed step result.
    pub fn passed(step: Step, blocking: bool, output: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Passed,
            blocking,
            exit_code: Some(0),
            output: output.into(),
            lint: Vec::new(),
        }
    }

    /// Construct failed step result.
    pub fn failed(
        step: Step,
        blocking: bool,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            blocking,
            exit_code,
            output: output.into(),
            lint: Vec::new(),
        }
    }

    /// Construct skipped step result.
    pub fn skipped(step: Step, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            blocking: false,
            exit_code: None,
            output: reason.into(),
            lint: Vec::new(),
        }
    }

    /// Step failed and its failure fails the run.
    pub fn is_hard_failure(&self) -> bool {
        self.blocking && self.status == StepStatus::Failed
    }
}

/// Collected results of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    results: Vec<RunResult>,
}

impl Summary {
    /// Construct new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step result.
    pub fn push(&mut self, result: RunResult) {
        self.results.push(result);
    }

    /// Record a listing of step results.
    pub fn extend(&mut self, results: impl IntoIterator<Item = RunResult>) {
        self.results.extend(results);
    }

    /// All recorded results in step order.
    pub fn results(&self) -> &[RunResult] {
        self.results.as_slice()
    }

    /// Find first result of target step.
    pub fn find(&self, step: &Step) -> Option<&RunResult> {
        self.results.iter().find(|result| &result.step == step)
    }

    /// Results whose failure fails the run.
    pub fn hard_failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|result| result.is_hard_failure())
    }

    /// Total advisory style findings.
    pub fn lint_count(&self) -> usize {
        self.results.iter().map(|result| result.lint.len()).sum()
    }

    /// No blocking step failed.
    pub fn is_success(&self) -> bool {
        self.hard_failures().next().is_none()
    }

    /// Process exit code for this summary.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// First blocking failure as an error.
    pub fn failure(&self) -> Option<crate::Error> {
        self.hard_failures()
            .next()
            .map(|result| crate::Error::FormattingToolFailure {
                step: result.step.clone(),
                code: result.exit_code,
            })
    }
}

impl Display for Summary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "Summary")?;
        for result in &self.results {
            let marker = match (result.status, result.blocking) {
                (StepStatus::Passed, _) => "ok  ",
                (StepStatus::Skipped, _) => "skip",
                (StepStatus::Failed, true) => "FAIL",
                (StepStatus::Failed, false) => "warn",
            };
            write!(fmt, "  [{marker}] {}", result.step)?;
            if !result.lint.is_empty() {
                write!(fmt, " ({} findings)", result.lint.len())?;
            }
            writeln!(fmt)?;
        }

        if self.is_success() {
            writeln!(fmt, "All blocking steps passed.")?;
        } else {
            writeln!(fmt, "Some blocking steps failed, review the output above.")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn lint_item() -> LintItem {
        LintItem {
            path: "app.py".into(),
            line: 3,
            column: 121,
            code: "E501".into(),
            message: "line too long (130 > 120 characters)".into(),
        }
    }

    #[test]
    fn advisory_failure_does_not_fail_summary() {
        let mut summary = Summary::new();
        summary.push(RunResult::passed(Step::Sort, true, ""));
        summary.push(RunResult::passed(Step::Format, true, ""));
        let mut lint = RunResult::failed(Step::Lint, false, Some(1), "app.py:3:121: E501 ...");
        lint.lint.push(lint_item());
        summary.push(lint);

        assert!(summary.is_success());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.lint_count(), 1);
    }

    #[test]
    fn blocking_failure_fails_summary() {
        let mut summary = Summary::new();
        summary.push(RunResult::failed(Step::Format, true, Some(123), "error: cannot format"));
        summary.push(RunResult::skipped(Step::Lint, "nothing to lint"));

        assert!(!summary.is_success());
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.hard_failures().count(), 1);
        assert!(matches!(
            summary.failure(),
            Some(crate::Error::FormattingToolFailure { step: Step::Format, code: Some(123) })
        ));
    }

    #[test]
    fn display_summary_table() {
        let mut summary = Summary::new();
        summary.push(RunResult::passed(Step::Sort, true, ""));
        summary.push(RunResult::failed(Step::Format, false, Some(1), ""));
        let mut lint = RunResult::failed(Step::Lint, false, Some(1), "");
        lint.lint.push(lint_item());
        summary.push(lint);
        summary.push(RunResult::skipped(Step::FrameworkConfig, "already present"));

        let expect = indoc! {"
            Summary
              [ok  ] isort (import sorting)
              [warn] black (code formatting)
              [warn] flake8 (style checking) (1 findings)
              [skip] pre-commit configuration
            All blocking steps passed.
        "};
        assert_eq!(summary.to_string(), expect);
    }
}
