// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Formatting tool orchestration.
//!
//! Runs the three formatting tools over a [`FileSet`] in a fixed order:
//!
//! 1. __isort__ sorts imports.
//! 2. __black__ formats code.
//! 3. __flake8__ checks style.
//!
//! Imports must settle before black reflows line lengths, and flake8 must
//! see the final shape of the code. All three share one wrap width, so black
//! and flake8 never disagree about what counts as too long.
//!
//! # Blocking and Advisory Steps
//!
//! Sorting and formatting are __blocking__: a non-zero exit fails the run,
//! unless the run is permissive, in which case the failure is only logged.
//! Linting is __advisory__: its findings are parsed into [`LintItem`]s and
//! reported, but never fail the run.

use crate::{
    config::FormatSettings,
    fileset::FileSet,
    report::{RunResult, Step},
    runner::{Invocation, RunnerError, SystemRunner, ToolOutput, ToolRunner},
};

use std::{
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Files handed to a tool per invocation.
pub const BATCH_SIZE: usize = 256;

/// Whether tools may rewrite files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Rewrite files in place.
    #[default]
    Apply,

    /// Only verify, failing if any file would change.
    Check,
}

/// Single style finding reported by flake8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintItem {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
}

impl LintItem {
    /// Parse one line of `path:line:column: CODE message` output.
    ///
    /// Returns `None` for anything else, e.g., blank lines or tracebacks.
    pub fn parse(line: &str) -> Option<Self> {
        let parts = line.split(':').collect::<Vec<_>>();

        // INVARIANT: Path itself may contain colons, so find the first pair
        // of numeric fields followed by a message.
        let index = (1..parts.len().saturating_sub(2)).find(|&index| {
            parts[index].trim().parse::<u32>().is_ok()
                && parts[index + 1].trim().parse::<u32>().is_ok()
        })?;

        let path = parts[..index].join(":");
        let line_number = parts[index].trim().parse().ok()?;
        let column = parts[index + 1].trim().parse().ok()?;
        let rest = parts[index + 2..].join(":");
        let rest = rest.trim();
        let (code, message) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

        if path.is_empty() || code.is_empty() {
            return None;
        }

        Some(Self {
            path: PathBuf::from(path),
            line: line_number,
            column,
            code: code.to_string(),
            message: message.trim().to_string(),
        })
    }

    /// Parse every finding out of flake8 output.
    pub fn parse_all(output: &str) -> Vec<Self> {
        output.lines().filter_map(Self::parse).collect()
    }
}

impl Display for LintItem {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{}:{}:{}: {} {}",
            self.path.display(),
            self.line,
            self.column,
            self.code,
            self.message
        )
    }
}

/// Runs sorter, formatter, and style checker in order.
#[derive(Debug, Clone)]
pub struct FormattingRunner<R = SystemRunner>
where
    R: ToolRunner,
{
    settings: FormatSettings,
    mode: FormatMode,
    runner: R,
}

impl<R> FormattingRunner<R>
where
    R: ToolRunner,
{
    /// Construct new formatting runner.
    pub fn new(settings: FormatSettings, mode: FormatMode, runner: R) -> Self {
        Self {
            settings,
            mode,
            runner,
        }
    }

    /// Sort and format failures fail the run.
    ///
    /// Check mode is always blocking, since its whole point is to fail when
    /// files would change.
    pub fn is_blocking(&self) -> bool {
        self.settings.blocking || self.mode == FormatMode::Check
    }

    /// Run all three steps over target file set.
    ///
    /// Every step runs even if an earlier one failed, so the summary can
    /// report on all tools at once. An empty file set skips everything.
    #[instrument(skip(self, files), level = "debug")]
    pub fn run(&self, files: &FileSet) -> Vec<RunResult> {
        if files.is_empty() {
            info!("no source files to format");
            return [Step::Sort, Step::Format, Step::Lint]
                .into_iter()
                .map(|step| RunResult::skipped(step, "no source files"))
                .collect();
        }

        info!("format {} source files", files.len());
        vec![
            self.run_step(Step::Sort, files),
            self.run_step(Step::Format, files),
            self.run_step(Step::Lint, files),
        ]
    }

    /// Build invocation of a step's tool over one batch of files.
    pub fn invocation(&self, step: &Step, root: &Path, batch: &[PathBuf]) -> Invocation {
        let line_length = self.settings.line_length.to_string();
        let check = self.mode == FormatMode::Check;

        let invocation = match step {
            Step::Sort => {
                let invocation = Invocation::new("isort", root)
                    .args(["--profile", "black", "--line-length"])
                    .arg(line_length);
                if check {
                    invocation.args(["--check-only", "--diff"])
                } else {
                    invocation
                }
            }
            Step::Format => {
                let invocation = Invocation::new("black", root)
                    .arg("--line-length")
                    .arg(line_length);
                if check {
                    invocation.args(["--check", "--diff"])
                } else {
                    invocation
                }
            }
            _ => {
                let invocation = Invocation::new("flake8", root)
                    .arg("--max-line-length")
                    .arg(line_length);
                if self.settings.lint_ignore.is_empty() {
                    invocation
                } else {
                    invocation.arg("--ignore").arg(self.settings.lint_ignore.join(","))
                }
            }
        };

        invocation.args(batch.iter().map(OsString::from))
    }

    fn run_step(&self, step: Step, files: &FileSet) -> RunResult {
        let blocking = step != Step::Lint && self.is_blocking();
        info!("{step}");

        let mut code = Some(0);
        let mut output = String::new();
        for batch in files.batches(BATCH_SIZE) {
            let invocation = self.invocation(&step, files.root(), batch);
            match self.runner.run(&invocation) {
                Ok(result) => {
                    append(&mut output, &result);
                    if !result.success() && code == Some(0) {
                        code = result.code;
                    }
                }
                Err(err) => {
                    let package = invocation.program().to_string();
                    let hint = match err {
                        RunnerError::NotFound { .. } => {
                            format!("{err}\ninstall with: pip install {package}")
                        }
                        _ => err.to_string(),
                    };
                    warn!("{hint}");
                    return RunResult::failed(step, blocking, None, hint);
                }
            }
        }

        let mut result = if code == Some(0) {
            RunResult::passed(step.clone(), blocking, output)
        } else {
            if blocking {
                warn!("{step} failed");
            } else {
                warn!("{step} reported issues");
            }
            RunResult::failed(step.clone(), blocking, code, output)
        };

        if step == Step::Lint {
            result.lint = LintItem::parse_all(&result.output);
        }

        result
    }
}

fn append(output: &mut String, result: &ToolOutput) {
    let message = result.message();
    if message.is_empty() {
        return;
    }

    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(&message);
}
