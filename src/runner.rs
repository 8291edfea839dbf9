// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External tool invocation.
//!
//! Every meaningful action Hookstrap takes is delegated to an external
//! program. The [`ToolRunner`] trait is the single place where those programs
//! get spawned, so the rest of the crate only deals in [`Invocation`] and
//! [`ToolOutput`] values. Exit status and both output streams are always
//! captured instead of streamed, which lets the final summary report on each
//! tool without running it again.

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};
use tracing::{debug, instrument};

/// A single external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    cwd: PathBuf,
}

impl Invocation {
    /// Construct new invocation of target program from target directory.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    pub fn arguments(&self) -> &[OsString] {
        self.args.as_slice()
    }

    pub fn cwd(&self) -> &Path {
        self.cwd.as_path()
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program)?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, absent if the program was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Program exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Combine both output streams into one message.
    ///
    /// Trailing newlines are chomped.
    pub fn message(&self) -> String {
        let mut message = String::new();

        if !self.stdout.is_empty() {
            message.push_str(self.stdout.as_str());
        }

        if !self.stderr.is_empty() {
            if !message.is_empty() && !message.ends_with('\n') {
                message.push('\n');
            }
            message.push_str(self.stderr.as_str());
        }

        // INVARIANT: Chomp trailing newlines.
        message.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Run external programs to completion.
pub trait ToolRunner {
    /// Run invocation, blocking until the program exits.
    ///
    /// A non-zero exit is not an error at this level; callers inspect the
    /// returned [`ToolOutput`].
    ///
    /// # Errors
    ///
    /// - Return [`RunnerError::NotFound`] if the program cannot be found.
    /// - Return [`RunnerError::Spawn`] if the program cannot be started for
    ///   any other reason.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

impl<R> ToolRunner for &R
where
    R: ToolRunner + ?Sized,
{
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        (**self).run(invocation)
    }
}

/// Runner spawning real processes.
///
/// Shows a spinner with the running command on interactive terminals. The
/// spinner is hidden by default.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    bar: ProgressBar,
}

impl SystemRunner {
    /// Construct new runner without progress display.
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Construct new runner that reports through target spinner.
    pub fn with_progress(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template("{spinner:.yellow} {msg}") {
            bar.set_style(style);
        }

        Self { bar }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for SystemRunner {
    #[instrument(skip(self, invocation), level = "debug")]
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        debug!("run {invocation} in {:?}", invocation.cwd().display());
        self.bar.set_message(invocation.program().to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));

        let result = Command::new(OsStr::new(invocation.program()))
            .args(invocation.arguments())
            .current_dir(invocation.cwd())
            .output();
        self.bar.disable_steady_tick();
        self.bar.set_message("");

        let output = result.map_err(|err| match err.kind() {
            ErrorKind::NotFound => RunnerError::NotFound {
                program: invocation.program().to_string(),
            },
            _ => RunnerError::Spawn {
                source: err,
                program: invocation.program().to_string(),
            },
        })?;

        let output = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        };
        debug!("{} exited with {:?}", invocation.program(), output.code);

        Ok(output)
    }
}

/// Tool invocation error types.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Program is not on the search path.
    #[error("command not found: {program}")]
    NotFound { program: String },

    /// Program exists but could not be started.
    #[error("failed to run {program}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RunnerError> = std::result::Result<T, E>;
