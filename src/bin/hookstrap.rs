// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use hookstrap::{
    probe::ProbeError, Bootstrap, BootstrapOptions, FileSet, FormatMode, FormattingRunner,
    HookInstaller, Prober, Settings, Summary, SystemRunner, ToolRequirement, Workspace,
};

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::ProgressBar;
use std::{
    env,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "hookstrap [options] <hookstrap-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self, progress: &ProgressBar) -> Result<i32> {
        match self.command {
            Command::Bootstrap(ref opts) => run_bootstrap(&self.global, opts, progress),
            Command::Format(ref opts) => run_format(&self.global, opts, progress),
            Command::InstallHooks(ref opts) => run_install_hooks(&self.global, opts),
            Command::Probe => run_probe(&self.global),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct GlobalOptions {
    /// Run as if started in target directory.
    #[arg(short = 'C', global = true, value_name = "dir", default_value = ".")]
    pub directory: PathBuf,

    /// Use target configuration file instead of looking one up.
    #[arg(short, long, global = true, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Override wrap width shared by every tool.
    #[arg(long, global = true, value_name = "columns")]
    pub line_length: Option<usize>,

    /// Increase log verbosity.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOptions {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }

    /// Load settings for target work tree, applying command-line overrides.
    fn settings(&self, work_tree: &Path) -> Result<Settings> {
        let mut settings = Settings::load(work_tree, self.config.as_deref())?;
        if let Some(line_length) = self.line_length {
            anyhow::ensure!(line_length > 0, "line length must be greater than zero");
            settings.format.line_length = line_length;
        }

        Ok(settings)
    }

    /// Top of the enclosing work tree, or the directory itself outside one.
    fn config_root(&self) -> PathBuf {
        Workspace::discover(&self.directory)
            .map(|workspace| workspace.root().to_path_buf())
            .unwrap_or_else(|_| self.directory.clone())
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Provision tools, format sources, and install commit hooks.
    #[command(override_usage = "hookstrap bootstrap [options]")]
    Bootstrap(BootstrapArgs),

    /// Sort imports, format, and lint source files.
    #[command(override_usage = "hookstrap format [options] [<path>]")]
    Format(FormatArgs),

    /// Install pre-commit hook and hook framework configuration.
    #[command(override_usage = "hookstrap install-hooks [options]")]
    InstallHooks(InstallHooksArgs),

    /// Report which required tools are present.
    #[command(override_usage = "hookstrap probe [options]")]
    Probe,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BootstrapArgs {
    /// Fail on missing tools instead of installing them.
    #[arg(long)]
    pub no_install: bool,

    /// Continue when required project files are missing.
    #[arg(long)]
    pub allow_missing: bool,

    /// Skip formatting of source files.
    #[arg(long)]
    pub no_format: bool,

    /// Overwrite existing hook framework configuration.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FormatArgs {
    /// Only verify, fail if any file would change.
    #[arg(long)]
    pub check: bool,

    /// Log sorter and formatter failures instead of failing.
    #[arg(long, conflicts_with = "check")]
    pub permissive: bool,

    /// Directory to format instead of the whole work tree.
    #[arg(value_name = "path")]
    pub path: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallHooksArgs {
    /// Overwrite existing hook framework configuration.
    #[arg(short, long)]
    pub force: bool,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level()));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    let progress = ProgressBar::new_spinner();
    let result = cli.run(&progress);
    progress.finish_and_clear();

    match result {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn run_bootstrap(global: &GlobalOptions, opts: &BootstrapArgs, progress: &ProgressBar) -> Result<i32> {
    let workspace = Workspace::discover(&global.directory)?;
    let settings = global.settings(workspace.root())?;
    let options = BootstrapOptions {
        no_install: opts.no_install,
        allow_missing: opts.allow_missing,
        no_format: opts.no_format,
        force: opts.force,
    };

    let bootstrap = Bootstrap::with_runner(
        settings,
        options,
        env::var_os("PATH").unwrap_or_default(),
        SystemRunner::with_progress(progress.clone()),
    );
    let summary = bootstrap.run(workspace.root())?;
    progress.finish_and_clear();

    report(&summary, true)
}

fn run_format(global: &GlobalOptions, opts: &FormatArgs, progress: &ProgressBar) -> Result<i32> {
    let (root, mut settings) = match &opts.path {
        Some(path) => {
            let root = global.directory.join(path);
            (root, global.settings(&global.config_root())?)
        }
        None => {
            let workspace = Workspace::discover(&global.directory)?;
            let settings = global.settings(workspace.root())?;
            (workspace.root().to_path_buf(), settings)
        }
    };
    if opts.permissive {
        settings.format.blocking = false;
    }

    let mode = if opts.check {
        FormatMode::Check
    } else {
        FormatMode::Apply
    };

    let files = FileSet::collect(&root, &settings.format)?;
    let formatter = FormattingRunner::new(
        settings.format,
        mode,
        SystemRunner::with_progress(progress.clone()),
    );

    let mut summary = Summary::new();
    summary.extend(formatter.run(&files));
    progress.finish_and_clear();

    report(&summary, mode == FormatMode::Apply)
}

fn run_install_hooks(global: &GlobalOptions, opts: &InstallHooksArgs) -> Result<i32> {
    let workspace = Workspace::discover(&global.directory)?;
    let settings = global.settings(workspace.root())?;

    let installer = HookInstaller::new(workspace, settings.format).force(opts.force);
    let mut summary = Summary::new();
    summary.extend(installer.install()?);

    report(&summary, false)
}

fn run_probe(global: &GlobalOptions) -> Result<i32> {
    let settings = global.settings(&global.config_root())?;
    let report = Prober::from_env().probe(&ToolRequirement::standard(&settings));
    print!("{report}");

    if !report.is_complete() {
        return Err(ProbeError::ToolMissing {
            tools: report.missing_names(),
        }
        .into());
    }

    Ok(0)
}

/// Print summary, then return its exit code.
fn report(summary: &Summary, hints: bool) -> Result<i32> {
    print!("{summary}");

    if let Some(failure) = summary.failure() {
        return Err(failure.into());
    }

    if summary.lint_count() > 0 {
        info!("{} style findings reported, they do not block commits", summary.lint_count());
    }

    if hints {
        println!();
        println!("Next steps:");
        println!("  1. Review the changes with `git diff`.");
        println!("  2. Stage them with `git add -A`.");
        println!("  3. Commit as usual, the pre-commit hook keeps new changes formatted.");
    }

    Ok(summary.exit_code())
}
