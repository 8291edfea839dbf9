// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that Hookstrap reads to
//! decide how external tools are invoked. Every field has a default, so an
//! empty file, or no file at all, yields the standard setup: a 120 column
//! wrap width shared by all three tools, flake8 codes E203, W503, and E501
//! ignored, and the usual dependency, build, and cache directories excluded.
//!
//! # Lookup Order
//!
//! 1. Explicit path given on the command line.
//! 2. `hookstrap.toml` at the top of the work tree.
//! 3. `$XDG_CONFIG_HOME/hookstrap/config.toml`.
//! 4. Built-in defaults.
//!
//! The first file found wins. Files are never merged.

use crate::path::{project_config_file, user_config_file};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Top-level settings.
#[derive(Debug, PartialEq, Eq, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// How the formatting tools are invoked.
    pub format: FormatSettings,

    /// How the environment is provisioned.
    pub bootstrap: BootstrapSettings,

    /// Minimum tool versions keyed by tool name.
    pub tools: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings following the standard lookup order.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if an explicit configuration file cannot
    ///   be read, or a discovered one exists but cannot be read.
    /// - Return any parse error from [`Settings::from_str`].
    #[instrument(skip(work_tree, explicit), level = "debug")]
    pub fn load(work_tree: impl AsRef<Path>, explicit: Option<&Path>) -> Result<Self> {
        let candidates = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => {
                let mut paths = vec![project_config_file(work_tree.as_ref())];
                if let Ok(path) = user_config_file() {
                    paths.push(path);
                }
                paths
            }
        };

        for path in &candidates {
            // INVARIANT: Explicit files must exist, discovered files may not.
            if explicit.is_none() && !path.is_file() {
                continue;
            }

            debug!("load configuration from {:?}", path.display());
            let data = read_to_string(path).map_err(|err| ConfigError::Read {
                source: err,
                path: path.clone(),
            })?;
            return data.parse();
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path-like fields.
        settings.bootstrap.required_files = expand_paths(&settings.bootstrap.required_files)?;
        settings.bootstrap.directories = expand_paths(&settings.bootstrap.directories)?;

        if settings.format.line_length == 0 {
            return Err(ConfigError::LineLength);
        }

        glob::Pattern::new(&settings.format.include).map_err(|err| ConfigError::Pattern {
            source: err,
            pattern: settings.format.include.clone(),
        })?;

        if settings.bootstrap.installer.is_empty() {
            return Err(ConfigError::EmptyInstaller);
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Formatting tool settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatSettings {
    /// Wrap width shared by the sorter, formatter, and style checker.
    pub line_length: usize,

    /// Style checker codes that are never reported.
    pub lint_ignore: Vec<String>,

    /// Directory names pruned from the file set at any depth.
    pub exclude: Vec<String>,

    /// File name pattern selecting source files.
    pub include: String,

    /// Treat sorter or formatter failure as a hard failure.
    pub blocking: bool,

    /// Skip files ignored by the work tree's gitignore rules.
    pub respect_gitignore: bool,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            line_length: 120,
            lint_ignore: ["E203", "W503", "E501"].map(String::from).to_vec(),
            exclude: [
                ".git",
                ".venv",
                "venv",
                "env",
                "node_modules",
                "build",
                "dist",
                "__pycache__",
                ".tox",
                ".mypy_cache",
                ".pytest_cache",
                ".eggs",
            ]
            .map(String::from)
            .to_vec(),
            include: "*.py".into(),
            blocking: true,
            respect_gitignore: true,
        }
    }
}

/// Environment provisioning settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// Install missing tools instead of failing.
    pub auto_install: bool,

    /// Package installer invocation, package name is appended.
    pub installer: Vec<String>,

    /// Project files that must exist before anything is set up.
    pub required_files: Vec<PathBuf>,

    /// Continue with a warning when required project files are missing.
    pub allow_missing_files: bool,

    /// Directories created under the work tree if missing.
    pub directories: Vec<PathBuf>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            auto_install: true,
            installer: ["python3", "-m", "pip", "install"].map(String::from).to_vec(),
            required_files: [
                "scripts/calculate_metrics.py",
                "scripts/generate_reports.py",
                "utils/test_report_generator.py",
            ]
            .map(PathBuf::from)
            .to_vec(),
            allow_missing_files: false,
            directories: Vec::new(),
        }
    }
}

fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths
        .iter()
        .map(|path| {
            shellexpand::full(path.to_string_lossy().as_ref())
                .map(|expanded| PathBuf::from(expanded.into_owned()))
                .map_err(ConfigError::ShellExpansion)
        })
        .collect()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Line length of zero makes every line too long.
    #[error("line length must be greater than zero")]
    LineLength,

    /// Source file pattern is not a valid glob.
    #[error("invalid source file pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },

    /// Installer command has no program to run.
    #[error("package installer command cannot be empty")]
    EmptyInstaller,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn empty_configuration_uses_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;
        assert_eq!(result, Settings::default());
        assert_eq!(result.format.line_length, 120);
        assert_eq!(result.format.lint_ignore, vec!["E203", "W503", "E501"]);
        assert!(result.format.blocking);

        Ok(())
    }

    #[sealed_test(env = [("BLAH", "/home/blah/blah")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = indoc! {r#"
            [format]
            line_length = 88
            lint_ignore = ["E203"]
            exclude = ["venv"]
            include = "*.pyi"
            blocking = false

            [bootstrap]
            auto_install = false
            installer = ["pipx", "install"]
            required_files = ["$BLAH/report.py"]
            directories = ["reports"]

            [tools]
            black = "23.1"
        "#}
        .parse()?;

        let expect = Settings {
            format: FormatSettings {
                line_length: 88,
                lint_ignore: vec!["E203".into()],
                exclude: vec!["venv".into()],
                include: "*.pyi".into(),
                blocking: false,
                respect_gitignore: true,
            },
            bootstrap: BootstrapSettings {
                auto_install: false,
                installer: vec!["pipx".into(), "install".into()],
                required_files: vec![PathBuf::from("/home/blah/blah/report.py")],
                allow_missing_files: false,
                directories: vec![PathBuf::from("reports")],
            },
            tools: BTreeMap::from([("black".into(), "23.1".into())]),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn reject_zero_line_length() {
        let result = "[format]\nline_length = 0\n".parse::<Settings>();
        assert!(matches!(result, Err(ConfigError::LineLength)));
    }

    #[test]
    fn reject_bad_include_pattern() {
        let result = "[format]\ninclude = \"[*.py\"\n".parse::<Settings>();
        assert!(matches!(result, Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn serialized_defaults_parse_back() -> anyhow::Result<()> {
        let text = Settings::default().to_string();
        let result: Settings = text.parse()?;
        assert_eq!(result, Settings::default());

        Ok(())
    }

    #[sealed_test]
    fn load_prefers_project_file() -> anyhow::Result<()> {
        std::fs::write("hookstrap.toml", "[format]\nline_length = 100\n")?;
        let result = Settings::load(".", None)?;
        assert_eq!(result.format.line_length, 100);

        Ok(())
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/hookstrap-test")])]
    fn load_without_files_uses_defaults() -> anyhow::Result<()> {
        let result = Settings::load(".", None)?;
        assert_eq!(result, Settings::default());

        Ok(())
    }

    #[sealed_test]
    fn load_missing_explicit_file_fails() {
        let result = Settings::load(".", Some(Path::new("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
