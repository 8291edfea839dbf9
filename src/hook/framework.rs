// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Hook framework configuration layout.
//!
//! The pre-commit framework reads a declarative `.pre-commit-config.yaml` at
//! the top of the work tree. Hookstrap generates one that runs the same three
//! formatting tools with the same wrap width and ignored codes as the rest of
//! the setup, plus a handful of generic hygiene checks:
//!
//! - trailing whitespace removal,
//! - end-of-file newline fixing,
//! - YAML, JSON, and TOML well-formedness,
//! - oversized file detection,
//! - private key detection.
//!
//! File I/O is left to the caller to figure out.

use crate::config::FormatSettings;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Comment placed above generated configuration.
pub const HEADER: &str = "# Generated by hookstrap. Edits are kept unless reinstalled with --force.\n";

const HYGIENE_REPO: &str = "https://github.com/pre-commit/pre-commit-hooks";
const HYGIENE_REV: &str = "v4.5.0";
const BLACK_REPO: &str = "https://github.com/psf/black";
const BLACK_REV: &str = "23.12.1";
const ISORT_REPO: &str = "https://github.com/pycqa/isort";
const ISORT_REV: &str = "5.13.2";
const FLAKE8_REPO: &str = "https://github.com/pycqa/flake8";
const FLAKE8_REV: &str = "7.0.0";

/// Largest file size in kilobytes that may be added.
pub const MAX_FILE_KB: u32 = 1000;

/// Top-level hook framework configuration.
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct FrameworkConfig {
    /// Regex of paths the framework never hands to any hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Hook repositories in execution order.
    pub repos: Vec<HookRepo>,
}

impl FrameworkConfig {
    /// Build standard configuration for target settings.
    pub fn standard(settings: &FormatSettings) -> Self {
        let line_length = settings.line_length;
        let mut flake8_args = vec![format!("--max-line-length={line_length}")];
        if !settings.lint_ignore.is_empty() {
            flake8_args.push(format!("--ignore={}", settings.lint_ignore.join(",")));
        }

        Self {
            exclude: exclude_regex(&settings.exclude),
            repos: vec![
                HookRepo::new(
                    HYGIENE_REPO,
                    HYGIENE_REV,
                    vec![
                        HookEntry::new("trailing-whitespace"),
                        HookEntry::new("end-of-file-fixer"),
                        HookEntry::new("check-yaml"),
                        HookEntry::new("check-json"),
                        HookEntry::new("check-toml"),
                        HookEntry::new("check-added-large-files")
                            .with_args([format!("--maxkb={MAX_FILE_KB}")]),
                        HookEntry::new("detect-private-key"),
                    ],
                ),
                HookRepo::new(
                    BLACK_REPO,
                    BLACK_REV,
                    vec![HookEntry::new("black").with_args([format!("--line-length={line_length}")])],
                ),
                HookRepo::new(
                    ISORT_REPO,
                    ISORT_REV,
                    vec![HookEntry::new("isort").with_args([
                        "--profile=black".to_string(),
                        format!("--line-length={line_length}"),
                    ])],
                ),
                HookRepo::new(
                    FLAKE8_REPO,
                    FLAKE8_REV,
                    vec![HookEntry::new("flake8").with_args(flake8_args)],
                ),
            ],
        }
    }

    /// Render configuration file contents, header included.
    ///
    /// # Errors
    ///
    /// - Return [`FrameworkError::Serialize`] if serialization fails.
    pub fn render(&self) -> Result<String, FrameworkError> {
        let body = serde_yaml::to_string(self).map_err(FrameworkError::Serialize)?;
        Ok(format!("{HEADER}{body}"))
    }

    /// Iterate over every hook entry of every repository.
    pub fn hooks(&self) -> impl Iterator<Item = &HookEntry> {
        self.repos.iter().flat_map(|repo| repo.hooks.iter())
    }
}

impl FromStr for FrameworkConfig {
    type Err = FrameworkError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(data).map_err(FrameworkError::Deserialize)
    }
}

impl Display for FrameworkConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.render()?.as_str())
    }
}

/// One hook repository entry.
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct HookRepo {
    pub repo: String,
    pub rev: String,
    pub hooks: Vec<HookEntry>,
}

impl HookRepo {
    pub fn new(repo: impl Into<String>, rev: impl Into<String>, hooks: Vec<HookEntry>) -> Self {
        Self {
            repo: repo.into(),
            rev: rev.into(),
            hooks,
        }
    }
}

/// One hook of a repository.
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct HookEntry {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl HookEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Build framework exclusion regex from directory exclusions.
///
/// Directory names match at any depth, paths with a slash only from the top.
fn exclude_regex(rules: &[String]) -> Option<String> {
    let mut names = Vec::new();
    let mut paths = Vec::new();
    for rule in rules {
        let rule = rule.trim_matches('/');
        if rule.is_empty() {
            continue;
        }

        if rule.contains('/') {
            paths.push(regex::escape(rule));
        } else {
            names.push(regex::escape(rule));
        }
    }

    let mut alternatives = Vec::new();
    if !names.is_empty() {
        alternatives.push(format!("(^|/)({})/", names.join("|")));
    }
    if !paths.is_empty() {
        alternatives.push(format!("^({})/", paths.join("|")));
    }

    if alternatives.is_empty() {
        None
    } else {
        Some(alternatives.join("|"))
    }
}

/// Hook framework configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(serde_yaml::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(serde_yaml::Error),
}

impl From<FrameworkError> for FmtError {
    fn from(_: FrameworkError) -> Self {
        FmtError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_config_shares_line_length() {
        let settings = FormatSettings {
            line_length: 100,
            ..FormatSettings::default()
        };
        let config = FrameworkConfig::standard(&settings);

        let args = |id: &str| {
            config
                .hooks()
                .find(|hook| hook.id == id)
                .map(|hook| hook.args.clone())
                .unwrap_or_default()
        };
        assert_eq!(args("black"), vec!["--line-length=100"]);
        assert_eq!(args("isort"), vec!["--profile=black", "--line-length=100"]);
        assert_eq!(
            args("flake8"),
            vec!["--max-line-length=100", "--ignore=E203,W503,E501"]
        );
    }

    #[test]
    fn standard_config_carries_hygiene_checks() {
        let config = FrameworkConfig::standard(&FormatSettings::default());
        let ids = config.hooks().map(|hook| hook.id.as_str()).collect::<Vec<_>>();
        for id in [
            "trailing-whitespace",
            "end-of-file-fixer",
            "check-yaml",
            "check-json",
            "check-toml",
            "check-added-large-files",
            "detect-private-key",
        ] {
            assert!(ids.contains(&id), "missing hygiene hook {id}");
        }
    }

    #[test]
    fn rendered_config_parses_back() -> anyhow::Result<()> {
        let config = FrameworkConfig::standard(&FormatSettings::default());
        let text = config.to_string();
        assert!(text.starts_with(HEADER));

        let result: FrameworkConfig = text.parse()?;
        assert_eq!(result, config);

        Ok(())
    }

    #[test]
    fn exclude_regex_covers_names_and_paths() {
        let rules = ["venv", ".git", "src/generated/"].map(String::from).to_vec();
        let result = exclude_regex(&rules);
        assert_eq!(
            result.as_deref(),
            Some(r"(^|/)(venv|\.git)/|^(src/generated)/")
        );
    }

    #[test]
    fn exclude_regex_matches_literal_names_only() -> anyhow::Result<()> {
        let rules = [".mypy_cache", "my-env", "venv", "src/gen+"].map(String::from).to_vec();
        let pattern = exclude_regex(&rules).unwrap_or_default();
        let regex = regex::Regex::new(&pattern)?;

        assert!(regex.is_match(".mypy_cache/stub.py"));
        assert!(regex.is_match("pkg/my-env/lib.py"));
        assert!(regex.is_match("src/gen+/api.py"));
        assert!(!regex.is_match("xmypy_cache/stub.py"));
        assert!(!regex.is_match("venvs/app.py"));
        assert!(!regex.is_match("src/genn/api.py"));

        Ok(())
    }

    #[test]
    fn exclude_regex_empty_without_rules() {
        assert_eq!(exclude_regex(&[]), None);
    }
}
