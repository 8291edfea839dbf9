// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pre-commit hook script rendering.
//!
//! The hook is a plain POSIX shell script. When Git runs it, it selects the
//! staged source files, formats then sorts exactly those files, stages the
//! result again, and runs the style checker over them. Every tool failure is
//! swallowed and the script always exits zero, so formatting only ever
//! transforms a commit and never blocks it.
//!
//! File selection is done with Git pathspecs, so the hook honors the same
//! source pattern and directory exclusions as the file set used by the
//! formatting runner.

use crate::config::FormatSettings;

/// First comment line of every hook Hookstrap writes.
pub const MARKER: &str = "# Installed by hookstrap.";

/// Render hook script for target settings.
///
/// Output depends on nothing but the settings, so identical settings always
/// render identical scripts.
pub fn render(settings: &FormatSettings) -> String {
    let line_length = settings.line_length;
    let pathspecs = pathspecs(settings)
        .iter()
        .map(|spec| format!("        {}", shell_words::quote(spec)))
        .collect::<Vec<_>>()
        .join(" \\\n");

    let mut lint = format!("flake8 --max-line-length {line_length}");
    if !settings.lint_ignore.is_empty() {
        lint.push_str(" --ignore ");
        lint.push_str(&shell_words::quote(&settings.lint_ignore.join(",")));
    }

    format!(
        r#"#!/bin/sh
{MARKER} Changes are overwritten on the next install.
#
# Formats staged source files before each commit. Formatting never blocks a
# commit: tool failures are reported and ignored.

staged() {{
    git diff --cached --diff-filter=ACMR "$@" -- \
{pathspecs}
}}

if staged --quiet; then
    exit 0
fi

staged --name-only -z | xargs -0 black --line-length {line_length} || true
staged --name-only -z | xargs -0 isort --profile black --line-length {line_length} || true
staged --name-only -z | xargs -0 git add -- || true
staged --name-only -z | xargs -0 {lint} || true

exit 0
"#
    )
}

/// Build Git pathspecs selecting staged source files.
///
/// The source pattern matches at any depth unless it contains a slash.
/// Excluded directory names match at any depth, excluded paths only from the
/// top of the work tree.
pub fn pathspecs(settings: &FormatSettings) -> Vec<String> {
    let include = if settings.include.contains('/') {
        format!(":(glob){}", settings.include)
    } else {
        format!(":(glob)**/{}", settings.include)
    };

    let mut specs = vec![include];
    for rule in &settings.exclude {
        let rule = rule.trim_matches('/');
        if rule.is_empty() {
            continue;
        }

        if rule.contains('/') {
            specs.push(format!(":(exclude,glob){rule}/**"));
        } else {
            specs.push(format!(":(exclude,glob)**/{rule}/**"));
        }
    }

    specs
}
