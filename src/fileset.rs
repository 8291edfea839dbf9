// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Source file collection.
//!
//! A [`FileSet`] is the ordered list of source files handed to the formatting
//! tools. It is computed fresh on every run by walking a directory tree and
//! keeping files whose name matches the source pattern, e.g., `*.py`.
//!
//! # Exclusion
//!
//! Excluded directories are pruned during the walk, so nothing beneath them
//! is ever visited. An exclusion without a slash, e.g., `venv`, prunes every
//! directory of that name at any depth. An exclusion with a slash, e.g.,
//! `src/generated`, prunes only that path relative to the walk root.

use crate::config::FormatSettings;

use glob::Pattern;
use ignore::WalkBuilder;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    slice::Iter,
};
use tracing::{debug, instrument, warn};

/// Ordered listing of source files relative to a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Collect source files beneath target root.
    ///
    /// Files come back sorted so that every run hands the tools the same
    /// argument order.
    ///
    /// # Errors
    ///
    /// - Return [`FileSetError::Root`] if the root is not a directory.
    /// - Return [`FileSetError::Pattern`] if the source pattern is invalid.
    #[instrument(skip(root, settings), level = "debug")]
    pub fn collect(root: impl AsRef<Path>, settings: &FormatSettings) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(FileSetError::Root { path: root });
        }

        let pattern = Pattern::new(&settings.include).map_err(|err| FileSetError::Pattern {
            source: err,
            pattern: settings.include.clone(),
        })?;
        let match_full_path = settings.include.contains('/');
        let exclusion = Exclusion::new(&settings.exclude);

        let filter_root = root.clone();
        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .git_ignore(settings.respect_gitignore)
            .git_exclude(settings.respect_gitignore)
            .parents(settings.respect_gitignore)
            .follow_links(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }

                let relative = entry.path().strip_prefix(&filter_root).unwrap_or(entry.path());
                !exclusion.prunes(relative)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let relative = match entry.path().strip_prefix(&root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => continue,
            };

            let is_match = if match_full_path {
                pattern.matches_path(&relative)
            } else {
                relative
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| pattern.matches(name))
            };

            if is_match {
                files.push(relative);
            }
        }

        files.sort();
        debug!("collected {} source files under {:?}", files.len(), root.display());

        Ok(Self { root, files })
    }

    /// Construct file set from explicit relative paths.
    pub fn from_paths(root: impl Into<PathBuf>, files: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut files = files.into_iter().collect::<Vec<_>>();
        files.sort();
        files.dedup();

        Self {
            root: root.into(),
            files,
        }
    }

    /// Directory the file paths are relative to.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn files(&self) -> &[PathBuf] {
        self.files.as_slice()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, PathBuf> {
        self.files.iter()
    }

    /// Split files into batches of at most target size.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = &[PathBuf]> {
        self.files.chunks(size.max(1))
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a PathBuf;
    type IntoIter = Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Compiled directory exclusions.
#[derive(Debug, Clone, Default)]
struct Exclusion {
    names: HashSet<String>,
    paths: Vec<PathBuf>,
}

impl Exclusion {
    fn new(rules: &[String]) -> Self {
        let mut exclusion = Self::default();
        for rule in rules {
            let rule = rule.trim_matches('/');
            if rule.is_empty() {
                continue;
            }

            if rule.contains('/') {
                exclusion.paths.push(PathBuf::from(rule));
            } else {
                exclusion.names.insert(rule.to_string());
            }
        }

        exclusion
    }

    fn prunes(&self, relative: &Path) -> bool {
        let by_name = relative
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.names.contains(name));

        by_name || self.paths.iter().any(|path| relative == path.as_path())
    }
}

/// File set collection error types.
#[derive(Debug, thiserror::Error)]
pub enum FileSetError {
    /// Walk root is not a directory.
    #[error("{:?} is not a directory", path.display())]
    Root { path: PathBuf },

    /// Source file pattern is not a valid glob.
    #[error("invalid source file pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },
}

/// Friendly result alias :3
type Result<T, E = FileSetError> = std::result::Result<T, E>;
