//! Restricted file sets built from a glob, and bounded rewrite iteration.
//!
//! A [`WalkedFileSet`] is computed once and defines the only files a run may
//! touch. [`WalkedFileSet::for_each_file`] reads each file in full before the
//! callback decides whether to replace it; a file is only truncated once its
//! replacement bytes exist.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::util::cancel::CancelToken;
use crate::util::errors::AggregateError;
use crate::util::parallel::ParallelMapper;

/// Error recorded for files skipped after cancellation.
#[derive(Debug, thiserror::Error)]
#[error("skipped {}: operation cancelled", path.display())]
pub struct Cancelled {
    pub path: PathBuf,
}

/// A part of the tree that could not be walked.
///
/// Descriptors below it are missing from the file set, so every iteration
/// reports it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to walk {}: {message}", path.display())]
pub struct WalkFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of iterating a file set.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Files whose contents were replaced (or would have been, in dry runs)
    pub rewritten: BTreeSet<PathBuf>,
    /// Per-file failures
    pub errors: AggregateError,
}

/// The set of root-relative paths that matched a glob.
#[derive(Debug, Clone)]
pub struct WalkedFileSet {
    root: PathBuf,
    paths: BTreeSet<PathBuf>,
    failures: Vec<WalkFailure>,
}

impl WalkedFileSet {
    /// Walk `root` and keep every regular file whose relative path matches `glob`.
    pub fn new(root: &Path, glob: &str) -> Result<Self> {
        let pattern =
            Pattern::new(glob).with_context(|| format!("invalid glob pattern: {}", glob))?;
        let opts = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        if !root.is_dir() {
            bail!("not a directory: {}", root.display());
        }

        let mut paths = BTreeSet::new();
        let mut failures = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("walk error: {}", e);
                    let path = e.path().unwrap_or(root);
                    failures.push(WalkFailure {
                        path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if pattern.matches_path_with(&relative, opts) {
                paths.insert(relative);
            }
        }

        tracing::debug!(
            "matched {} files under {} with {}",
            paths.len(),
            root.display(),
            glob
        );

        Ok(WalkedFileSet {
            root: root.to_path_buf(),
            paths,
            failures,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Directories the walk could not descend into.
    pub fn failures(&self) -> &[WalkFailure] {
        &self.failures
    }

    pub fn contains(&self, relative: &Path) -> bool {
        self.paths.contains(relative)
    }

    /// Relative paths in the set, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Resolve a member of the set to its on-disk location.
    ///
    /// Paths outside the set are rejected.
    pub fn open_path(&self, relative: &Path) -> Result<PathBuf> {
        if !self.contains(relative) {
            bail!("{} is not part of the walked file set", relative.display());
        }
        Ok(self.root.join(relative))
    }

    /// Read, decide and possibly rewrite every file in the set.
    ///
    /// `f` receives the relative path and the complete original contents. It
    /// returns `Some(bytes)` to replace the file, `None` to leave it alone.
    /// Replaced files keep their original permissions. With `dry_run` set,
    /// replacements are reported but not written. Walk failures are reported
    /// as errors of every iteration.
    pub fn for_each_file<F>(
        &self,
        mapper: &ParallelMapper,
        cancel: &CancelToken,
        dry_run: bool,
        f: F,
    ) -> ScanOutcome
    where
        F: Fn(&Path, &[u8]) -> Result<Option<Vec<u8>>> + Sync,
    {
        let rewritten = Mutex::new(BTreeSet::new());

        let mut errors = mapper.map_entries(self.paths.iter().map(|p| (p, ())), |relative, _| {
            if cancel.is_cancelled() {
                return Err(Cancelled {
                    path: relative.clone(),
                }
                .into());
            }

            let path = self.open_path(relative)?;
            let original = fs::read(&path)
                .with_context(|| format!("failed to read file: {}", path.display()))?;

            let Some(replacement) = f(relative, &original)
                .with_context(|| format!("failed to process {}", relative.display()))?
            else {
                return Ok(());
            };

            if !dry_run {
                replace_contents(&path, &replacement)?;
            }
            rewritten
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(relative.clone());
            Ok(())
        });
        for failure in &self.failures {
            errors.push(failure.clone());
        }

        ScanOutcome {
            rewritten: rewritten.into_inner().unwrap_or_else(PoisonError::into_inner),
            errors,
        }
    }
}

/// Truncate `path` and write `contents`, keeping its permission bits.
fn replace_contents(path: &Path, contents: &[u8]) -> Result<()> {
    let permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat file: {}", path.display()))?
        .permissions();

    let mut file = fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open file for writing: {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    file.flush()?;
    drop(file);

    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to restore permissions: {}", path.display()))
}
