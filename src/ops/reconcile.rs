//! Reconcile `go.mod` files against a manifest.
//!
//! Every descriptor under the root is parsed, compared with the manifest and
//! rewritten only when something differs. Running twice with the same
//! manifest writes nothing the second time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::manifest::{Manifest, LATEST};
use crate::core::modfile::ModFile;
use crate::util::cancel::CancelToken;
use crate::util::errors::AggregateError;
use crate::util::parallel::ParallelMapper;
use crate::util::walk::WalkedFileSet;

/// Glob selecting descriptor files, relative to the root.
pub const DESCRIPTOR_GLOB: &str = "**/*go.mod";

/// Comment appended to every rewritten descriptor.
pub const MODIFIED_COMMENT: &str = "Modified by versionist";

/// Options for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Compute changes without writing them
    pub dry_run: bool,

    /// Descriptor glob, relative to the root
    pub pattern: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            dry_run: false,
            pattern: DESCRIPTOR_GLOB.to_string(),
        }
    }
}

/// What a reconciliation run did.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Number of descriptor files found
    pub scanned: usize,
    /// Files rewritten (or that would be, in a dry run)
    pub modified: BTreeSet<PathBuf>,
    /// Per-file failures; other files were still processed
    pub errors: AggregateError,
}

/// Applies a resolved manifest to the descriptors under a root directory.
pub struct Reconciler<'a> {
    root: PathBuf,
    manifest: &'a Manifest,
    mapper: Arc<ParallelMapper>,
    opts: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(root: impl Into<PathBuf>, manifest: &'a Manifest, mapper: Arc<ParallelMapper>) -> Self {
        Reconciler {
            root: root.into(),
            manifest,
            mapper,
            opts: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: ReconcileOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Scan the tree and rewrite every descriptor that disagrees with the manifest.
    ///
    /// Fails only if the file set cannot be built. Problems with individual
    /// files are collected in the report.
    pub fn reconcile(&self, cancel: &CancelToken) -> Result<ReconcileReport> {
        let files = WalkedFileSet::new(&self.root, &self.opts.pattern)
            .with_context(|| format!("failed to scan {}", self.root.display()))?;
        tracing::info!(
            "Found {} descriptor files under {}",
            files.len(),
            self.root.display()
        );

        let outcome = files.for_each_file(&self.mapper, cancel, self.opts.dry_run, |path, content| {
            self.reconcile_content(path, content)
        });

        Ok(ReconcileReport {
            scanned: files.len(),
            modified: outcome.rewritten,
            errors: outcome.errors,
        })
    }

    /// Decide the new contents of one descriptor.
    ///
    /// Returns `None` when the file already agrees with the manifest.
    pub fn reconcile_content(&self, path: &Path, content: &[u8]) -> Result<Option<Vec<u8>>> {
        tracing::debug!("Reading go mod file {}", path.display());

        let text = std::str::from_utf8(content)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
        let mut modfile = ModFile::parse(&path.display().to_string(), text)?;

        if !apply_manifest(self.manifest, &mut modfile) {
            tracing::debug!("No modifications for {}", path.display());
            return Ok(None);
        }

        if modfile.trailing_comment() != Some(MODIFIED_COMMENT) {
            modfile.add_comment(MODIFIED_COMMENT);
        }

        if self.opts.dry_run {
            tracing::info!("Would rewrite go mod file {}", path.display());
        } else {
            tracing::info!("Rewriting go mod file {}", path.display());
        }
        Ok(Some(modfile.format().into_bytes()))
    }
}

/// Bring `modfile` in line with `manifest`. Returns whether anything changed.
///
/// Indirect requirements are never touched, and neither are requirements
/// whose project is still pinned to an unresolved `latest`.
pub fn apply_manifest(manifest: &Manifest, modfile: &mut ModFile) -> bool {
    let mut dirty = false;

    if modfile.go_version() != Some(manifest.go_version()) {
        tracing::debug!(
            "go directive {:?} -> {}",
            modfile.go_version(),
            manifest.go_version()
        );
        modfile.set_go_version(manifest.go_version());
        dirty = true;
    }

    let updates: Vec<(usize, String)> = modfile
        .requirements()
        .enumerate()
        .filter(|(_, req)| !req.indirect)
        .filter_map(|(i, req)| {
            let (version, found) = manifest.check(&req.path);
            if !found || version == LATEST || version == req.version {
                return None;
            }
            tracing::debug!("{} {} -> {}", req.path, req.version, version);
            Some((i, version.to_string()))
        })
        .collect();

    for (index, version) in updates {
        modfile.set_requirement_version(index, &version);
        dirty = true;
    }

    dirty
}

/// Reconcile `root` against `manifest` with a fresh worker pool.
pub fn reconcile(
    root: &Path,
    manifest: &Manifest,
    opts: &ReconcileOptions,
    cancel: &CancelToken,
) -> Result<ReconcileReport> {
    let mapper = Arc::new(ParallelMapper::with_default_parallelism()?);
    Reconciler::new(root, manifest, mapper)
        .with_options(opts.clone())
        .reconcile(cancel)
}
