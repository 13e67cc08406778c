//! The collection pipeline: list, filter, create the directory, copy.

use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::analyze::{DependencyLister, Diagnostics, LddLister};
use crate::copy::{copy_flat, ensure_dir};
use crate::error::CollectError;
use crate::prefixes::AllowedPrefixes;

/// Inputs for one collection run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Built executable whose libraries are collected. Not checked here;
    /// a missing file shows up in the tool diagnostics.
    pub target: PathBuf,
    /// Flat output directory, created if missing, never cleared.
    pub destination: PathBuf,
    pub allowed_prefixes: AllowedPrefixes,
    /// Fail when the inspection tool reports a non-zero status instead of
    /// copying whatever it printed.
    pub strict: bool,
}

impl CollectConfig {
    pub fn new(target: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            destination: destination.into(),
            allowed_prefixes: AllowedPrefixes::default(),
            strict: false,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Source paths that were copied, in discovery order. Duplicates reported
    /// by the tool are kept (and copied again).
    pub copied: Vec<PathBuf>,
    /// Listed libraries that fell outside the allowlist and were skipped.
    pub rejected: Vec<PathBuf>,
    pub destination: PathBuf,
    pub diagnostics: Diagnostics,
}

/// Copies the allowlisted dependencies of a binary into a flat directory.
#[derive(Debug, Clone, Default)]
pub struct LibraryCollector<L = LddLister> {
    lister: L,
}

impl<L: DependencyLister> LibraryCollector<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    pub fn collect(&self, config: &CollectConfig) -> Result<Collection, CollectError> {
        self.collect_with(config, |_| {})
    }

    /// Like [`collect`](Self::collect), calling `on_copied` with each source
    /// path right after it lands in the destination.
    ///
    /// A copy failure aborts the run, but everything reported before it is
    /// already in place.
    pub fn collect_with<F>(
        &self,
        config: &CollectConfig,
        mut on_copied: F,
    ) -> Result<Collection, CollectError>
    where
        F: FnMut(&Path),
    {
        let listing = self.lister.list_dependencies(&config.target)?;
        let diagnostics = listing.diagnostics;

        if !diagnostics.success {
            if config.strict {
                return Err(CollectError::ToolFailed {
                    program: self.lister.program(),
                    exit_code: diagnostics.exit_code,
                    stderr: diagnostics.stderr,
                });
            }
            warn!(
                "Ignoring failure status of {}, using whatever it listed",
                self.lister.program()
            );
        }

        let sysroot = self.lister.sysroot();
        let (libs, rejected): (Vec<PathBuf>, Vec<PathBuf>) = listing
            .paths
            .into_iter()
            .partition(|p| config.allowed_prefixes.matches(&installed_path(sysroot, p)));
        if !rejected.is_empty() {
            warn!(
                "Skipped {} listed libraries outside {} (first: {})",
                rejected.len(),
                config.allowed_prefixes.iter().collect::<Vec<_>>().join(", "),
                rejected[0].display()
            );
        }

        ensure_dir(&config.destination)?;

        for lib in &libs {
            info!("Found {}", lib.display());
            copy_flat(lib, &config.destination)?;
            on_copied(lib);
        }

        info!(
            "Collected {} libraries into {}",
            libs.len(),
            config.destination.display()
        );

        Ok(Collection {
            copied: libs,
            rejected,
            destination: config.destination.clone(),
            diagnostics,
        })
    }
}

/// Where `path` ends up on the running system once the sysroot is its `/`.
fn installed_path(sysroot: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(sysroot) {
        Ok(rel) => Path::new("/").join(rel),
        Err(_) => path.to_path_buf(),
    }
}

/// Collect with the system `ldd`, tolerating a failing tool status.
pub fn collect(
    target: &Path,
    destination: &Path,
    allowed_prefixes: &AllowedPrefixes,
) -> Result<Collection, CollectError> {
    let config = CollectConfig {
        target: target.to_path_buf(),
        destination: destination.to_path_buf(),
        allowed_prefixes: allowed_prefixes.clone(),
        strict: false,
    };
    LibraryCollector::new(LddLister::default()).collect(&config)
}
