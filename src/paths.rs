//! Library search under a sysroot.

use std::env::consts::ARCH;
use std::path::{Path, PathBuf};

/// Directories (relative to the sysroot) searched for a library name.
///
/// Covers the Fedora-style lib64 layout and the Debian multiarch layout.
pub fn default_search_dirs() -> Vec<String> {
    let multiarch = format!("{ARCH}-linux-gnu");
    vec![
        "usr/lib64".to_string(),
        "lib64".to_string(),
        format!("usr/lib/{multiarch}"),
        format!("lib/{multiarch}"),
        "usr/lib".to_string(),
        "lib".to_string(),
    ]
}

/// Find a library in `search_dirs` under `sysroot`.
///
/// Returns the first candidate that exists (dangling symlinks count, the
/// copy step reports them). Returns `None` if no directory has it.
#[must_use = "found library path should be used"]
pub fn find_library(sysroot: &Path, lib_name: &str, search_dirs: &[String]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| sysroot.join(dir).join(lib_name))
        .find(|p| p.exists() || p.is_symlink())
}
