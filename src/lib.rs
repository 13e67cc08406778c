//! Shared-library collection for AppImage bundles.
//!
//! Runs a dependency lister (`ldd` by default, `readelf` for cross builds)
//! on a built executable, keeps the reported libraries living under an
//! allowlist of library roots, and copies them flat into one directory.

mod analyze;
mod collect;
mod copy;
mod error;
mod paths;
mod prefixes;
mod readelf;

pub use analyze::{parse_ldd_output, DependencyLister, Diagnostics, LddLister, Listing};
pub use collect::{collect, CollectConfig, Collection, LibraryCollector};
pub use copy::{copy_flat, ensure_dir};
pub use error::CollectError;
pub use paths::{default_search_dirs, find_library};
pub use prefixes::{AllowedPrefixes, DEFAULT_PREFIXES};
pub use readelf::{parse_readelf_output, ReadelfLister};
