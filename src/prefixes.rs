//! Allowlist of library-root prefixes.

use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::CollectError;

/// Library roots bundled by default: the pipeline's `/lib` and `/usr/lib/`,
/// plus `/usr/lib64/` where lib64 hosts keep their libraries.
pub const DEFAULT_PREFIXES: &[&str] = &["/lib", "/usr/lib/", "/usr/lib64/"];

/// Non-empty set of absolute path prefixes.
///
/// Matching is plain text: `/lib` accepts `/lib64/ld-linux-x86-64.so.2`
/// as well as `/lib/x86_64-linux-gnu/libc.so.6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedPrefixes(Vec<String>);

impl AllowedPrefixes {
    pub fn new<I, S>(prefixes: I) -> Result<Self, CollectError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        if prefixes.is_empty() {
            return Err(CollectError::EmptyAllowlist);
        }
        if let Some(bad) = prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(CollectError::RelativePrefix(bad.clone()));
        }
        Ok(Self(prefixes))
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let bytes = path.as_os_str().as_bytes();
        self.0.iter().any(|p| bytes.starts_with(p.as_bytes()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for AllowedPrefixes {
    fn default() -> Self {
        Self(DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}
