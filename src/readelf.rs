//! Dependency listing from the ELF dynamic section via `readelf`.
//!
//! Unlike `ldd` this never runs the loader, so it also works on binaries
//! built for another architecture. Library names are resolved against a
//! sysroot instead of the host linker cache.

use log::warn;
use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::analyze::{run_tool, DependencyLister, Diagnostics, Listing};
use crate::error::CollectError;
use crate::paths::{default_search_dirs, find_library};

/// Dependency lister reading `readelf -d` output.
///
/// NEEDED names are looked up in `search_dirs` under `sysroot` (defaults:
/// `/` and [`default_search_dirs`]), so reported paths carry the sysroot
/// as their prefix.
#[derive(Debug, Clone)]
pub struct ReadelfLister {
    program: OsString,
    args: Vec<OsString>,
    sysroot: PathBuf,
    search_dirs: Vec<String>,
}

impl Default for ReadelfLister {
    fn default() -> Self {
        Self::new("/")
    }
}

impl ReadelfLister {
    pub fn new(sysroot: impl Into<PathBuf>) -> Self {
        Self {
            program: OsString::from("readelf"),
            args: Vec::new(),
            sysroot: sysroot.into(),
            search_dirs: default_search_dirs(),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Add an argument placed before `-d <binary>`.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn search_dirs(mut self, dirs: Vec<String>) -> Self {
        self.search_dirs = dirs;
        self
    }

    fn needed(&self, path: &Path) -> Result<(Vec<String>, Diagnostics), CollectError> {
        let mut args = self.args.clone();
        args.push(OsString::from("-d"));
        let output = run_tool(&self.program, &args, path)?;
        let diagnostics = Diagnostics::from_output(&output);
        if !diagnostics.success {
            warn!(
                "{} failed on {}: {}",
                self.program.to_string_lossy(),
                path.display(),
                diagnostics.stderr.trim()
            );
            return Ok((Vec::new(), diagnostics));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok((parse_readelf_output(&stdout), diagnostics))
    }
}

impl DependencyLister for ReadelfLister {
    /// Walk NEEDED entries transitively, breadth-first.
    ///
    /// Each library name is resolved once; names with no match under the
    /// sysroot land in `diagnostics.unresolved`.
    fn list_dependencies(&self, binary_path: &Path) -> Result<Listing, CollectError> {
        let mut listing = Listing::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([binary_path.to_path_buf()]);

        while let Some(path) = queue.pop_front() {
            let (names, diagnostics) = self.needed(&path)?;
            listing.diagnostics.absorb(diagnostics);

            for lib_name in names {
                if !seen.insert(lib_name.clone()) {
                    continue;
                }
                match find_library(&self.sysroot, &lib_name, &self.search_dirs) {
                    Some(lib_path) => {
                        listing.paths.push(lib_path.clone());
                        queue.push_back(lib_path);
                    }
                    None => {
                        warn!(
                            "{} not found under {} (needed by {})",
                            lib_name,
                            self.sysroot.display(),
                            path.display()
                        );
                        listing.diagnostics.unresolved.push(lib_name);
                    }
                }
            }
        }

        Ok(listing)
    }

    fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn sysroot(&self) -> &Path {
        &self.sysroot
    }
}

/// Parse readelf -d output to extract NEEDED library names.
///
/// Example readelf output:
/// ```text
/// Dynamic section at offset 0x2d0e0 contains 28 entries:
///   Tag        Type                         Name/Value
///  0x0000000000000001 (NEEDED)             Shared library: [libtinfo.so.6]
///  0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]
/// ```
pub fn parse_readelf_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("(NEEDED)"))
        .filter_map(|line| {
            let rest = &line[line.find("Shared library: [")? + "Shared library: [".len()..];
            let end = rest.find(']')?;
            Some(rest[..end].to_string())
        })
        .collect()
}
