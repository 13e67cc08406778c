//! Shared-library discovery through an external inspection tool.
//!
//! Callers only see [`DependencyLister`]; how the paths are recovered
//! (scraping `ldd` text, reading the dynamic section) stays behind it.

use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::CollectError;

/// Anything that can report the shared libraries a binary loads at runtime.
pub trait DependencyLister {
    /// List the library paths `binary_path` depends on, in discovery order.
    ///
    /// A tool that runs but reports failure is not an error here: its status
    /// and stderr are returned in [`Listing::diagnostics`].
    fn list_dependencies(&self, binary_path: &Path) -> Result<Listing, CollectError>;

    /// Name of the underlying program, for messages.
    fn program(&self) -> String;

    /// Root the listed paths live under. Allowlist prefixes are matched
    /// against paths relative to it.
    fn sysroot(&self) -> &Path {
        Path::new("/")
    }
}

/// Result of one dependency listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub paths: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

/// What the inspection tool said besides the paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub success: bool,
    /// `None` when the tool was killed by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
    /// Library names the lister could not map to a file.
    pub unresolved: Vec<String>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stderr: String::new(),
            unresolved: Vec::new(),
        }
    }
}

impl Diagnostics {
    pub(crate) fn from_output(output: &Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            unresolved: Vec::new(),
        }
    }

    /// Fold a secondary tool run into these diagnostics.
    pub(crate) fn absorb(&mut self, other: Diagnostics) {
        if !other.success && self.success {
            self.success = false;
            self.exit_code = other.exit_code;
        }
        self.stderr.push_str(&other.stderr);
        self.unresolved.extend(other.unresolved);
    }
}

/// Run `program args... binary_path` to completion, capturing both streams.
pub(crate) fn run_tool(
    program: &OsStr,
    args: &[OsString],
    binary_path: &Path,
) -> Result<Output, CollectError> {
    debug!(
        "Running {} {:?} {}",
        program.to_string_lossy(),
        args,
        binary_path.display()
    );
    // output() drains stdout and stderr together, so neither pipe can fill up
    Command::new(program)
        .args(args)
        .arg(binary_path)
        .output()
        .map_err(|source| CollectError::ToolInvocation {
            program: program.to_string_lossy().into_owned(),
            source,
        })
}

/// Dependency lister backed by the system dynamic linker (`ldd`).
///
/// `ldd` executes the loader against the binary, so it only reports
/// libraries as the host would resolve them.
#[derive(Debug, Clone)]
pub struct LddLister {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for LddLister {
    fn default() -> Self {
        Self::new("ldd")
    }
}

impl LddLister {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument placed before the binary path.
    ///
    /// Useful for wrappers such as `sh ldd-wrapper.sh <binary>`.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl DependencyLister for LddLister {
    fn list_dependencies(&self, binary_path: &Path) -> Result<Listing, CollectError> {
        let output = run_tool(&self.program, &self.args, binary_path)?;
        let diagnostics = Diagnostics::from_output(&output);
        if !diagnostics.success {
            warn!(
                "{} reported failure on {}: {}",
                self.program(),
                binary_path.display(),
                diagnostics.stderr.trim()
            );
        }
        Ok(Listing {
            paths: parse_ldd_output(&output.stdout),
            diagnostics,
        })
    }

    fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Pull absolute paths out of `ldd` output.
///
/// Example ldd output:
/// ```text
///     linux-vdso.so.1 (0x00007ffd0c5f2000)
///     libQt5Core.so.5 => /usr/lib/x86_64-linux-gnu/libQt5Core.so.5 (0x00007f3a1c000000)
///     libc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f3a1bc00000)
///     /lib64/ld-linux-x86-64.so.2 (0x00007f3a1c9b0000)
/// ```
///
/// The format is meant for humans, so this just splits on whitespace and
/// keeps tokens starting with `/`. Load addresses, `=>` and bare sonames
/// fall out. Order is preserved and duplicates are kept.
pub fn parse_ldd_output(output: &[u8]) -> Vec<PathBuf> {
    output
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| token.first() == Some(&b'/'))
        .map(|token| PathBuf::from(OsStr::from_bytes(token)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ldd_output() {
        let output = b"\tlinux-vdso.so.1 (0x00007ffd0c5f2000)
\tlibQt5Core.so.5 => /usr/lib/x86_64-linux-gnu/libQt5Core.so.5 (0x00007f3a1c000000)
\tlibc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f3a1bc00000)
\t/lib64/ld-linux-x86-64.so.2 (0x00007f3a1c9b0000)
";
        let libs = parse_ldd_output(output);
        assert_eq!(
            libs,
            vec![
                PathBuf::from("/usr/lib/x86_64-linux-gnu/libQt5Core.so.5"),
                PathBuf::from("/lib/x86_64-linux-gnu/libc.so.6"),
                PathBuf::from("/lib64/ld-linux-x86-64.so.2"),
            ]
        );
    }

    #[test]
    fn test_parse_ldd_keeps_duplicates() {
        let output = b"libz.so.1 => /lib/libz.so.1 (0x1)\nlibz.so.1 => /lib/libz.so.1 (0x1)\n";
        assert_eq!(parse_ldd_output(output).len(), 2);
    }

    #[test]
    fn test_parse_ldd_not_found_entries() {
        let output = b"\tlibmissing.so.3 => not found\n";
        assert!(parse_ldd_output(output).is_empty());
    }

    #[test]
    fn test_parse_ldd_non_utf8_path() {
        let output = b"libx.so => /lib/caf\xe9/libx.so (0x1)\n";
        let libs = parse_ldd_output(output);
        assert_eq!(libs.len(), 1);
        assert_eq!(libs[0].as_os_str().as_bytes(), b"/lib/caf\xe9/libx.so");
    }

    #[test]
    fn test_ldd_lister_missing_program() {
        let lister = LddLister::new("/nonexistent/bin/ldd");
        let result = lister.list_dependencies(Path::new("/bin/sh"));
        match result {
            Err(CollectError::ToolInvocation { program, .. }) => {
                assert_eq!(program, "/nonexistent/bin/ldd")
            }
            other => panic!("expected ToolInvocation, got {:?}", other),
        }
    }

    #[test]
    fn test_diagnostics_absorb_keeps_first_failure() {
        let mut diag = Diagnostics::default();
        diag.absorb(Diagnostics {
            success: false,
            exit_code: Some(1),
            stderr: "first\n".into(),
            unresolved: vec!["liba.so".into()],
        });
        diag.absorb(Diagnostics {
            success: false,
            exit_code: Some(2),
            stderr: "second\n".into(),
            unresolved: Vec::new(),
        });
        assert!(!diag.success);
        assert_eq!(diag.exit_code, Some(1));
        assert_eq!(diag.stderr, "first\nsecond\n");
        assert_eq!(diag.unresolved, vec!["liba.so"]);
    }
}
