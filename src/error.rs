//! Error type shared by every stage of library collection.

use std::io;
use std::path::PathBuf;

/// Everything that can abort a collection run.
///
/// Unmatched tool output is never an error: tokens that don't look like
/// allowed library paths are dropped silently.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The inspection tool could not be started (missing binary, permissions).
    #[error("failed to run `{program}`: {source}")]
    ToolInvocation {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The inspection tool exited unsuccessfully and strict mode is enabled.
    #[error("`{program}` exited with {}: {}", describe_code(.exit_code), .stderr.trim())]
    ToolFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Creating the destination or copying a library failed.
    #[error("{action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("at least one library prefix is required")]
    EmptyAllowlist,

    #[error("library prefix must be absolute: {0:?}")]
    RelativePrefix(String),
}

impl CollectError {
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        CollectError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}
