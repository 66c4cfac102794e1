//! Error types for external rendering.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of characters kept from the renderer's stderr.
const EXCERPT_CHARS: usize = 2000;

/// Error from the external rendering pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExternalError {
    /// Pre-flight validation failed; the renderer was not launched.
    #[error("invalid {argument}: {reason} ({value:?})")]
    InvalidArgument {
        /// Argument name (e.g. "template directory").
        argument: &'static str,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The renderer executable could not be started.
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        /// Executable path.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The renderer exited unsuccessfully.
    #[error("external renderer failed (exit {exit_code:?}): {stderr_excerpt}")]
    ProcessFailed {
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Tail of the captured stderr.
        stderr_excerpt: String,
    },

    /// The renderer did not finish within the hard timeout and was killed.
    #[error("external renderer timed out after {}s", timeout.as_secs_f32())]
    TimedOut {
        /// Configured timeout.
        timeout: Duration,
        /// Tail of the stderr captured before the kill.
        stderr_excerpt: String,
    },

    /// The renderer succeeded but no artifact appeared within the retry budget.
    #[error(
        "no .{extension} artifact in {} after {attempts} attempts (found: {listing:?})",
        directory.display()
    )]
    ArtifactNotProduced {
        /// Output directory that was polled.
        directory: PathBuf,
        /// Expected artifact extension.
        extension: String,
        /// Number of directory listings performed.
        attempts: u32,
        /// Entries present in the directory at the last listing.
        listing: Vec<String>,
        /// Captured renderer stdout.
        stdout: String,
        /// Captured renderer stderr.
        stderr: String,
    },

    /// The artifact was found but could not be read.
    #[error("failed to read artifact {}: {source}", path.display())]
    ArtifactUnreadable {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The render was cancelled by its caller; the workspace was removed.
    #[error("external render cancelled")]
    Cancelled,

    /// The temporary workspace could not be prepared.
    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

/// Keep the last [`EXCERPT_CHARS`] characters of `text`.
pub(crate) fn excerpt(text: &str) -> String {
    let count = text.chars().count();
    if count <= EXCERPT_CHARS {
        return text.trim_end().to_owned();
    }
    let tail: String = text.chars().skip(count - EXCERPT_CHARS).collect();
    format!("...{}", tail.trim_end())
}
