//! Result synchronization.
//!
//! Process exit is necessary but not sufficient evidence that the renderer's
//! artifact is observable. The synchronizer runs a bounded polling state
//! machine over the output directory:
//!
//! ```text
//! Invoked ──initial delay──▶ Polling ──match──▶ Found
//!                              │  ▲
//!                   no match   │  │ retry delay
//!                              ▼  │
//!                        budget left?  ──no──▶ Exhausted
//! ```
//!
//! Every wait can be cut short by a [`CancelToken`], which moves the machine
//! to `Cancelled`. The workspace is removed on every exit path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CancelToken, ExternalError, InvocationOutput, Workspace};

/// Retry policy for artifact discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Number of directory listings before giving up. At least one is always made.
    pub attempts: u32,
    /// Delay before the first listing.
    pub initial_delay: Duration,
    /// Delay between listings.
    pub retry_delay: Duration,
    /// Artifact extension, without the leading dot.
    pub extension: String,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(500),
            retry_delay: Duration::from_millis(1000),
            extension: "pdf".to_owned(),
        }
    }
}

#[derive(Debug)]
enum SyncState {
    Invoked,
    Polling { attempt: u32 },
    Found(PathBuf),
    Exhausted { attempts: u32, listing: Vec<String> },
    Cancelled { attempts: u32 },
}

/// Collects the external renderer's artifact from a [`Workspace`].
#[derive(Debug, Clone, Default)]
pub struct ResultSynchronizer {
    policy: SyncPolicy,
}

impl ResultSynchronizer {
    /// Create a synchronizer with the given policy.
    #[must_use]
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    #[must_use]
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Wait for the artifact, read it and remove the workspace.
    ///
    /// Directory listing by extension is the primary discovery strategy. Only
    /// when the retry budget is exhausted is the renderer's stdout scanned for
    /// a path to an existing artifact inside the output directory.
    ///
    /// # Errors
    ///
    /// - [`ExternalError::ArtifactNotProduced`] if nothing matched within the budget
    /// - [`ExternalError::ArtifactUnreadable`] if the artifact could not be read
    pub fn collect(
        &self,
        workspace: Workspace,
        output: &InvocationOutput,
    ) -> Result<Vec<u8>, ExternalError> {
        self.collect_cancellable(workspace, output, &CancelToken::new())
    }

    /// [`collect`](Self::collect) that stops waiting once `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`collect`](Self::collect), plus [`ExternalError::Cancelled`] after
    /// the workspace has been removed.
    pub fn collect_cancellable(
        &self,
        workspace: Workspace,
        output: &InvocationOutput,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, ExternalError> {
        let result = self.locate(&workspace.output_dir(), output, cancel).and_then(|path| {
            let bytes = std::fs::read(&path).map_err(|source| ExternalError::ArtifactUnreadable {
                path: path.clone(),
                source,
            });
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), "failed to remove artifact: {e}");
            }
            bytes
        });
        workspace.close();
        result
    }

    fn locate(
        &self,
        dir: &Path,
        output: &InvocationOutput,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ExternalError> {
        let budget = self.policy.attempts.max(1);
        let mut state = SyncState::Invoked;
        loop {
            state = match state {
                SyncState::Invoked if cancel.sleep(self.policy.initial_delay) => {
                    SyncState::Cancelled { attempts: 0 }
                }
                SyncState::Invoked => SyncState::Polling { attempt: 1 },
                SyncState::Polling { attempt } => {
                    let listing = list(dir);
                    match self.select(dir, &listing) {
                        Some(path) => SyncState::Found(path),
                        None if attempt < budget => {
                            tracing::debug!(attempt, "artifact not visible yet, retrying");
                            if cancel.sleep(self.policy.retry_delay) {
                                SyncState::Cancelled { attempts: attempt }
                            } else {
                                SyncState::Polling {
                                    attempt: attempt + 1,
                                }
                            }
                        }
                        None => SyncState::Exhausted {
                            attempts: attempt,
                            listing,
                        },
                    }
                }
                SyncState::Found(path) => {
                    tracing::debug!(path = %path.display(), "artifact found");
                    return Ok(path);
                }
                SyncState::Cancelled { attempts } => {
                    tracing::info!(attempts, "artifact polling cancelled");
                    return Err(ExternalError::Cancelled);
                }
                SyncState::Exhausted { attempts, listing } => {
                    if let Some(path) = self.from_stdout(dir, &output.stdout) {
                        tracing::info!(path = %path.display(), "artifact located from renderer output");
                        return Ok(path);
                    }
                    tracing::warn!(attempts, ?listing, "external renderer produced no artifact");
                    return Err(ExternalError::ArtifactNotProduced {
                        directory: dir.to_path_buf(),
                        extension: self.policy.extension.clone(),
                        attempts,
                        listing,
                        stdout: output.stdout.clone(),
                        stderr: output.stderr.clone(),
                    });
                }
            };
        }
    }

    fn select(&self, dir: &Path, listing: &[String]) -> Option<PathBuf> {
        listing
            .iter()
            .filter(|name| self.has_extension(name))
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    fn has_extension(&self, name: &str) -> bool {
        name.strip_suffix(self.policy.extension.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    }

    /// Last stdout token that names an existing artifact inside `dir`.
    fn from_stdout(&self, dir: &Path, stdout: &str) -> Option<PathBuf> {
        let root = dir.canonicalize().ok()?;
        stdout
            .split_whitespace()
            .rev()
            .map(|token| token.trim_matches(|c| matches!(c, '"' | '\'' | ',' | ';')))
            .filter(|token| self.has_extension(token))
            .filter_map(|token| {
                let candidate = Path::new(token);
                let candidate = if candidate.is_absolute() {
                    candidate.to_path_buf()
                } else {
                    dir.join(candidate)
                };
                candidate.canonicalize().ok()
            })
            .find(|path| path.starts_with(&root) && path.is_file())
    }
}

/// Sorted entry names of `dir`; an unreadable directory lists as empty.
fn list(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %dir.display(), "failed to list output directory: {e}");
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
