//! Per-invocation temporary directory.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

use crate::ExternalError;

const INPUT_FILE: &str = "de.xml";
const OUTPUT_DIR: &str = "out";

/// Exclusively owned scratch directory for one external render.
///
/// The name combines a millisecond timestamp with a random suffix, so
/// concurrent invocations never share a directory. The directory is removed
/// when the workspace is closed or dropped, whichever comes first. Removal
/// failures are logged and swallowed.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a workspace (and its output subdirectory) under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ExternalError::Workspace`] if the directories cannot be created.
    pub fn create_in(parent: &Path) -> Result<Self, ExternalError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let dir = tempfile::Builder::new()
            .prefix(&format!("kude-{millis}-"))
            .tempdir_in(parent)
            .map_err(ExternalError::Workspace)?;
        let path = dir.path().to_path_buf();
        let workspace = Self {
            dir: Some(dir),
            path,
        };
        std::fs::create_dir(workspace.output_dir()).map_err(ExternalError::Workspace)?;
        tracing::debug!(path = %workspace.path.display(), "created workspace");
        Ok(workspace)
    }

    /// Create a workspace under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`ExternalError::Workspace`] if the directories cannot be created.
    pub fn create() -> Result<Self, ExternalError> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Workspace root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory handed to the renderer for its artifact.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.path.join(OUTPUT_DIR)
    }

    /// Materialize inline XML as a file inside the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`ExternalError::Workspace`] if the file cannot be written.
    pub fn write_input(&self, xml: &str) -> Result<PathBuf, ExternalError> {
        let path = self.path.join(INPUT_FILE);
        std::fs::write(&path, xml).map_err(ExternalError::Workspace)?;
        Ok(path)
    }

    /// Remove the workspace now.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed workspace"),
            Err(e) => tracing::warn!(path = %self.path.display(), "failed to remove workspace: {e}"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
