//! Mock invoker for testing.
//!
//! Provides [`MockInvoker`] for exercising the pipeline without spawning
//! processes.

use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::{CancelToken, ExternalError, ExternalRenderRequest, InvocationOutput, RenderInvoker};

#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    WriteArtifact {
        name: String,
        bytes: Vec<u8>,
        delay: Option<Duration>,
    },
    Exit {
        code: i32,
        stderr: String,
    },
}

/// Test double for [`RenderInvoker`].
///
/// Records every request it receives and simulates the renderer by writing
/// (or not writing) an artifact into the request's output directory.
///
/// # Example
///
/// ```ignore
/// use kude_external::MockInvoker;
///
/// let invoker = MockInvoker::writes("output.pdf", b"%PDF-1.7");
/// // ... run the pipeline ...
/// assert_eq!(invoker.calls(), 1);
/// ```
#[derive(Debug)]
pub struct MockInvoker {
    behavior: Behavior,
    stdout: String,
    requests: Mutex<Vec<ExternalRenderRequest>>,
}

impl MockInvoker {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            stdout: String::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Exit successfully without producing anything.
    #[must_use]
    pub fn succeeds() -> Self {
        Self::with_behavior(Behavior::Succeed)
    }

    /// Write `bytes` to `name` in the output directory before exiting.
    #[must_use]
    pub fn writes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_behavior(Behavior::WriteArtifact {
            name: name.into(),
            bytes: bytes.into(),
            delay: None,
        })
    }

    /// Exit immediately and write the artifact from a background thread after `delay`.
    #[must_use]
    pub fn writes_after(
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Self {
        Self::with_behavior(Behavior::WriteArtifact {
            name: name.into(),
            bytes: bytes.into(),
            delay: Some(delay),
        })
    }

    /// Exit with `code` and the given stderr.
    #[must_use]
    pub fn exits_with(code: i32, stderr: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Exit {
            code,
            stderr: stderr.into(),
        })
    }

    /// Stdout reported on every invocation.
    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Number of invocations so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<ExternalRenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl RenderInvoker for MockInvoker {
    fn invoke(
        &self,
        request: &ExternalRenderRequest,
        cancel: &CancelToken,
    ) -> Result<InvocationOutput, ExternalError> {
        self.requests.lock().unwrap().push(request.clone());
        if cancel.is_cancelled() {
            return Err(ExternalError::Cancelled);
        }

        let mut output = InvocationOutput {
            stdout: self.stdout.clone(),
            ..InvocationOutput::success()
        };
        match &self.behavior {
            Behavior::Succeed => {}
            Behavior::WriteArtifact { name, bytes, delay } => {
                let path: PathBuf = request.output_dir().join(name);
                match delay {
                    None => std::fs::write(&path, bytes).map_err(ExternalError::Workspace)?,
                    Some(delay) => {
                        let (bytes, delay) = (bytes.clone(), *delay);
                        thread::spawn(move || {
                            thread::sleep(delay);
                            let _ = std::fs::write(path, bytes);
                        });
                    }
                }
            }
            Behavior::Exit { code, stderr } => {
                output.exit_code = Some(*code);
                output.stderr.clone_from(stderr);
            }
        }
        Ok(output)
    }
}
