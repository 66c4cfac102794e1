//! Launching the external renderer.

use std::io::{ErrorKind, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::excerpt;
use crate::{CancelToken, ExternalError, ExternalRenderRequest};

/// Default hard timeout for one renderer run.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between exit-status checks while the renderer runs.
const WAIT_INTERVAL: Duration = Duration::from_millis(25);

/// How long output is still collected once the renderer has terminated.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Result of a renderer run that terminated on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
}

impl InvocationOutput {
    /// Successful exit with no output.
    #[must_use]
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// True when the renderer exited with code 0.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a non-zero exit into [`ExternalError::ProcessFailed`].
    pub(crate) fn check_status(&self) -> Result<(), ExternalError> {
        if self.succeeded() {
            return Ok(());
        }
        Err(ExternalError::ProcessFailed {
            exit_code: self.exit_code,
            stderr_excerpt: excerpt(&self.stderr),
        })
    }
}

/// Runs the external renderer for a request.
///
/// Implementations block until the renderer has terminated. A non-zero exit
/// is reported through [`InvocationOutput::exit_code`], not as an error; errors
/// are reserved for failing to run the renderer at all. Implementations that
/// wait should stop with [`ExternalError::Cancelled`] once `cancel` fires.
pub trait RenderInvoker: Send + Sync {
    /// Run the renderer and capture its output.
    fn invoke(
        &self,
        request: &ExternalRenderRequest,
        cancel: &CancelToken,
    ) -> Result<InvocationOutput, ExternalError>;
}

impl<T: RenderInvoker + ?Sized> RenderInvoker for Arc<T> {
    fn invoke(
        &self,
        request: &ExternalRenderRequest,
        cancel: &CancelToken,
    ) -> Result<InvocationOutput, ExternalError> {
        (**self).invoke(request, cancel)
    }
}

/// [`RenderInvoker`] that spawns the renderer as a child process.
///
/// Stdout and stderr are drained on helper threads so a chatty renderer can
/// never block on a full pipe. The child is killed once `timeout` elapses or
/// the render is cancelled. Output is collected for a short grace period
/// after the child is gone: a descendant the renderer left behind may hold
/// the pipes open indefinitely, and whatever it has not written by then is
/// dropped.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    timeout: Duration,
}

impl ProcessInvoker {
    /// Create an invoker with the given hard timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// How the wait on the child ended.
enum Termination {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

impl RenderInvoker for ProcessInvoker {
    fn invoke(
        &self,
        request: &ExternalRenderRequest,
        cancel: &CancelToken,
    ) -> Result<InvocationOutput, ExternalError> {
        let program = request.command().executable();
        tracing::debug!(command = %request.command_line(), "launching external renderer");

        let started_at = Instant::now();
        let mut child = Command::new(program)
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExternalError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let termination = loop {
            let stop = match child.try_wait() {
                Ok(Some(status)) => break Termination::Exited(status),
                Ok(None) if cancel.is_cancelled() => Termination::Cancelled,
                Ok(None) if started_at.elapsed() >= self.timeout => Termination::TimedOut,
                Ok(None) => {
                    cancel.sleep(WAIT_INTERVAL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("failed to poll renderer status: {e}");
                    Termination::TimedOut
                }
            };
            if let Err(e) = child.kill() {
                tracing::warn!("failed to kill renderer: {e}");
            }
            let _ = child.wait();
            break stop;
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        let stdout = collect(stdout.as_ref(), deadline);
        let stderr = collect(stderr.as_ref(), deadline);
        let elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        let status = match termination {
            Termination::Exited(status) => status,
            Termination::TimedOut => {
                tracing::warn!(elapsed_ms, "external renderer timed out");
                return Err(ExternalError::TimedOut {
                    timeout: self.timeout,
                    stderr_excerpt: excerpt(&stderr),
                });
            }
            Termination::Cancelled => {
                tracing::info!(elapsed_ms, "external renderer cancelled");
                return Err(ExternalError::Cancelled);
            }
        };

        tracing::debug!(
            exit_code = status.code(),
            elapsed_ms,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "external renderer exited"
        );
        Ok(InvocationOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Forward chunks read from `pipe` until it reaches EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if sender.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
    });
    receiver
}

/// Gather drained output until EOF or `deadline`, whichever comes first.
fn collect(receiver: Option<&Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(receiver) = receiver else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!("renderer output still open after exit, dropping the rest");
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
