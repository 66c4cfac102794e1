//! Async adapter over [`Renderer`].

use std::sync::Arc;
use std::time::Duration;

use kude_document::{RenderParameters, XmlSource};
use kude_external::CancelToken;
use tokio::task::{JoinError, JoinHandle};

use crate::{RenderError, Renderer};

/// Runs renders on tokio's blocking pool.
///
/// The external strategy blocks on a child process and sleeps between
/// polls, so it must not run on an async worker thread. Dropping a returned
/// future cancels its render: the blocking task stops at its next wait and
/// removes its workspace.
#[derive(Debug, Clone)]
pub struct AsyncRenderer {
    inner: Arc<Renderer>,
}

/// Cancels the render when the awaiting future goes away.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl AsyncRenderer {
    /// Wrap a renderer.
    #[must_use]
    pub fn new(renderer: Renderer) -> Self {
        Self {
            inner: Arc::new(renderer),
        }
    }

    /// Underlying renderer.
    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.inner
    }

    /// Render `xml` to PDF bytes without blocking the async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::render`], plus [`RenderError::Io`] if the blocking
    /// task was cancelled by runtime shutdown.
    pub async fn render(
        &self,
        xml: XmlSource,
        params: RenderParameters,
    ) -> Result<Vec<u8>, RenderError> {
        let cancel = CancelToken::new();
        let _guard = CancelOnDrop(cancel.clone());
        joined(self.spawn(xml, params, cancel).await)
    }

    /// Render with a deadline.
    ///
    /// When `timeout` elapses the render is cancelled and this waits for its
    /// workspace to be removed before returning [`RenderError::TimedOut`].
    ///
    /// # Errors
    ///
    /// Same as [`AsyncRenderer::render`], plus [`RenderError::TimedOut`].
    pub async fn render_with_timeout(
        &self,
        xml: XmlSource,
        params: RenderParameters,
        timeout: Duration,
    ) -> Result<Vec<u8>, RenderError> {
        let cancel = CancelToken::new();
        let _guard = CancelOnDrop(cancel.clone());
        let mut task = self.spawn(xml, params, cancel.clone());

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(result) => joined(result),
            Err(_) => {
                tracing::warn!(?timeout, "render deadline elapsed, cancelling");
                cancel.cancel();
                if let Err(e) = task.await
                    && e.is_panic()
                {
                    std::panic::resume_unwind(e.into_panic());
                }
                Err(RenderError::TimedOut(timeout))
            }
        }
    }

    fn spawn(
        &self,
        xml: XmlSource,
        params: RenderParameters,
        cancel: CancelToken,
    ) -> JoinHandle<Result<Vec<u8>, RenderError>> {
        let renderer = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            renderer
                .render_cancellable(&xml, &params, &cancel)
                .map(|rendered| rendered.pdf)
        })
    }
}

fn joined(
    result: Result<Result<Vec<u8>, RenderError>, JoinError>,
) -> Result<Vec<u8>, RenderError> {
    match result {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(RenderError::Io(std::io::Error::other(e))),
    }
}
