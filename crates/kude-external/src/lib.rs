//! Out-of-process KUDE rendering.
//!
//! The external renderer is an opaque program (typically a JVM running a
//! report engine) that receives the XML, a template directory, an output
//! directory and a JSON parameter object, and writes a PDF into the output
//! directory. Process exit does not guarantee the file is visible yet, so the
//! result is collected by polling.
//!
//! # Architecture
//!
//! - [`ExternalRenderRequest`]: immutable argument set for one invocation,
//!   with whitespace pre-flight validation
//! - [`RenderInvoker`]: capability trait for running the renderer;
//!   [`ProcessInvoker`] spawns a real process with a hard timeout
//! - [`Workspace`]: uniquely named temporary directory, removed on drop
//! - [`ResultSynchronizer`]: bounded polling state machine that reads the
//!   artifact and always removes the workspace
//! - [`ExternalRenderer`]: the pipeline tying the above together
//! - [`CancelToken`]: stops a running render early, still removing its workspace
//!
//! # Example
//!
//! ```ignore
//! use kude_document::{InvoiceDocument, RenderParameters, XmlSource};
//! use kude_external::{ExternalRenderer, RendererCommand};
//!
//! let command = RendererCommand::new("java")
//!     .jvm_args(["-Dfile.encoding=IBM850"])
//!     .jar("/opt/kude/CreateKude.jar");
//! let renderer = ExternalRenderer::new(command, "/opt/kude/templates");
//!
//! let source = XmlSource::detect("/data/de.xml");
//! let doc = InvoiceDocument::from_source(&source)?;
//! let pdf = renderer.render(&source, &doc, &RenderParameters::default())?;
//! ```

mod cancel;
mod error;
mod invoker;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod pipeline;
mod request;
mod sync;
mod workspace;

pub use cancel::CancelToken;
pub use error::ExternalError;
pub use invoker::{InvocationOutput, ProcessInvoker, RenderInvoker};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockInvoker;
pub use pipeline::ExternalRenderer;
pub use request::{ExternalRenderRequest, RendererCommand};
pub use sync::{ResultSynchronizer, SyncPolicy};
pub use workspace::Workspace;
