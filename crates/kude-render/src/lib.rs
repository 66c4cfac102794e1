//! KUDE rendering facade.
//!
//! [`Renderer`] turns DE XML into PDF bytes using one of two strategies:
//!
//! - **Native**: composes the report in-process with [`kude_pdf::NativeRenderer`]
//! - **External**: delegates to an external report engine through
//!   [`kude_external::ExternalRenderer`], which polls for the artifact and
//!   always removes its temporary workspace
//!
//! The strategy is chosen from configuration: the native renderer is used
//! whenever no external template root is configured.
//!
//! # Example
//!
//! ```ignore
//! use kude_document::XmlSource;
//! use kude_render::Renderer;
//!
//! let renderer = Renderer::load(None, None)?;
//! let params = renderer.parameters().merge_json_lenient(r#"{"LOGO":"logo.png"}"#);
//! let pdf = renderer.render(&XmlSource::detect("de.xml"), &params)?;
//! ```
//!
//! # Features
//!
//! - `async`: [`AsyncRenderer`], which runs renders on tokio's blocking pool

#[cfg(feature = "async")]
mod async_renderer;
mod error;
mod renderer;

#[cfg(feature = "async")]
pub use async_renderer::AsyncRenderer;
pub use error::{RenderError, RenderErrorKind};
pub use kude_external::CancelToken;
pub use renderer::{RenderStrategy, Rendered, Renderer};
