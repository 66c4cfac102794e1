//! Rendering error types.

use std::fmt;
use std::time::Duration;

use kude_config::ConfigError;
use kude_document::DocumentError;
use kude_external::ExternalError;

/// Semantic failure categories of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderErrorKind {
    /// The XML does not have the expected shape.
    MalformedDocument,
    /// The document type code has no template.
    UnsupportedDocumentType,
    /// Pre-flight validation failed; nothing was launched.
    InvalidArgument,
    /// The external renderer failed to start, exited non-zero or timed out.
    ExternalProcessFailed,
    /// The external renderer succeeded but no artifact appeared.
    ArtifactNotProduced,
    /// The artifact was found but could not be read.
    ArtifactUnreadable,
    /// Input could not be read or a workspace could not be prepared.
    Io,
    /// Configuration is missing or invalid.
    Config,
    /// The caller abandoned the render; its workspace was removed first.
    Cancelled,
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind_str = match self {
            Self::MalformedDocument => "Malformed document",
            Self::UnsupportedDocumentType => "Unsupported document type",
            Self::InvalidArgument => "Invalid argument",
            Self::ExternalProcessFailed => "External process failed",
            Self::ArtifactNotProduced => "Artifact not produced",
            Self::ArtifactUnreadable => "Artifact unreadable",
            Self::Io => "I/O error",
            Self::Config => "Configuration error",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(kind_str)
    }
}

/// Error from [`Renderer`](crate::Renderer).
///
/// Component errors are carried unchanged; [`RenderError::kind`] classifies them.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Document extraction failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// External rendering failed.
    #[error(transparent)]
    External(#[from] ExternalError),
    /// Configuration failed to load (see [`Renderer::load`](crate::Renderer::load)).
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The render did not finish within the caller's deadline and was cancelled.
    #[error("render did not finish within {}s", .0.as_secs_f32())]
    TimedOut(Duration),
    /// I/O outside of any component (e.g. a background render task was lost).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Semantic category of this error.
    #[must_use]
    pub fn kind(&self) -> RenderErrorKind {
        match self {
            Self::Document(DocumentError::UnsupportedDocumentType(_)) => {
                RenderErrorKind::UnsupportedDocumentType
            }
            Self::Document(e) if e.is_malformed() => RenderErrorKind::MalformedDocument,
            Self::Document(_) | Self::Io(_) => RenderErrorKind::Io,
            Self::External(e) => match e {
                ExternalError::InvalidArgument { .. } => RenderErrorKind::InvalidArgument,
                ExternalError::ArtifactNotProduced { .. } => RenderErrorKind::ArtifactNotProduced,
                ExternalError::ArtifactUnreadable { .. } => RenderErrorKind::ArtifactUnreadable,
                ExternalError::Workspace(_) => RenderErrorKind::Io,
                ExternalError::Cancelled => RenderErrorKind::Cancelled,
                _ => RenderErrorKind::ExternalProcessFailed,
            },
            Self::Config(_) => RenderErrorKind::Config,
            Self::TimedOut(_) => RenderErrorKind::Cancelled,
        }
    }
}
