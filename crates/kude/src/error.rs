//! CLI error types.

use kude_document::DocumentError;
use kude_render::{RenderError, RenderErrorKind};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("{}", render_message(.0))]
    Render(#[from] RenderError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Prefix render failures with their kind; configuration errors name themselves.
fn render_message(err: &RenderError) -> String {
    match err.kind() {
        RenderErrorKind::Config => err.to_string(),
        kind => format!("{kind}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_error_prefixed_with_kind() {
        let err = CliError::from(RenderError::from(DocumentError::UnsupportedDocumentType(9)));
        assert_eq!(
            err.to_string(),
            "Unsupported document type: unsupported document type: 9"
        );
    }

    #[test]
    fn test_config_error_not_prefixed() {
        let err = CliError::from(RenderError::from(kude_config::ConfigError::Validation(
            "locale cannot be empty".to_owned(),
        )));
        assert_eq!(err.to_string(), "Configuration error: locale cannot be empty");
    }
}
