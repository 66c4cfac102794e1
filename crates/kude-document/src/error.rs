//! Error types for document extraction.

use std::path::PathBuf;

/// Error while reading or interpreting an invoice document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// The XML does not have the expected shape (missing element, bad type code).
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The document type code is an integer outside the supported range.
    #[error("unsupported document type: {0}")]
    UnsupportedDocumentType(i64),

    /// XML syntax error.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Encoding error while decoding XML text.
    #[error("XML encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// The XML file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the XML file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// True for every error caused by the document's content rather than I/O.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::Xml(_) | Self::Encoding(_)
        )
    }
}
