//! XML input: inline text or a file path.

use std::borrow::Cow;
use std::path::PathBuf;

use crate::DocumentError;

/// Where the DE XML comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlSource {
    /// Literal XML text.
    Inline(String),
    /// Path to an XML file, read fully on use.
    Path(PathBuf),
}

impl XmlSource {
    /// Classify a raw argument: text starting with `<` (after leading
    /// whitespace) is inline XML, anything else is a path.
    #[must_use]
    pub fn detect(arg: impl Into<String>) -> Self {
        let arg = arg.into();
        if arg.trim_start().starts_with('<') {
            Self::Inline(arg)
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    /// XML content, reading the file for [`XmlSource::Path`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Read`] if the file cannot be read.
    pub fn read(&self) -> Result<Cow<'_, str>, DocumentError> {
        match self {
            Self::Inline(xml) => Ok(Cow::Borrowed(xml)),
            Self::Path(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| DocumentError::Read {
                    path: path.clone(),
                    source,
                }),
        }
    }
}
