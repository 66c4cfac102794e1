//! `kude inspect` command implementation.

use std::io::Write;

use clap::Args;
use kude_document::{InvoiceDocument, XmlSource};

use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Args)]
pub(crate) struct InspectArgs {
    /// DE XML file path, or inline XML text.
    xml: String,
}

impl InspectArgs {
    /// Print the extracted document as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or extracted.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let doc = InvoiceDocument::from_source(&XmlSource::detect(self.xml))?;
        let json = serde_json::to_string_pretty(&doc)?;
        writeln!(std::io::stdout(), "{json}")?;
        Ok(())
    }
}
