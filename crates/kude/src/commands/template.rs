//! `kude template` command implementation.

use std::io::Write;

use clap::Args;
use kude_document::select_template;

use crate::error::CliError;

/// Arguments for the template command.
#[derive(Args)]
pub(crate) struct TemplateArgs {
    /// Document type code (`iTiDE`).
    #[arg(allow_hyphen_values = true)]
    code: i64,
}

impl TemplateArgs {
    /// Print the template identifier for the code.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported codes.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let template = select_template(self.code)?;
        writeln!(std::io::stdout(), "{template}")?;
        Ok(())
    }
}
