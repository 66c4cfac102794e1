//! `kude render` command implementation.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use console::Term;
use kude_config::CliSettings;
use kude_document::{InvoiceDocument, XmlSource, artifact_file_name};
use kude_render::Renderer;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// DE XML file path, or inline XML text.
    xml: String,

    /// Extra report parameters as a JSON object.
    #[arg(short, long)]
    params: Option<String>,

    /// Path to configuration file (default: auto-discover kude.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External template directory (overrides config, enables external rendering).
    #[arg(long, env = "KUDE_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Render in-process even when an external renderer is configured.
    #[arg(long)]
    native: bool,

    /// Directory to write the PDF into, named after the document.
    #[arg(long, conflicts_with = "output")]
    out_dir: Option<PathBuf>,

    /// File to write the PDF to (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, rendering or writing the PDF fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            template_dir: self.template_dir.clone(),
            native: self.native.then_some(true),
        };
        let renderer = Renderer::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(strategy = renderer.strategy().name(), "renderer ready");

        let source = XmlSource::detect(self.xml);
        let params = match self.params.as_deref() {
            Some(json) => renderer.parameters().merge_json_lenient(json),
            None => renderer.parameters(),
        };
        let rendered = renderer.render_document(&source, &params)?;
        let pdf = rendered.pdf;

        match (self.out_dir, self.output) {
            (Some(dir), _) => {
                let path = write_into(&dir, &rendered.document, &pdf)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            (None, Some(path)) => {
                std::fs::write(&path, &pdf)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            (None, None) => {
                if Term::stdout().is_term() {
                    output.warning("Writing PDF to a terminal; use --output or --out-dir");
                }
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&pdf)?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

/// Write `pdf` into `dir` under the document's artifact name.
fn write_into(dir: &Path, doc: &InvoiceDocument, pdf: &[u8]) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(artifact_file_name(doc, "pdf"));
    std::fs::write(&path, pdf)?;
    Ok(path)
}
