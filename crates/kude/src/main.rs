//! KUDE CLI - PDF rendering for electronic invoices.
//!
//! Provides commands for:
//! - `render`: Render DE XML to a KUDE PDF
//! - `template`: Show the template for a document type code
//! - `inspect`: Print the extracted document model as JSON

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{InspectArgs, RenderArgs, TemplateArgs};
use output::Output;

/// KUDE - PDF rendering for electronic invoices.
#[derive(Parser)]
#[command(name = "kude", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render DE XML to a KUDE PDF.
    Render(RenderArgs),
    /// Show the template identifier for a document type code.
    Template(TemplateArgs),
    /// Print the extracted document model as JSON.
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Template(args) => args.execute(),
        Commands::Inspect(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
