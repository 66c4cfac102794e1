//! In-process PDF rendering of KUDE documents.
//!
//! [`NativeRenderer`] lays out an [`InvoiceDocument`](kude_document::InvoiceDocument)
//! as a plain text report (identification fields, line items, parameters) and
//! writes it with `pdf-writer` using the standard Helvetica fonts.
//!
//! Output is byte-for-byte deterministic: no timestamps or random document IDs
//! are embedded and content streams are left uncompressed.
//!
//! # Example
//!
//! ```
//! use kude_document::{InvoiceDocument, RenderParameters};
//! use kude_pdf::NativeRenderer;
//!
//! let xml = "<rDE><DE><iTiDE>1</iTiDE><dDesTiDE>Factura</dDesTiDE>\
//!     <dNumTim>12345678</dNumTim><dEst>001</dEst><dPunExp>002</dPunExp>\
//!     <dNumDoc>0000123</dNumDoc></DE></rDE>";
//! let doc = InvoiceDocument::parse(xml).unwrap();
//!
//! let pdf = NativeRenderer::new().render(&doc, &RenderParameters::default());
//! assert!(pdf.starts_with(b"%PDF-"));
//! ```

mod encoding;
mod layout;
mod renderer;
mod writer;

pub use renderer::NativeRenderer;
