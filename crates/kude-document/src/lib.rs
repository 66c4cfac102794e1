//! Electronic invoice document model for KUDE rendering.
//!
//! This crate turns a tax-authority invoice XML record (`rDE` → `DE`) into an
//! immutable [`InvoiceDocument`] and provides the pieces every renderer shares:
//!
//! - [`DocumentType`]: the seven supported document types and their template
//!   identifiers ([`select_template`] is the raw-code entry point)
//! - [`XmlSource`]: inline XML text or a path to an XML file
//! - [`RenderParameters`]: report parameters with a fixed locale entry
//! - [`artifact_file_name`]: the conventional PDF file name for a document
//!
//! # Example
//!
//! ```
//! use kude_document::{DocumentType, InvoiceDocument};
//!
//! let xml = r#"<?xml version="1.0"?>
//! <rDE><DE>
//!   <gTimb>
//!     <iTiDE>1</iTiDE><dDesTiDE>Factura electrónica</dDesTiDE>
//!     <dNumTim>0012345</dNumTim><dEst>001</dEst><dPunExp>002</dPunExp>
//!     <dNumDoc>0000123</dNumDoc>
//!   </gTimb>
//! </DE></rDE>"#;
//!
//! let doc = InvoiceDocument::parse(xml).unwrap();
//! assert_eq!(doc.document_type(), DocumentType::Invoice);
//! assert_eq!(doc.authorization_number(), "0012345");
//! assert_eq!(doc.document_type().template_id(), "Factura");
//! ```

mod document_type;
mod error;
mod model;
mod naming;
mod params;
mod source;
mod xml;

pub use document_type::{DocumentType, select_template};
pub use error::DocumentError;
pub use model::{InvoiceDocument, LineItem, NOT_AVAILABLE};
pub use naming::artifact_file_name;
pub use params::{DEFAULT_LOCALE, LOCALE_KEY, RenderParameters};
pub use source::XmlSource;
