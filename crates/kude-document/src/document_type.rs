//! Supported document types and template selection.

use std::fmt;

use serde::Serialize;

use crate::DocumentError;

/// File extension of compiled report templates used by the external renderer.
const TEMPLATE_EXTENSION: &str = "jasper";

/// Electronic document type (`iTiDE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum DocumentType {
    /// 1 - Factura electrónica.
    Invoice,
    /// 2 - Factura electrónica de importación.
    ImportInvoice,
    /// 3 - Factura electrónica de exportación.
    ExportInvoice,
    /// 4 - Autofactura electrónica.
    SelfBillingInvoice,
    /// 5 - Nota de crédito electrónica.
    CreditNote,
    /// 6 - Nota de débito electrónica.
    DebitNote,
    /// 7 - Nota de remisión electrónica.
    DeliveryNote,
}

impl DocumentType {
    /// All supported types in code order.
    pub const ALL: [Self; 7] = [
        Self::Invoice,
        Self::ImportInvoice,
        Self::ExportInvoice,
        Self::SelfBillingInvoice,
        Self::CreditNote,
        Self::DebitNote,
        Self::DeliveryNote,
    ];

    /// Map a numeric type code to a document type.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::UnsupportedDocumentType`] for any code outside `1..=7`.
    pub fn from_code(code: i64) -> Result<Self, DocumentError> {
        match code {
            1 => Ok(Self::Invoice),
            2 => Ok(Self::ImportInvoice),
            3 => Ok(Self::ExportInvoice),
            4 => Ok(Self::SelfBillingInvoice),
            5 => Ok(Self::CreditNote),
            6 => Ok(Self::DebitNote),
            7 => Ok(Self::DeliveryNote),
            other => Err(DocumentError::UnsupportedDocumentType(other)),
        }
    }

    /// Numeric type code as it appears in `iTiDE`.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Invoice => 1,
            Self::ImportInvoice => 2,
            Self::ExportInvoice => 3,
            Self::SelfBillingInvoice => 4,
            Self::CreditNote => 5,
            Self::DebitNote => 6,
            Self::DeliveryNote => 7,
        }
    }

    /// Template identifier used by the external renderer.
    #[must_use]
    pub fn template_id(self) -> &'static str {
        match self {
            Self::Invoice => "Factura",
            Self::ImportInvoice => "FacturaImportacion",
            Self::ExportInvoice => "FacturaExportacion",
            Self::SelfBillingInvoice => "AutoFactura",
            Self::CreditNote => "NotaCredito",
            Self::DebitNote => "NotaDebito",
            Self::DeliveryNote => "NotaRemision",
        }
    }

    /// Compiled template file name (e.g. `Factura.jasper`).
    #[must_use]
    pub fn template_file_name(self) -> String {
        format!("{}.{TEMPLATE_EXTENSION}", self.template_id())
    }
}

impl From<DocumentType> for u8 {
    fn from(value: DocumentType) -> Self {
        value.code()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.template_id(), self.code())
    }
}

/// Select the template identifier for a raw document type code.
///
/// # Errors
///
/// Returns [`DocumentError::UnsupportedDocumentType`] for any code outside `1..=7`.
pub fn select_template(code: i64) -> Result<&'static str, DocumentError> {
    DocumentType::from_code(code).map(DocumentType::template_id)
}
