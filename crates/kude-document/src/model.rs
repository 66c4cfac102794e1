//! Normalized invoice document model.

use serde::Serialize;

use crate::xml::{self, Element};
use crate::{DocumentError, DocumentType, XmlSource};

/// Placeholder shown for line item fields that are absent in the source.
pub const NOT_AVAILABLE: &str = "N/A";

/// Root element of a signed electronic document.
const ROOT_ELEMENT: &str = "rDE";
/// Document element holding header fields and item groups.
const DOCUMENT_ELEMENT: &str = "DE";
/// Repeatable line item group.
const ITEM_ELEMENT: &str = "gCamItem";

/// A single invoice line.
///
/// Every field is optional; use [`LineItem::display`] to render a missing value
/// as [`NOT_AVAILABLE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Internal product code (`dCodInt`).
    pub code: Option<String>,
    /// Product or service description (`dDesProSer`).
    pub description: Option<String>,
    /// Quantity (`dCantProSer`).
    pub quantity: Option<String>,
    /// Unit price (`dPUniProSer`).
    pub unit_price: Option<String>,
    /// Gross line total (`dTotBruOpeItem`).
    pub line_total: Option<String>,
}

impl LineItem {
    /// Field value for display, or [`NOT_AVAILABLE`] when absent.
    #[must_use]
    pub fn display(value: Option<&str>) -> &str {
        value.unwrap_or(NOT_AVAILABLE)
    }

    fn from_element(element: &Element) -> Self {
        let field = |name: &str| optional_text(element, name);
        Self {
            code: field("dCodInt"),
            description: field("dDesProSer"),
            quantity: field("dCantProSer"),
            unit_price: field("dPUniProSer"),
            line_total: field("dTotBruOpeItem"),
        }
    }
}

/// Invoice document extracted from DE XML.
///
/// Numeric-looking identifiers (authorization number, branch, point, document
/// number) are kept as text so leading zeros survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDocument {
    document_type: DocumentType,
    document_type_label: String,
    authorization_number: String,
    branch: String,
    point: String,
    document_number: String,
    series: Option<String>,
    items: Option<Vec<LineItem>>,
}

impl InvoiceDocument {
    /// Extract a document from XML text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] (or an XML syntax error) when the
    /// `rDE`/`DE` structure or a required header field is missing, or when
    /// `iTiDE` is not an integer. Returns
    /// [`DocumentError::UnsupportedDocumentType`] for integer codes outside `1..=7`.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let tree = xml::parse(xml)?;
        let root = tree
            .find(ROOT_ELEMENT)
            .ok_or_else(|| missing(ROOT_ELEMENT))?;
        let de = root
            .find(DOCUMENT_ELEMENT)
            .ok_or_else(|| missing(DOCUMENT_ELEMENT))?;

        let code_text = required_text(de, "iTiDE")?;
        let code = code_text.parse::<i64>().map_err(|_| {
            DocumentError::Malformed(format!("iTiDE is not an integer: {code_text:?}"))
        })?;
        let document_type = DocumentType::from_code(code)?;

        let item_elements = de.find_all(ITEM_ELEMENT);
        let items = if item_elements.is_empty() {
            None
        } else {
            Some(item_elements.into_iter().map(LineItem::from_element).collect())
        };

        Ok(Self {
            document_type,
            document_type_label: required_text(de, "dDesTiDE")?,
            authorization_number: required_text(de, "dNumTim")?,
            branch: required_text(de, "dEst")?,
            point: required_text(de, "dPunExp")?,
            document_number: required_text(de, "dNumDoc")?,
            series: optional_text(de, "dSerieNum"),
            items,
        })
    }

    /// Extract a document from inline XML or an XML file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Read`] if the file cannot be read, otherwise
    /// the same errors as [`InvoiceDocument::parse`].
    pub fn from_source(source: &XmlSource) -> Result<Self, DocumentError> {
        let xml = source.read()?;
        Self::parse(&xml)
    }

    /// Document type (`iTiDE`).
    #[must_use]
    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Human-readable type description (`dDesTiDE`).
    #[must_use]
    pub fn document_type_label(&self) -> &str {
        &self.document_type_label
    }

    /// Stamp ("timbrado") authorization number (`dNumTim`).
    #[must_use]
    pub fn authorization_number(&self) -> &str {
        &self.authorization_number
    }

    /// Issuer branch (`dEst`).
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Issuing point (`dPunExp`).
    #[must_use]
    pub fn point(&self) -> &str {
        &self.point
    }

    /// Document number (`dNumDoc`).
    #[must_use]
    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    /// Series (`dSerieNum`), absent when the element is missing or empty.
    #[must_use]
    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    /// Line items in document order, or `None` when the document carries no
    /// `gCamItem` group.
    #[must_use]
    pub fn items(&self) -> Option<&[LineItem]> {
        self.items.as_deref()
    }
}

fn missing(name: &str) -> DocumentError {
    DocumentError::Malformed(format!("missing <{name}> element"))
}

fn required_text(parent: &Element, name: &str) -> Result<String, DocumentError> {
    parent
        .find(name)
        .map(|e| e.text_content().trim().to_owned())
        .ok_or_else(|| missing(name))
}

fn optional_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .find(name)
        .map(|e| e.text_content().trim().to_owned())
        .filter(|text| !text.is_empty())
}
