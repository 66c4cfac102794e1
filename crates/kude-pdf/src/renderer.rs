//! KUDE report composition.

use kude_document::{InvoiceDocument, LineItem, RenderParameters};

use crate::layout::Block;
use crate::writer::write_pdf;

const TITLE: &str = "KUDE - Factura Electrónica";
const FOOTER: &str = "Representación gráfica de documento electrónico";
const ITEMS_UNAVAILABLE: &str = "No se pudieron extraer los items del XML";

const TITLE_SIZE: f32 = 18.0;
const SECTION_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;
const ITEM_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 8.0;

/// Renders an [`InvoiceDocument`] to PDF bytes without external tools.
///
/// The report contains a title, the document identification fields, one block
/// per line item and, unless disabled, a dump of the render parameters.
#[derive(Debug, Clone)]
pub struct NativeRenderer {
    include_parameters: bool,
}

impl NativeRenderer {
    /// Create a renderer that includes the parameter dump.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_parameters: true,
        }
    }

    /// Enable or disable the parameter dump at the end of the report.
    #[must_use]
    pub fn include_parameters(mut self, include: bool) -> Self {
        self.include_parameters = include;
        self
    }

    /// Render a document.
    ///
    /// A document without line items is still rendered; the items section then
    /// shows a notice instead of failing the whole report.
    #[must_use]
    pub fn render(&self, doc: &InvoiceDocument, params: &RenderParameters) -> Vec<u8> {
        let blocks = self.compose(doc, params);
        let pdf = write_pdf(&blocks, TITLE);
        tracing::info!(
            document_type = doc.document_type().code(),
            bytes = pdf.len(),
            "rendered KUDE in-process"
        );
        pdf
    }

    fn compose(&self, doc: &InvoiceDocument, params: &RenderParameters) -> Vec<Block> {
        let mut blocks = vec![Block::centered(TITLE, TITLE_SIZE, true), Block::Space(BODY_SIZE)];

        blocks.push(Block::text(
            format!("Tipo Documento: {}", doc.document_type_label()),
            BODY_SIZE,
        ));
        blocks.push(Block::text(
            format!("Timbrado: {}", doc.authorization_number()),
            BODY_SIZE,
        ));
        blocks.push(Block::text(
            format!("Establecimiento: {}", doc.branch()),
            BODY_SIZE,
        ));
        blocks.push(Block::text(format!("Punto: {}", doc.point()), BODY_SIZE));
        blocks.push(Block::text(
            format!("Número: {}", doc.document_number()),
            BODY_SIZE,
        ));
        if let Some(series) = doc.series() {
            blocks.push(Block::text(format!("Serie: {series}"), BODY_SIZE));
        }
        blocks.push(Block::Space(BODY_SIZE));

        match doc.items() {
            Some(items) => {
                blocks.push(Block::heading("Items:", SECTION_SIZE));
                blocks.push(Block::Space(ITEM_SIZE / 2.0));
                for (index, item) in items.iter().enumerate() {
                    push_item(&mut blocks, index + 1, item);
                }
            }
            None => {
                tracing::warn!(
                    document_number = doc.document_number(),
                    "no line items found in document, rendering notice instead"
                );
                blocks.push(Block::text(ITEMS_UNAVAILABLE, ITEM_SIZE));
            }
        }

        if self.include_parameters && !params.is_empty() {
            blocks.push(Block::Space(BODY_SIZE));
            blocks.push(Block::heading("Parámetros:", BODY_SIZE));
            for line in params.to_pretty_json().lines() {
                blocks.push(Block::text(line, SMALL_SIZE));
            }
        }

        blocks.push(Block::Space(BODY_SIZE));
        blocks.push(Block::centered(FOOTER, SMALL_SIZE, false));
        blocks
    }
}

impl Default for NativeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn push_item(blocks: &mut Vec<Block>, number: usize, item: &LineItem) {
    let field = |label: &str, value: Option<&String>| {
        Block::text(
            format!("  {label}: {}", LineItem::display(value.map(String::as_str))),
            ITEM_SIZE,
        )
    };
    blocks.push(Block::text(format!("Item {number}:"), ITEM_SIZE));
    blocks.push(field("Código", item.code.as_ref()));
    blocks.push(field("Descripción", item.description.as_ref()));
    blocks.push(field("Cantidad", item.quantity.as_ref()));
    blocks.push(field("Precio", item.unit_price.as_ref()));
    blocks.push(field("Total", item.line_total.as_ref()));
    blocks.push(Block::Space(ITEM_SIZE / 2.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Line;
    use pretty_assertions::assert_eq;

    fn sample_xml(series: &str, items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rDE><DE><gTimb>
  <iTiDE>1</iTiDE><dDesTiDE>Factura electrónica</dDesTiDE>
  <dNumTim>12345678</dNumTim><dEst>001</dEst><dPunExp>002</dPunExp>
  <dNumDoc>0000123</dNumDoc>{series}
</gTimb><gDtipDE>{items}</gDtipDE></DE></rDE>"#
        )
    }

    const TWO_ITEMS: &str = "<gCamItem><dCodInt>A1</dCodInt><dDesProSer>Widget</dDesProSer>\
        <dCantProSer>2</dCantProSer><dPUniProSer>1500</dPUniProSer></gCamItem>\
        <gCamItem><dCodInt>B2</dCodInt></gCamItem>";

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Line(Line { text, .. }) => Some(text.clone()),
                Block::Space(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_render_contains_identification_and_items() {
        let doc = InvoiceDocument::parse(&sample_xml("", TWO_ITEMS)).unwrap();
        let pdf = NativeRenderer::new().render(&doc, &RenderParameters::default());
        let body = String::from_utf8_lossy(&pdf);

        assert!(body.contains("Timbrado: 12345678"));
        assert!(body.contains("Establecimiento: 001"));
        assert!(body.contains("Item 1:"));
        assert!(body.contains("Item 2:"));
        assert!(!body.contains("Serie:"));
    }

    #[test]
    fn test_render_includes_series_when_present() {
        let doc =
            InvoiceDocument::parse(&sample_xml("<dSerieNum>AB</dSerieNum>", TWO_ITEMS)).unwrap();
        let pdf = NativeRenderer::new().render(&doc, &RenderParameters::default());
        assert!(String::from_utf8_lossy(&pdf).contains("Serie: AB"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = InvoiceDocument::parse(&sample_xml("", TWO_ITEMS)).unwrap();
        let params = RenderParameters::default().merge_json_lenient(r#"{"LOGO":"x.png"}"#);
        let renderer = NativeRenderer::new();

        assert_eq!(renderer.render(&doc, &params), renderer.render(&doc, &params));
    }

    #[test]
    fn test_compose_defaults_missing_item_fields() {
        let doc = InvoiceDocument::parse(&sample_xml("", TWO_ITEMS)).unwrap();
        let lines = texts(&NativeRenderer::new().compose(&doc, &RenderParameters::default()));

        let second = lines.iter().position(|l| l == "Item 2:").unwrap();
        assert_eq!(
            lines[second..second + 6],
            [
                "Item 2:",
                "  Código: B2",
                "  Descripción: N/A",
                "  Cantidad: N/A",
                "  Precio: N/A",
                "  Total: N/A",
            ]
        );
    }

    #[test]
    fn test_compose_without_items_shows_notice() {
        let doc = InvoiceDocument::parse(&sample_xml("", "")).unwrap();
        let lines = texts(&NativeRenderer::new().compose(&doc, &RenderParameters::default()));

        assert!(lines.iter().any(|l| l == ITEMS_UNAVAILABLE));
        assert!(!lines.iter().any(|l| l == "Items:"));
    }

    #[test]
    fn test_compose_parameter_dump() {
        let doc = InvoiceDocument::parse(&sample_xml("", "")).unwrap();
        let params = RenderParameters::default();

        let with = texts(&NativeRenderer::new().compose(&doc, &params));
        assert!(with.iter().any(|l| l == "Parámetros:"));
        assert!(with.iter().any(|l| l.contains("\"REPORT_LOCALE\": \"es_PY\"")));

        let without = texts(
            &NativeRenderer::new()
                .include_parameters(false)
                .compose(&doc, &params),
        );
        assert!(!without.iter().any(|l| l == "Parámetros:"));
    }
}
