//! Conventional artifact file names.

use crate::InvoiceDocument;

/// File name for a rendered document:
/// `{label}_{authorization}-{branch}-{point}-{number}[-{series}].{extension}`.
///
/// Path separators in the label are replaced so the name always stays inside
/// its target directory.
#[must_use]
pub fn artifact_file_name(doc: &InvoiceDocument, extension: &str) -> String {
    let label: String = doc
        .document_type_label()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let series = doc
        .series()
        .map(|s| format!("-{s}"))
        .unwrap_or_default();
    format!(
        "{label}_{}-{}-{}-{}{series}.{extension}",
        doc.authorization_number(),
        doc.branch(),
        doc.point(),
        doc.document_number(),
    )
}
