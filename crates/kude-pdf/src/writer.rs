//! Pagination and PDF serialization.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::encoding::encode_win_ansi;
use crate::layout::{AVG_CHAR_WIDTH, Block, wrap};

/// A4 portrait, in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
/// Line height as a multiple of the font size.
const LEADING: f32 = 1.3;

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");

/// Text positioned on a page.
struct Placed {
    bytes: Vec<u8>,
    x: f32,
    y: f32,
    size: f32,
    bold: bool,
}

/// Lay out blocks top to bottom, starting a new page when the bottom margin
/// is reached. Always returns at least one page.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn paginate(blocks: &[Block]) -> Vec<Vec<Placed>> {
    let usable_width = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in blocks {
        match block {
            Block::Space(points) => y -= points,
            Block::Line(line) => {
                let char_width = line.size * AVG_CHAR_WIDTH;
                let max_chars = (usable_width / char_width) as usize;
                for piece in wrap(&line.text, max_chars) {
                    let height = line.size * LEADING;
                    if y - height < MARGIN {
                        pages.push(Vec::new());
                        y = PAGE_HEIGHT - MARGIN;
                    }
                    y -= height;

                    let x = if line.centered {
                        let width = piece.chars().count() as f32 * char_width;
                        ((PAGE_WIDTH - width) / 2.0).max(MARGIN)
                    } else {
                        MARGIN
                    };
                    if let Some(page) = pages.last_mut() {
                        page.push(Placed {
                            bytes: encode_win_ansi(&piece),
                            x,
                            y,
                            size: line.size,
                            bold: line.bold,
                        });
                    }
                }
            }
        }
    }
    pages
}

/// Serialize blocks into a complete PDF file.
pub(crate) fn write_pdf(blocks: &[Block], title: &str) -> Vec<u8> {
    let pages = paginate(blocks);

    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let page_tree_id = alloc.bump();
    let regular_id = alloc.bump();
    let bold_id = alloc.bump();
    let info_id = alloc.bump();
    let page_refs: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_refs.iter().map(|(page_id, _)| *page_id))
        .count(i32::try_from(page_refs.len()).unwrap_or(i32::MAX));

    for (placed, (page_id, content_id)) in pages.iter().zip(&page_refs) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(*content_id);
        page.resources()
            .fonts()
            .pair(REGULAR_FONT, regular_id)
            .pair(BOLD_FONT, bold_id);
        page.finish();

        let mut content = Content::new();
        for text in placed {
            let font = if text.bold { BOLD_FONT } else { REGULAR_FONT };
            content.begin_text();
            content.set_font(font, text.size);
            content.next_line(text.x, text.y);
            content.show(Str(&text.bytes));
            content.end_text();
        }
        let data = content.finish();
        pdf.stream(*content_id, &data);
    }

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr("kude"));

    pdf.finish()
}
