//! Page-independent report layout.
//!
//! A report is a flat list of [`Block`]s. Pagination and positioning happen
//! in the writer; this module only decides what is said and in which style.

/// Average glyph width of Helvetica as a fraction of the font size.
pub(crate) const AVG_CHAR_WIDTH: f32 = 0.5;

/// One element of the report flow.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    /// A line of text.
    Line(Line),
    /// Vertical space in points.
    Space(f32),
}

/// A styled line of text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Line {
    pub(crate) text: String,
    pub(crate) size: f32,
    pub(crate) bold: bool,
    pub(crate) centered: bool,
}

impl Block {
    pub(crate) fn text(text: impl Into<String>, size: f32) -> Self {
        Self::Line(Line {
            text: text.into(),
            size,
            bold: false,
            centered: false,
        })
    }

    pub(crate) fn heading(text: impl Into<String>, size: f32) -> Self {
        Self::Line(Line {
            text: text.into(),
            size,
            bold: true,
            centered: false,
        })
    }

    pub(crate) fn centered(text: impl Into<String>, size: f32, bold: bool) -> Self {
        Self::Line(Line {
            text: text.into(),
            size,
            bold,
            centered: true,
        })
    }
}

/// Split `text` into pieces of at most `max_chars` characters, breaking at the
/// last space when one is available.
pub(crate) fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest: Vec<char> = text.chars().collect();

    while rest.len() > max_chars {
        let window = &rest[..max_chars];
        let split = window
            .iter()
            .rposition(|c| *c == ' ')
            .filter(|&pos| window[..pos].iter().any(|c| *c != ' '))
            .unwrap_or(max_chars);
        pieces.push(rest[..split].iter().collect::<String>().trim_end().to_owned());
        let tail: String = rest[split..].iter().collect();
        rest = tail.trim_start().chars().collect();
    }
    pieces.push(rest.into_iter().collect());
    pieces
}
