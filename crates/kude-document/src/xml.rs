//! Minimal XML element tree used for field lookup.
//!
//! Elements are keyed by local name (namespace prefixes dropped) and keep
//! their children in document order. Attributes are not retained; the
//! invoice schema carries every value we read as element text.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::DocumentError;

/// Name of the synthetic node wrapping the document's root element.
const DOCUMENT_NODE: &str = "#document";

/// Deepest element nesting accepted. Lookups recurse over the tree, so this
/// bounds their stack use.
const MAX_DEPTH: usize = 256;

/// A parsed XML element.
#[derive(Debug, Default)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) text: String,
    pub(crate) children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// First descendant (pre-order, document order) with the given local name.
    pub(crate) fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find(name)
            }
        })
    }

    /// All descendants with the given local name, in document order.
    pub(crate) fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect(name, found);
        }
    }

    /// Concatenated text of this element and its descendants.
    pub(crate) fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }
}

/// Parse an XML string into a tree rooted at a synthetic document node.
pub(crate) fn parse(xml: &str) -> Result<Element, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack = vec![Element::named(DOCUMENT_NODE.to_owned())];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                check_depth(&stack)?;
                let name = decode_name(&reader, e.local_name().as_ref())?;
                stack.push(Element::named(name));
            }
            Event::Empty(e) => {
                check_depth(&stack)?;
                let name = decode_name(&reader, e.local_name().as_ref())?;
                push_child(&mut stack, Element::named(name));
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(DocumentError::Malformed("unbalanced end tag".to_owned()));
                }
                if let Some(done) = stack.pop() {
                    push_child(&mut stack, done);
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                append_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                append_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(DocumentError::Malformed(
            "unexpected end of document".to_owned(),
        ));
    }
    let document = stack.pop().unwrap_or_default();
    if document.children.is_empty() {
        return Err(DocumentError::Malformed("document has no root element".to_owned()));
    }
    Ok(document)
}

/// `stack` holds the document node plus every open element.
fn check_depth(stack: &[Element]) -> Result<(), DocumentError> {
    if stack.len() > MAX_DEPTH {
        return Err(DocumentError::Malformed(format!(
            "element nesting deeper than {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> Result<String, DocumentError> {
    Ok(reader.decoder().decode(name)?.into_owned())
}

fn push_child(stack: &mut [Element], child: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(child);
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_nested_elements() {
        let tree = parse("<a><b>one</b><c><b>two</b></c></a>").unwrap();
        let a = &tree.children[0];
        assert_eq!(a.name, "a");
        assert_eq!(a.find("b").unwrap().text, "one");
        let all: Vec<_> = a.find_all("b").iter().map(|e| e.text.clone()).collect();
        assert_eq!(all, vec!["one", "two"]);
    }

    #[test]
    fn test_parse_strips_namespace_prefix() {
        let tree = parse(r#"<ns:rDE xmlns:ns="urn:x"><ns:DE>x</ns:DE></ns:rDE>"#).unwrap();
        assert_eq!(tree.find("DE").unwrap().text, "x");
    }

    #[test]
    fn test_parse_entities_and_cdata() {
        let tree = parse("<a>x &amp; y &#65;<![CDATA[<z>]]></a>").unwrap();
        assert_eq!(tree.find("a").unwrap().text, "x & y A<z>");
    }

    #[test]
    fn test_parse_empty_element() {
        let tree = parse("<a><b/></a>").unwrap();
        assert_eq!(tree.find("b").unwrap().text, "");
    }

    #[test]
    fn test_parse_unclosed_document_fails() {
        assert!(parse("<a><b>").is_err());
    }

    #[test]
    fn test_parse_mismatched_tags_fail() {
        assert!(parse("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_parse_no_root_fails() {
        let err = parse("   ").unwrap_err();
        assert!(err.is_malformed());
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "<x>".repeat(depth), "</x>".repeat(depth))
    }

    #[test]
    fn test_parse_accepts_max_depth() {
        let tree = parse(&nested(MAX_DEPTH)).unwrap();
        assert_eq!(tree.find_all("x").len(), MAX_DEPTH);
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let err = parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_parse_rejects_hostile_nesting_without_overflow() {
        let err = parse(&nested(200_000)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_text_content_includes_descendants() {
        let tree = parse("<a>x<b>y</b></a>").unwrap();
        assert_eq!(tree.find("a").unwrap().text_content(), "xy");
    }
}
