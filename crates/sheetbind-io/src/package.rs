//! OPC package plumbing: part names, relationships and in-place XML splicing.
//!
//! Parts are edited as text. New elements are inserted right before the end
//! tag of their container so that everything else in the part, including
//! markup this crate does not understand, is kept byte for byte.

use std::borrow::Cow;
use std::ops::Range;

use roxmltree::{Document, Node};

use crate::IoError;

pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_RELS: &str = "_rels/.rels";
pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// Location of the relationships part belonging to `part`.
pub fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file_name)) => format!("{dir}/_rels/{file_name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns the relationship.
///
/// Package-level relationships use an empty source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    if target.is_empty() {
        return normalize(source_part);
    }
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize(&format!("{base_dir}/{target}"))
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Relationship types are compared by their last path segment so that
    /// transitional and strict namespaces both match.
    pub fn has_type(&self, suffix: &str) -> bool {
        self.type_.rsplit('/').next() == Some(suffix)
    }
}

pub fn parse_document<'a>(xml: &'a str, part: &str) -> Result<Document<'a>, IoError> {
    Document::parse(xml).map_err(|e| IoError::xml(part, e))
}

pub fn parse_relationships(xml: &str, part: &str) -> Result<Vec<Relationship>, IoError> {
    let doc = parse_document(xml, part)?;
    let rels = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                type_: n.attribute("Type").unwrap_or_default().to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n
                    .attribute("TargetMode")
                    .is_some_and(|m| m.eq_ignore_ascii_case("External")),
            })
        })
        .collect();
    Ok(rels)
}

/// Next free `rIdN` identifier.
pub fn next_rel_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// First element with the given local name, in document order.
pub fn find_element<'a, 'input>(doc: &'a Document<'input>, local: &str) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

/// Value of a relationship-id attribute (`r:id`), whatever prefix it uses.
pub fn rel_id_attribute<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == "id" && a.namespace().is_some())
        .map(|a| a.value())
}

/// Qualified tag name as written in the source, e.g. `x:sheetData`.
fn raw_qname(xml: &str, range: &Range<usize>) -> String {
    xml[range.start + 1..range.end]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect()
}

/// Element prefix including the colon (`"x:"`), or empty for the default namespace.
pub fn prefix_of(qname: &str) -> String {
    match qname.split_once(':') {
        Some((p, _)) => format!("{p}:"),
        None => String::new(),
    }
}

/// Insertion point right before the end tag of the first `local` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertPoint {
    pub offset: usize,
    /// Prefix children of this element should be written with.
    pub prefix: String,
}

/// Find the insertion point inside the first `local` element, expanding a
/// self-closing `<local/>` into a start/end pair first.
pub fn open_element(xml: &mut String, part: &str, local: &str) -> Result<InsertPoint, IoError> {
    let (range, qname) = {
        let doc = parse_document(xml, part)?;
        let node = find_element(&doc, local)
            .ok_or_else(|| IoError::xml(part, format!("missing <{local}> element")))?;
        let range = node.range();
        let qname = raw_qname(xml, &range);
        (range, qname)
    };
    let prefix = prefix_of(&qname);
    let raw = &xml[range.clone()];
    if raw.ends_with("/>") {
        let at = range.end - 2;
        xml.replace_range(at..range.end, &format!("></{qname}>"));
        return Ok(InsertPoint {
            offset: at + 1,
            prefix,
        });
    }
    let close = raw
        .rfind("</")
        .ok_or_else(|| IoError::xml(part, format!("unterminated <{qname}> element")))?;
    Ok(InsertPoint {
        offset: range.start + close,
        prefix,
    })
}

/// Insert `fragment` before the end tag of the first `local` element.
pub fn insert_into(
    xml: &mut String,
    part: &str,
    local: &str,
    fragment: impl FnOnce(&str) -> String,
) -> Result<(), IoError> {
    let point = open_element(xml, part, local)?;
    let text = fragment(&point.prefix);
    xml.insert_str(point.offset, &text);
    Ok(())
}

/// Prefix bound to the relationships namespace on the first `local` element,
/// if the document declares one.
pub fn rel_prefix(xml: &str, part: &str, local: &str) -> Result<Option<String>, IoError> {
    let doc = parse_document(xml, part)?;
    let node = find_element(&doc, local)
        .ok_or_else(|| IoError::xml(part, format!("missing <{local}> element")))?;
    Ok(node.lookup_prefix(REL_NS).map(|p| p.to_string()))
}

pub fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Characters XML 1.0 cannot carry, even as character references.
fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Code point of the `_xHHHH_` run at the start of `s`.
fn escape_run(s: &str) -> Option<u32> {
    let b = s.as_bytes();
    if b.len() < 7 || b[0] != b'_' || b[1] != b'x' || b[6] != b'_' {
        return None;
    }
    if !b[2..6].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u32::from_str_radix(&s[2..6], 16).ok()
}

/// Escape cell text for element content.
///
/// Forbidden characters are written as `_xHHHH_`, the spreadsheetml string
/// escape, and the underscore of a literal `_xHHHH_` run becomes `_x005F_`.
/// Carriage returns are written as character references so that line-end
/// normalisation keeps them.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    let plain = !text.contains("_x") && !text.chars().any(|c| c == '\r' || is_forbidden(c));
    if plain {
        return escape(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for (i, c) in text.char_indices() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            '_' if escape_run(&text[i..]).is_some() => out.push_str("_x005F_"),
            c if is_forbidden(c) => out.push_str(&format!("_x{:04X}_", c as u32)),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode `_xHHHH_` runs in text read from a string item or value.
pub fn unescape_text(text: &str) -> Cow<'_, str> {
    if !text.contains("_x") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match escape_run(rest).and_then(char::from_u32) {
            Some(c) => {
                out.push(c);
                rest = &rest[7..];
            }
            None => {
                out.push('_');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_use_string_escapes() {
        assert_eq!(escape_text("bell\u{7}x"), "bell_x0007_x");
        assert_eq!(escape_text("a\r\nb"), "a&#xD;\nb");
        assert_eq!(escape_text("_x0041_ & _xyz"), "_x005F_x0041_ &amp; _xyz");
        assert_eq!(escape_text("tab\there"), "tab\there");
    }

    #[test]
    fn string_escapes_decode() {
        assert_eq!(unescape_text("bell_x0007_x"), "bell\u{7}x");
        assert_eq!(unescape_text("_x005F_x0041_"), "_x0041_");
        assert_eq!(unescape_text("_xD800_ and _x12"), "_xD800_ and _x12");
        for text in ["x\u{1}\u{1F}y", "_x0000_", "\u{FFFE}", "plain"] {
            assert_eq!(unescape_text(&escape_text(text)), text);
        }
    }

    #[test]
    fn rels_location() {
        assert_eq!(rels_for_part("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_for_part("workbook.xml"), "_rels/workbook.xml.rels");
    }

    #[test]
    fn targets_resolve_against_source_dir() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/../xl/styles.xml"),
            "xl/styles.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../sharedStrings.xml"),
            "xl/sharedStrings.xml"
        );
    }

    #[test]
    fn next_id_skips_foreign_ids() {
        let rels = vec![
            Relationship {
                id: "rId3".into(),
                type_: WORKSHEET_REL_TYPE.into(),
                target: "a".into(),
                external: false,
            },
            Relationship {
                id: "custom".into(),
                type_: WORKSHEET_REL_TYPE.into(),
                target: "b".into(),
                external: false,
            },
        ];
        assert_eq!(next_rel_id(&rels), "rId4");
        assert_eq!(next_rel_id(&[]), "rId1");
        assert!(rels[0].has_type("worksheet"));
        assert!(!rels[0].has_type("styles"));
    }

    #[test]
    fn insert_before_end_tag() {
        let mut xml = String::from("<a><b><c/></b></a>");
        insert_into(&mut xml, "t.xml", "b", |p| format!("<{p}d/>")).unwrap();
        assert_eq!(xml, "<a><b><c/><d/></b></a>");
    }

    #[test]
    fn self_closing_is_expanded() {
        let mut xml = String::from(r#"<x:ws xmlns:x="urn:x"><x:sheetData/></x:ws>"#);
        insert_into(&mut xml, "t.xml", "sheetData", |p| format!("<{p}row/>")).unwrap();
        assert_eq!(
            xml,
            r#"<x:ws xmlns:x="urn:x"><x:sheetData><x:row/></x:sheetData></x:ws>"#
        );
    }

    #[test]
    fn missing_element_is_an_error() {
        let mut xml = String::from("<a/>");
        let err = insert_into(&mut xml, "t.xml", "b", |_| String::new()).unwrap_err();
        assert!(matches!(err, IoError::Xml { .. }));
    }

    #[test]
    fn finds_relationship_prefix() {
        let xml = format!(r#"<workbook xmlns:rel="{REL_NS}"><sheets/></workbook>"#);
        assert_eq!(
            rel_prefix(&xml, "wb.xml", "sheets").unwrap().as_deref(),
            Some("rel")
        );
        assert_eq!(rel_prefix("<workbook><sheets/></workbook>", "wb.xml", "sheets").unwrap(), None);
    }
}
