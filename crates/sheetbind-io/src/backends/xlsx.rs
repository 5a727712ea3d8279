use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use roxmltree::Node;
use rustc_hash::FxHashMap;
use sheetbind_common::{CellType, column_label, column_to_letters, letters_to_column};
use zip::write::FileOptions;

use crate::IoError;
use crate::package::{
    CONTENT_TYPES, InsertPoint, PACKAGE_RELS, REL_NS, Relationship, WORKSHEET_CONTENT_TYPE,
    WORKSHEET_REL_TYPE, escape, escape_text, find_element, insert_into, next_rel_id, open_element,
    parse_document, parse_relationships, rel_id_attribute, rel_prefix, rels_for_part,
    resolve_target, unescape_text,
};
use crate::traits::{
    CellLookup, CellWrite, DocumentStore, RawCell, RowData, SaveDestination, SheetEntry,
    SheetHandle,
};

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets/></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const EMPTY_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

const WORKSHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData/></worksheet>"#;

struct Worksheet {
    name: String,
    sheet_id: u32,
    part: String,
    xml: String,
    last_row: u32,
    /// Cached end of `sheetData`, advanced as rows are appended.
    insert_at: Option<InsertPoint>,
}

/// A SpreadsheetML package held in memory.
///
/// Every part is kept as read. Worksheets, the workbook, its relationships
/// and the content types are edited by splicing new elements into the
/// existing XML, so content this adapter does not model survives a save.
pub struct XlsxAdapter {
    parts: BTreeMap<String, Vec<u8>>,
    /// Part names in archive order.
    order: Vec<String>,
    workbook_part: String,
    sheets: Vec<Worksheet>,
    shared_strings: Option<Vec<String>>,
    cell_formats: Option<Vec<u32>>,
    original_path: Option<PathBuf>,
}

impl Default for XlsxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxAdapter {
    /// An empty workbook with no sheets.
    pub fn new() -> Self {
        let mut adapter = Self {
            parts: BTreeMap::new(),
            order: Vec::new(),
            workbook_part: "xl/workbook.xml".to_string(),
            sheets: Vec::new(),
            shared_strings: None,
            cell_formats: Some(vec![0]),
            original_path: None,
        };
        adapter.put_part(CONTENT_TYPES, CONTENT_TYPES_XML);
        adapter.put_part(PACKAGE_RELS, PACKAGE_RELS_XML);
        adapter.put_part("xl/workbook.xml", WORKBOOK_XML);
        adapter.put_part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML);
        adapter.put_part("xl/styles.xml", STYLES_XML);
        adapter
    }

    /// Bind the document to a file that `save()` writes to.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.original_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("xlsx_open", path = %path.as_ref().display()).entered();
        let data = std::fs::read(path.as_ref())?;
        let mut adapter = Self::open_bytes(data)?;
        adapter.original_path = Some(path.as_ref().to_path_buf());
        Ok(adapter)
    }

    pub fn open_bytes(data: Vec<u8>) -> Result<Self, IoError> {
        Self::open_reader(Cursor::new(data))
    }

    pub fn open_reader<R: Read + Seek>(reader: R) -> Result<Self, IoError> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut parts = BTreeMap::new();
        let mut order = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            order.push(name.clone());
            parts.insert(name, data);
        }
        Self::from_parts(parts, order)
    }

    fn from_parts(parts: BTreeMap<String, Vec<u8>>, order: Vec<String>) -> Result<Self, IoError> {
        let package_rels = parse_relationships(text_of(&parts, PACKAGE_RELS)?, PACKAGE_RELS)?;
        let workbook_part = package_rels
            .iter()
            .find(|r| r.has_type("officeDocument") && !r.external)
            .map(|r| resolve_target("", &r.target))
            .ok_or_else(|| IoError::MissingRelationship {
                part: PACKAGE_RELS.to_string(),
                target: "officeDocument".to_string(),
            })?;

        let rels_part = rels_for_part(&workbook_part);
        let workbook_rels = if parts.contains_key(&rels_part) {
            parse_relationships(text_of(&parts, &rels_part)?, &rels_part)?
        } else {
            Vec::new()
        };
        let by_id: FxHashMap<&str, &Relationship> =
            workbook_rels.iter().map(|r| (r.id.as_str(), r)).collect();

        let related = |kind: &str| {
            workbook_rels
                .iter()
                .find(|r| r.has_type(kind) && !r.external)
                .map(|r| resolve_target(&workbook_part, &r.target))
        };
        let shared_strings = match related("sharedStrings") {
            Some(part) => Some(parse_shared_strings(text_of(&parts, &part)?, &part)?),
            None => None,
        };
        let cell_formats = match related("styles") {
            Some(part) => Some(parse_cell_formats(text_of(&parts, &part)?, &part)?),
            None => None,
        };

        let workbook_xml = text_of(&parts, &workbook_part)?;
        let doc = parse_document(workbook_xml, &workbook_part)?;
        let mut sheets = Vec::new();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
        {
            let name = node
                .attribute("name")
                .ok_or_else(|| IoError::xml(&workbook_part, "sheet without a name"))?;
            let rel_id = rel_id_attribute(&node)
                .ok_or_else(|| IoError::xml(&workbook_part, format!("sheet '{name}' has no r:id")))?;
            let rel = by_id
                .get(rel_id)
                .ok_or_else(|| IoError::MissingRelationship {
                    part: rels_part.clone(),
                    target: rel_id.to_string(),
                })?;
            if !rel.has_type("worksheet") {
                // chartsheets and dialogsheets hold no rows
                continue;
            }
            let part = resolve_target(&workbook_part, &rel.target);
            let xml = text_of(&parts, &part)?.to_string();
            let last_row = scan_last_row(&xml, &part)?;
            sheets.push(Worksheet {
                name: name.to_string(),
                sheet_id: node
                    .attribute("sheetId")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0),
                part,
                xml,
                last_row,
                insert_at: None,
            });
        }
        drop(doc);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            workbook = %workbook_part,
            sheets = sheets.len(),
            shared_strings = shared_strings.as_ref().map_or(0, |s: &Vec<String>| s.len()),
            "opened package"
        );

        Ok(Self {
            parts,
            order,
            workbook_part,
            sheets,
            shared_strings,
            cell_formats,
            original_path: None,
        })
    }

    pub fn save(&mut self) -> Result<(), IoError> {
        self.save_to(SaveDestination::InPlace).map(|_| ())
    }

    pub fn save_to(&mut self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>, IoError> {
        match dest {
            SaveDestination::InPlace => {
                let path = self.original_path.clone().ok_or_else(|| {
                    IoError::Unsupported("in-place save without an original path".to_string())
                })?;
                std::fs::write(&path, self.to_bytes()?)?;
                Ok(None)
            }
            SaveDestination::Path(path) => {
                std::fs::write(path, self.to_bytes()?)?;
                Ok(None)
            }
            SaveDestination::Writer(writer) => {
                writer.write_all(&self.to_bytes()?)?;
                Ok(None)
            }
            SaveDestination::Bytes => Ok(Some(self.to_bytes()?)),
        }
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, IoError> {
        if self.sheets.is_empty() {
            return Err(IoError::NoSheets);
        }
        for ws in &self.sheets {
            self.parts.insert(ws.part.clone(), ws.xml.clone().into_bytes());
        }
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for name in &self.order {
                if let Some(data) = self.parts.get(name) {
                    zip.start_file(name.as_str(), options)?;
                    zip.write_all(data)?;
                }
            }
            zip.finish()?;
        }
        Ok(buffer.into_inner())
    }

    /// Raw bytes of a package part, e.g. `xl/workbook.xml`.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        if let Some(ws) = self.sheets.iter().find(|ws| ws.part == name) {
            return Some(ws.xml.as_bytes());
        }
        self.parts.get(name).map(Vec::as_slice)
    }

    fn put_part(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        if !self.parts.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.parts.insert(name.to_string(), data.into());
    }

    fn text(&self, name: &str) -> Result<&str, IoError> {
        text_of(&self.parts, name)
    }

    fn sheet(&self, handle: SheetHandle) -> Result<&Worksheet, IoError> {
        self.sheets.get(handle).ok_or(IoError::UnknownSheet(handle))
    }

    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle, IoError> {
        validate_sheet_name(name)?;
        let workbook_part = self.workbook_part.clone();
        let rels_part = rels_for_part(&workbook_part);

        let mut rels_xml = if self.parts.contains_key(&rels_part) {
            self.text(&rels_part)?.to_string()
        } else {
            EMPTY_RELS_XML.to_string()
        };
        let rel_id = next_rel_id(&parse_relationships(&rels_xml, &rels_part)?);

        let (part, target) = (1u32..)
            .map(|n| {
                let target = format!("worksheets/sheet{n}.xml");
                (resolve_target(&workbook_part, &target), target)
            })
            .find(|(part, _)| {
                !self.parts.contains_key(part) && !self.sheets.iter().any(|s| &s.part == part)
            })
            .ok_or_else(|| IoError::Unsupported("no free worksheet part name".to_string()))?;

        let mut workbook_xml = self.text(&workbook_part)?.to_string();
        let sheet_id = {
            let doc = parse_document(&workbook_xml, &workbook_part)?;
            doc.descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
                .filter_map(|n| n.attribute("sheetId")?.trim().parse::<u32>().ok())
                .max()
                .unwrap_or(0)
                + 1
        };
        let (id_attr, ns_decl) = match rel_prefix(&workbook_xml, &workbook_part, "sheets")? {
            Some(p) if !p.is_empty() => (format!("{p}:id"), String::new()),
            _ => ("r:id".to_string(), format!(r#" xmlns:r="{REL_NS}""#)),
        };
        let escaped = escape(name);
        insert_into(&mut workbook_xml, &workbook_part, "sheets", |p| {
            format!(
                r#"<{p}sheet name="{escaped}" sheetId="{sheet_id}" {id_attr}="{rel_id}"{ns_decl}/>"#
            )
        })?;
        insert_into(&mut rels_xml, &rels_part, "Relationships", |p| {
            format!(r#"<{p}Relationship Id="{rel_id}" Type="{WORKSHEET_REL_TYPE}" Target="{target}"/>"#)
        })?;
        let mut types_xml = self.text(CONTENT_TYPES)?.to_string();
        insert_into(&mut types_xml, CONTENT_TYPES, "Types", |p| {
            format!(r#"<{p}Override PartName="/{part}" ContentType="{WORKSHEET_CONTENT_TYPE}"/>"#)
        })?;

        self.put_part(&workbook_part, workbook_xml);
        self.put_part(&rels_part, rels_xml);
        self.put_part(CONTENT_TYPES, types_xml);
        self.put_part(&part, WORKSHEET_XML);

        #[cfg(feature = "tracing")]
        tracing::debug!(sheet = name, part = %part, rel_id = %rel_id, sheet_id, "created worksheet");

        self.sheets.push(Worksheet {
            name: name.to_string(),
            sheet_id,
            part,
            xml: WORKSHEET_XML.to_string(),
            last_row: 0,
            insert_at: None,
        });
        Ok(self.sheets.len() - 1)
    }
}

impl CellLookup for XlsxAdapter {
    fn shared_string(&self, index: usize) -> Result<String, IoError> {
        let table = self
            .shared_strings
            .as_ref()
            .ok_or(IoError::MissingSharedStringTable)?;
        table.get(index).cloned().ok_or(IoError::SharedStringIndex {
            index,
            len: table.len(),
        })
    }

    fn number_format(&self, style: u32) -> Result<u32, IoError> {
        match &self.cell_formats {
            Some(formats) => formats
                .get(style as usize)
                .copied()
                .ok_or(IoError::StyleIndex {
                    index: style,
                    len: formats.len(),
                }),
            None if style == 0 => Ok(0),
            None => Err(IoError::StyleIndex {
                index: style,
                len: 0,
            }),
        }
    }
}

impl DocumentStore for XlsxAdapter {
    fn sheets(&self) -> Vec<SheetEntry> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(handle, ws)| SheetEntry {
                name: ws.name.clone(),
                sheet_id: ws.sheet_id,
                handle,
            })
            .collect()
    }

    fn find_sheet(&self, name: &str) -> Option<SheetHandle> {
        self.sheets.iter().position(|ws| ws.name == name)
    }

    fn get_or_create_sheet(&mut self, name: &str) -> Result<(SheetHandle, bool), IoError> {
        match self.find_sheet(name) {
            Some(handle) => Ok((handle, false)),
            None => self.create_sheet(name).map(|handle| (handle, true)),
        }
    }

    fn last_row_index(&self, sheet: SheetHandle) -> Result<u32, IoError> {
        self.sheet(sheet).map(|ws| ws.last_row)
    }

    fn append_row(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        cells: &[CellWrite],
    ) -> Result<(), IoError> {
        let ws = self
            .sheets
            .get_mut(sheet)
            .ok_or(IoError::UnknownSheet(sheet))?;
        if row == 0 || row <= ws.last_row {
            return Err(IoError::RowOutOfOrder {
                sheet: ws.name.clone(),
                row,
                last: ws.last_row,
            });
        }
        let point = match ws.insert_at.take() {
            Some(point) => point,
            None => open_element(&mut ws.xml, &ws.part, "sheetData")?,
        };
        let fragment = row_xml(&point.prefix, row, cells)?;
        ws.xml.insert_str(point.offset, &fragment);
        ws.insert_at = Some(InsertPoint {
            offset: point.offset + fragment.len(),
            prefix: point.prefix,
        });
        ws.last_row = row;
        Ok(())
    }

    fn rows(&self, sheet: SheetHandle) -> Result<Vec<RowData>, IoError> {
        let ws = self.sheet(sheet)?;
        let doc = parse_document(&ws.xml, &ws.part)?;
        let Some(data) = find_element(&doc, "sheetData") else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::new();
        let mut prev = 0u32;
        for row in element_children(data, "row") {
            let index = row
                .attribute("r")
                .and_then(|r| r.trim().parse().ok())
                .unwrap_or(prev + 1);
            prev = index;
            let mut next_col = 1u32;
            let mut cells = Vec::new();
            for cell in element_children(row, "c") {
                let reference = cell.attribute("r").map(str::to_string);
                let col = reference
                    .as_deref()
                    .and_then(|r| letters_to_column(column_label(r)))
                    .unwrap_or(next_col);
                next_col = col.saturating_add(1);
                let data_type = cell.attribute("t").map(str::to_string);
                let text = cell_text(cell, data_type.as_deref());
                cells.push(RawCell {
                    reference,
                    column: column_to_letters(col),
                    style: cell.attribute("s").and_then(|s| s.trim().parse().ok()),
                    formula: element_children(cell, "f")
                        .next()
                        .and_then(|f| f.text())
                        .map(str::to_string),
                    data_type,
                    text,
                });
            }
            rows.push(RowData { index, cells });
        }
        Ok(rows)
    }
}

fn text_of<'a>(parts: &'a BTreeMap<String, Vec<u8>>, name: &str) -> Result<&'a str, IoError> {
    let bytes = parts
        .get(name)
        .ok_or_else(|| IoError::MissingPart(name.to_string()))?;
    let text = std::str::from_utf8(bytes).map_err(|_| IoError::InvalidUtf8(name.to_string()))?;
    Ok(text.trim_start_matches('\u{feff}'))
}

fn validate_sheet_name(name: &str) -> Result<(), IoError> {
    let invalid = name.is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LEN
        || name.contains(FORBIDDEN_SHEET_CHARS)
        || name.chars().any(char::is_control)
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(IoError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == local)
}

/// Text of a string item or inline string: all runs concatenated, phonetic
/// runs left out.
fn rich_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "t")
        .filter(|n| !n.ancestors().any(|a| a.tag_name().name() == "rPh"))
        .filter_map(|n| n.text())
        .map(unescape_text)
        .collect()
}

fn cell_text(cell: Node<'_, '_>, data_type: Option<&str>) -> Option<String> {
    if data_type == Some("inlineStr") {
        return element_children(cell, "is").next().map(rich_text);
    }
    element_children(cell, "v")
        .next()
        .map(|v| unescape_text(v.text().unwrap_or_default()).into_owned())
}

fn scan_last_row(xml: &str, part: &str) -> Result<u32, IoError> {
    let doc = parse_document(xml, part)?;
    let mut last = 0u32;
    if let Some(data) = find_element(&doc, "sheetData") {
        let mut prev = 0u32;
        for row in element_children(data, "row") {
            prev = row
                .attribute("r")
                .and_then(|r| r.trim().parse().ok())
                .unwrap_or(prev + 1);
            last = last.max(prev);
        }
    }
    Ok(last)
}

fn parse_shared_strings(xml: &str, part: &str) -> Result<Vec<String>, IoError> {
    let doc = parse_document(xml, part)?;
    Ok(element_children(doc.root_element(), "si")
        .map(rich_text)
        .collect())
}

fn parse_cell_formats(xml: &str, part: &str) -> Result<Vec<u32>, IoError> {
    let doc = parse_document(xml, part)?;
    let Some(xfs) = find_element(&doc, "cellXfs") else {
        return Ok(Vec::new());
    };
    Ok(element_children(xfs, "xf")
        .map(|xf| {
            xf.attribute("numFmtId")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        })
        .collect())
}

fn row_xml(p: &str, row: u32, cells: &[CellWrite]) -> Result<String, IoError> {
    let mut out = format!(r#"<{p}row r="{row}">"#);
    for cell in cells {
        let r = escape(&cell.reference);
        if cell.value.is_empty() {
            out.push_str(&format!(r#"<{p}c r="{r}"/>"#));
            continue;
        }
        let v = escape_text(&cell.value);
        match cell.cell_type {
            CellType::InlineString => out.push_str(&format!(
                r#"<{p}c r="{r}" t="inlineStr"><{p}is><{p}t xml:space="preserve">{v}</{p}t></{p}is></{p}c>"#
            )),
            CellType::SharedString => {
                return Err(IoError::Unsupported(
                    "writing shared-string cells".to_string(),
                ));
            }
            other => {
                let t = other.tag();
                out.push_str(&format!(r#"<{p}c r="{r}" t="{t}"><{p}v>{v}</{p}v></{p}c>"#));
            }
        }
    }
    out.push_str(&format!("</{p}row>"));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(reference: &str, value: &str, cell_type: CellType) -> CellWrite {
        CellWrite::new(reference, value, cell_type)
    }

    #[test]
    fn new_document_has_no_sheets() {
        let doc = XlsxAdapter::new();
        assert!(doc.sheets().is_empty());
        assert_eq!(doc.find_sheet("Sheet1"), None);
        assert_eq!(doc.number_format(0).unwrap(), 0);
        assert!(matches!(
            doc.shared_string(0),
            Err(IoError::MissingSharedStringTable)
        ));
    }

    #[test]
    fn create_then_reuse_sheet() {
        let mut doc = XlsxAdapter::new();
        let (a, created) = doc.get_or_create_sheet("People").unwrap();
        assert!(created);
        let (b, created) = doc.get_or_create_sheet("People").unwrap();
        assert!(!created);
        assert_eq!(a, b);
        let (c, _) = doc.get_or_create_sheet("people").unwrap();
        assert_ne!(a, c, "sheet lookup is case-sensitive");
        let ids: Vec<u32> = doc.sheets().iter().map(|s| s.sheet_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn appended_rows_read_back() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("Data").unwrap();
        doc.append_row(
            sheet,
            1,
            &[
                cell("A1", "Name", CellType::String),
                cell("B1", "Age", CellType::String),
            ],
        )
        .unwrap();
        doc.append_row(
            sheet,
            2,
            &[
                cell("A2", "Ann & Bo <x>", CellType::String),
                cell("B2", "42", CellType::Number),
            ],
        )
        .unwrap();
        assert_eq!(doc.last_row_index(sheet).unwrap(), 2);

        let rows = doc.rows(sheet).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].cells[0].column, "A");
        assert_eq!(rows[1].cells[0].text.as_deref(), Some("Ann & Bo <x>"));
        assert_eq!(rows[1].cells[0].data_type.as_deref(), Some("str"));
        assert_eq!(rows[1].cells[1].column, "B");
        assert_eq!(rows[1].cells[1].data_type.as_deref(), Some("n"));
    }

    #[test]
    fn rows_must_move_forward() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("S").unwrap();
        doc.append_row(sheet, 3, &[]).unwrap();
        let err = doc.append_row(sheet, 3, &[]).unwrap_err();
        assert!(matches!(err, IoError::RowOutOfOrder { row: 3, last: 3, .. }));
        assert!(matches!(
            doc.append_row(9, 4, &[]),
            Err(IoError::UnknownSheet(9))
        ));
    }

    #[test]
    fn empty_values_are_written_without_content() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("S").unwrap();
        doc.append_row(sheet, 1, &[cell("A1", "", CellType::Number)])
            .unwrap();
        let rows = doc.rows(sheet).unwrap();
        assert_eq!(rows[0].cells[0].text, None);
        assert_eq!(rows[0].cells[0].data_type, None);
    }

    #[test]
    fn inline_strings_round_trip() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("S").unwrap();
        doc.append_row(sheet, 1, &[cell("C1", " padded ", CellType::InlineString)])
            .unwrap();
        let rows = doc.rows(sheet).unwrap();
        assert_eq!(rows[0].cells[0].column, "C");
        assert_eq!(rows[0].cells[0].text.as_deref(), Some(" padded "));
    }

    #[test]
    fn rejects_invalid_sheet_names() {
        let mut doc = XlsxAdapter::new();
        for bad in ["", "a/b", "x[1]", "'quoted'", "tab\there", "this sheet name is far too long!!"] {
            assert!(
                matches!(doc.get_or_create_sheet(bad), Err(IoError::InvalidSheetName(_))),
                "{bad:?}"
            );
        }
        assert!(doc.sheets().is_empty());
    }

    #[test]
    fn save_and_reopen() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("Movies").unwrap();
        doc.append_row(sheet, 1, &[cell("A1", "Title", CellType::String)])
            .unwrap();
        let bytes = doc.save_to(SaveDestination::Bytes).unwrap().unwrap();

        let mut reopened = XlsxAdapter::open_bytes(bytes).unwrap();
        let handle = reopened.find_sheet("Movies").unwrap();
        assert_eq!(reopened.last_row_index(handle).unwrap(), 1);
        reopened
            .append_row(handle, 2, &[cell("A2", "Alien", CellType::String)])
            .unwrap();
        let rows = reopened.rows(handle).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells[0].text.as_deref(), Some("Alien"));
    }

    #[test]
    fn package_without_sheets_is_not_saved() {
        let mut doc = XlsxAdapter::new();
        assert!(matches!(doc.to_bytes(), Err(IoError::NoSheets)));
        assert!(matches!(
            doc.save_to(SaveDestination::Bytes),
            Err(IoError::NoSheets)
        ));
    }

    #[test]
    fn control_characters_survive_save() {
        let mut doc = XlsxAdapter::new();
        let (sheet, _) = doc.get_or_create_sheet("Log").unwrap();
        doc.append_row(
            sheet,
            1,
            &[
                cell("A1", "bell\u{7}x", CellType::String),
                cell("B1", "a\r\nb", CellType::InlineString),
                cell("C1", "_x0041_", CellType::String),
            ],
        )
        .unwrap();
        let reopened = XlsxAdapter::open_bytes(doc.to_bytes().unwrap()).unwrap();
        let rows = reopened.rows(reopened.find_sheet("Log").unwrap()).unwrap();
        let texts: Vec<&str> = rows[0]
            .cells
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect();
        assert_eq!(texts, ["bell\u{7}x", "a\r\nb", "_x0041_"]);
    }

    #[test]
    fn in_place_save_needs_a_path() {
        let mut doc = XlsxAdapter::new();
        assert!(matches!(doc.save(), Err(IoError::Unsupported(_))));
    }
}
