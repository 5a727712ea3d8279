use sheetbind_io::{
    CellLookup, CellType, CellWrite, DocumentStore, IoError, SaveDestination, XlsxAdapter,
};
use std::io::{Cursor, Write};
use zip::write::FileOptions;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

fn package(parts: &[(&str, String)]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = FileOptions::default();
        for (name, body) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

fn content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string()
}

fn package_rels(workbook: &str) -> String {
    format!(
        r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="{workbook}"/></Relationships>"#
    )
}

/// A workbook written with an `x:` prefix on every SpreadsheetML element,
/// a shared string table with rich and phonetic runs, and custom styles.
fn prefixed_workbook() -> Vec<u8> {
    let workbook = format!(
        r#"<x:workbook xmlns:x="{MAIN_NS}" xmlns:rel="{REL_NS}"><x:sheets><x:sheet name="Data" sheetId="7" rel:id="rId5"/><x:sheet name="Chart" sheetId="9" rel:id="rId6"/></x:sheets></x:workbook>"#
    );
    let rels = format!(
        r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId5" Type="{REL_NS}/worksheet" Target="/book/sheets/data.xml"/><Relationship Id="rId6" Type="{REL_NS}/chartsheet" Target="charts/c1.xml"/><Relationship Id="rId7" Type="{REL_NS}/sharedStrings" Target="strings.xml"/><Relationship Id="rId8" Type="{REL_NS}/styles" Target="styles.xml"/></Relationships>"#
    );
    let sheet = format!(
        r#"<x:worksheet xmlns:x="{MAIN_NS}"><x:sheetData><x:row r="1"><x:c r="A1" t="s"><x:v>0</x:v></x:c><x:c r="B1" t="s"><x:v>1</x:v></x:c></x:row><x:row r="2"><x:c t="s"><x:v>2</x:v></x:c><x:c s="1"><x:v>45292</x:v></x:c><x:c r="D2"><x:f>1+1</x:f><x:v>2</x:v></x:c></x:row></x:sheetData><x:extLst/></x:worksheet>"#
    );
    let strings = format!(
        r#"<sst xmlns="{MAIN_NS}" count="3" uniqueCount="3"><si><t>Name</t></si><si><r><t>Da</t></r><r><t xml:space="preserve">te </t></r><rPh sb="0" eb="1"><t>ignored</t></rPh></si><si><t>Ann</t></si></sst>"#
    );
    let styles = format!(
        r#"<styleSheet xmlns="{MAIN_NS}"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/></cellXfs></styleSheet>"#
    );
    package(&[
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels("book/main.xml")),
        ("book/main.xml", workbook),
        ("book/_rels/main.xml.rels", rels),
        ("book/sheets/data.xml", sheet),
        ("book/charts/c1.xml", "<chartsheet/>".to_string()),
        ("book/strings.xml", strings),
        ("book/styles.xml", styles),
        ("custom/keep.bin", "opaque".to_string()),
    ])
}

#[test]
fn reads_sheets_through_relationships() {
    let doc = XlsxAdapter::open_bytes(prefixed_workbook()).unwrap();
    let sheets = doc.sheets();
    assert_eq!(sheets.len(), 1, "chartsheets hold no rows");
    assert_eq!(sheets[0].name, "Data");
    assert_eq!(sheets[0].sheet_id, 7);
    assert_eq!(doc.last_row_index(sheets[0].handle).unwrap(), 2);
}

#[test]
fn shared_strings_concatenate_runs_without_phonetics() {
    let doc = XlsxAdapter::open_bytes(prefixed_workbook()).unwrap();
    assert_eq!(doc.shared_string(0).unwrap(), "Name");
    assert_eq!(doc.shared_string(1).unwrap(), "Date ");
    assert!(matches!(
        doc.shared_string(3),
        Err(IoError::SharedStringIndex { index: 3, len: 3 })
    ));
}

#[test]
fn styles_expose_number_formats() {
    let doc = XlsxAdapter::open_bytes(prefixed_workbook()).unwrap();
    assert_eq!(doc.number_format(0).unwrap(), 0);
    assert_eq!(doc.number_format(1).unwrap(), 14);
    assert!(matches!(
        doc.number_format(2),
        Err(IoError::StyleIndex { index: 2, len: 2 })
    ));
}

#[test]
fn raw_cells_carry_tags_styles_and_positions() {
    let doc = XlsxAdapter::open_bytes(prefixed_workbook()).unwrap();
    let handle = doc.find_sheet("Data").unwrap();
    let rows = doc.rows(handle).unwrap();
    assert_eq!(rows.len(), 2);

    let second = &rows[1];
    assert_eq!(second.index, 2);
    let columns: Vec<&str> = second.cells.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(columns, ["A", "B", "D"]);
    assert_eq!(second.cells[0].reference, None);
    assert_eq!(second.cells[0].data_type.as_deref(), Some("s"));
    assert_eq!(second.cells[1].style, Some(1));
    assert_eq!(second.cells[1].text.as_deref(), Some("45292"));
    assert_eq!(second.cells[2].formula.as_deref(), Some("1+1"));
    assert_eq!(second.cells[2].text.as_deref(), Some("2"));
}

#[test]
fn append_keeps_prefixes_and_foreign_parts() {
    let mut doc = XlsxAdapter::open_bytes(prefixed_workbook()).unwrap();
    let handle = doc.find_sheet("Data").unwrap();
    doc.append_row(
        handle,
        3,
        &[CellWrite::new("A3", "Bob", CellType::String)],
    )
    .unwrap();
    let (added, created) = doc.get_or_create_sheet("Extra").unwrap();
    assert!(created);
    doc.append_row(added, 1, &[CellWrite::new("A1", "1.5", CellType::Number)])
        .unwrap();

    let bytes = doc.save_to(SaveDestination::Bytes).unwrap().unwrap();
    let reopened = XlsxAdapter::open_bytes(bytes).unwrap();

    let names: Vec<String> = reopened.sheets().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["Data", "Extra"]);
    let extra = reopened.sheets()[1].clone();
    assert_eq!(extra.sheet_id, 10, "fresh id beyond every existing sheet, chartsheets included");

    let data_xml = std::str::from_utf8(reopened.part("book/sheets/data.xml").unwrap()).unwrap();
    assert!(data_xml.contains(r#"<x:row r="3"><x:c r="A3" t="str"><x:v>Bob</x:v></x:c></x:row></x:sheetData><x:extLst/>"#));

    let workbook = std::str::from_utf8(reopened.part("book/main.xml").unwrap()).unwrap();
    assert!(workbook.contains(r#"<x:sheet name="Extra" sheetId="10" rel:id="rId9"/>"#));
    assert_eq!(reopened.part("custom/keep.bin"), Some(&b"opaque"[..]));
    assert!(reopened.part("book/worksheets/sheet1.xml").is_some());

    let rows = reopened.rows(extra.handle).unwrap();
    assert_eq!(rows[0].cells[0].text.as_deref(), Some("1.5"));
    assert_eq!(reopened.last_row_index(reopened.find_sheet("Data").unwrap()).unwrap(), 3);
}

#[test]
fn missing_workbook_relationship_is_reported() {
    let bytes = package(&[
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", format!(r#"<Relationships xmlns="{PKG_REL_NS}"/>"#)),
    ]);
    assert!(matches!(
        XlsxAdapter::open_bytes(bytes),
        Err(IoError::MissingRelationship { .. })
    ));
}

#[test]
fn missing_shared_string_table() {
    let workbook = format!(
        r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="S" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    );
    let bytes = package(&[
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels("xl/workbook.xml")),
        ("xl/workbook.xml", workbook),
        (
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
            ),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(r#"<worksheet xmlns="{MAIN_NS}"><sheetData/></worksheet>"#),
        ),
    ]);
    let doc = XlsxAdapter::open_bytes(bytes).unwrap();
    assert!(matches!(
        doc.shared_string(0),
        Err(IoError::MissingSharedStringTable)
    ));
    assert_eq!(doc.last_row_index(0).unwrap(), 0);
}

#[test]
fn save_to_path_and_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");

    let mut doc = XlsxAdapter::new();
    let (sheet, _) = doc.get_or_create_sheet("One").unwrap();
    doc.append_row(sheet, 1, &[CellWrite::new("A1", "x", CellType::String)])
        .unwrap();
    doc.save_to(SaveDestination::Path(&path)).unwrap();

    let mut reopened = XlsxAdapter::open_path(&path).unwrap();
    let handle = reopened.find_sheet("One").unwrap();
    reopened
        .append_row(handle, 2, &[CellWrite::new("A2", "y", CellType::String)])
        .unwrap();
    reopened.save().unwrap();

    let again = XlsxAdapter::open_path(&path).unwrap();
    assert_eq!(again.last_row_index(handle).unwrap(), 2);
}
