#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;

pub const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Builds a single-sheet workbook from raw `<row>` markup.
pub struct PackageBuilder {
    sheet_name: String,
    rows: String,
    shared_strings: Option<Vec<String>>,
    number_formats: Vec<u32>,
}

impl PackageBuilder {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            rows: String::new(),
            shared_strings: None,
            number_formats: vec![0],
        }
    }

    /// Appends `<row r="{index}">{cells}</row>`.
    pub fn row(mut self, index: u32, cells: &str) -> Self {
        self.rows.push_str(&format!(r#"<row r="{index}">{cells}</row>"#));
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|s| s.to_string()).collect());
        self
    }

    /// One `cellXfs` entry per code; style index `i` uses `codes[i]`.
    pub fn number_formats(mut self, codes: &[u32]) -> Self {
        self.number_formats = codes.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let workbook = format!(
            r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            self.sheet_name
        );
        let mut rels = format!(
            r#"<Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/styles" Target="styles.xml"/>"#
        );
        if self.shared_strings.is_some() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId3" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
        }
        let xfs: String = self
            .number_formats
            .iter()
            .map(|code| format!(r#"<xf numFmtId="{code}"/>"#))
            .collect();
        let styles = format!(
            r#"<styleSheet xmlns="{MAIN_NS}"><cellXfs count="{}">{xfs}</cellXfs></styleSheet>"#,
            self.number_formats.len()
        );
        let sheet = format!(
            r#"<worksheet xmlns="{MAIN_NS}"><sheetData>{}</sheetData></worksheet>"#,
            self.rows
        );

        let mut parts = vec![
            (
                "[Content_Types].xml",
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
            ),
            (
                "_rels/.rels",
                format!(
                    r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                ),
            ),
            ("xl/workbook.xml", workbook),
            (
                "xl/_rels/workbook.xml.rels",
                format!(r#"<Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#),
            ),
            ("xl/worksheets/sheet1.xml", sheet),
            ("xl/styles.xml", styles),
        ];
        if let Some(strings) = &self.shared_strings {
            let items: String = strings
                .iter()
                .map(|s| format!("<si><t>{s}</t></si>"))
                .collect();
            parts.push((
                "xl/sharedStrings.xml",
                format!(r#"<sst xmlns="{MAIN_NS}">{items}</sst>"#),
            ));
        }
        zip_parts(&parts)
    }
}

pub fn zip_parts(parts: &[(&str, String)]) -> Vec<u8> {
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
