//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

/// Builds a minimal workbook package entirely in memory. Cell values are
/// written as formula-string (`t="str"`) or numeric `<v>` entries, so no
/// shared-string bookkeeping is needed unless a test asks for it.
pub struct WorkbookBuilder {
    sheets: Vec<(String, Vec<(String, CellKind)>)>,
    shared_strings: Option<Vec<String>>,
    drawings: Vec<Vec<String>>,
    extra_parts: Vec<(String, Vec<u8>)>,
    omit_workbook_part: bool,
}

enum CellKind {
    Text(String),
    Number(String),
    SharedIndex(String),
}

impl WorkbookBuilder {
    pub fn new() -> WorkbookBuilder {
        WorkbookBuilder {
            sheets: Vec::new(),
            shared_strings: None,
            drawings: Vec::new(),
            extra_parts: Vec::new(),
            omit_workbook_part: false,
        }
    }

    pub fn sheet(mut self, name: &str) -> WorkbookBuilder {
        self.sheets.push((name.to_string(), Vec::new()));
        self
    }

    pub fn text(mut self, reference: &str, value: &str) -> WorkbookBuilder {
        self.push_cell(reference, CellKind::Text(value.to_string()));
        self
    }

    pub fn number(mut self, reference: &str, value: f64) -> WorkbookBuilder {
        self.push_cell(reference, CellKind::Number(value.to_string()));
        self
    }

    pub fn shared(mut self, reference: &str, index: &str) -> WorkbookBuilder {
        self.push_cell(reference, CellKind::SharedIndex(index.to_string()));
        self
    }

    /// Fill column A of the current sheet with `count` text rows, making a
    /// part whose parse takes measurable time.
    pub fn filled_rows(mut self, count: u32) -> WorkbookBuilder {
        let sheet = self
            .sheets
            .last_mut()
            .expect("call sheet() before adding cells");
        for row in 1..=count {
            sheet
                .1
                .push((format!("A{row}"), CellKind::Text(format!("value {row}"))));
        }
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> WorkbookBuilder {
        self.shared_strings = Some(strings.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn drawing(mut self, paragraphs: &[&str]) -> WorkbookBuilder {
        self.drawings
            .push(paragraphs.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn extra_part(mut self, name: &str, bytes: &[u8]) -> WorkbookBuilder {
        self.extra_parts.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn without_workbook_part(mut self) -> WorkbookBuilder {
        self.omit_workbook_part = true;
        self
    }

    fn push_cell(&mut self, reference: &str, kind: CellKind) {
        let sheet = self
            .sheets
            .last_mut()
            .expect("call sheet() before adding cells");
        sheet.1.push((reference.to_string(), kind));
    }

    pub fn build(&self) -> Vec<u8> {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        entries.push(("[Content_Types].xml".into(), CONTENT_TYPES.into()));

        if !self.omit_workbook_part {
            let mut workbook = String::from(
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets>"#,
            );
            for (idx, (name, _)) in self.sheets.iter().enumerate() {
                workbook.push_str(&format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
                    escape_xml(name),
                    idx + 1,
                    idx + 1
                ));
            }
            workbook.push_str("</sheets></workbook>");
            entries.push(("xl/workbook.xml".into(), workbook.into()));
        }

        if let Some(strings) = &self.shared_strings {
            let mut sst = String::from(r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
            for s in strings {
                sst.push_str(&format!("<si><t>{}</t></si>", escape_xml(s)));
            }
            sst.push_str("</sst>");
            entries.push(("xl/sharedStrings.xml".into(), sst.into()));
        }

        for (idx, (_, cells)) in self.sheets.iter().enumerate() {
            let mut sheet = String::from(
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row>"#,
            );
            for (reference, kind) in cells {
                match kind {
                    CellKind::Text(value) => sheet.push_str(&format!(
                        r#"<c r="{reference}" t="str"><v>{}</v></c>"#,
                        escape_xml(value)
                    )),
                    CellKind::Number(value) => {
                        sheet.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#))
                    }
                    CellKind::SharedIndex(index) => sheet.push_str(&format!(
                        r#"<c r="{reference}" t="s"><v>{index}</v></c>"#
                    )),
                }
            }
            sheet.push_str("</row></sheetData></worksheet>");
            entries.push((format!("xl/worksheets/sheet{}.xml", idx + 1), sheet.into()));
        }

        for (idx, paragraphs) in self.drawings.iter().enumerate() {
            let mut drawing = String::from(
                r#"<?xml version="1.0"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><xdr:sp><xdr:txBody>"#,
            );
            for p in paragraphs {
                if p.is_empty() {
                    drawing.push_str("<a:p><a:r><a:t></a:t></a:r></a:p>");
                } else {
                    drawing.push_str(&format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape_xml(p)));
                }
            }
            drawing.push_str("</xdr:txBody></xdr:sp></xdr:wsDr>");
            entries.push((format!("xl/drawings/drawing{}.xml", idx + 1), drawing.into()));
        }

        for (name, bytes) in &self.extra_parts {
            entries.push((name.clone(), bytes.clone()));
        }

        build_zip(&entries)
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write workbook file");
    }
}

impl Default for WorkbookBuilder {
    fn default() -> WorkbookBuilder {
        WorkbookBuilder::new()
    }
}

pub fn build_zip(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options).expect("start zip entry");
        writer.write_all(bytes).expect("write zip entry contents");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A workbook that passes every default rule: cover sheet with a filled
/// confirmation cell, a test-item sheet whose rows are all OK, and one
/// valid text box.
pub fn passing_workbook() -> WorkbookBuilder {
    WorkbookBuilder::new()
        .sheet("表紙")
        .text("B5", "確認")
        .text("B6", "山田")
        .sheet("テスト項目")
        .text("AX3", "確認")
        .text("B5", "TC1")
        .text("AX5", "OK")
        .drawing(&["仕様メモ"])
}
