//! XML parsing for workbook structure and worksheet grids.
//!
//! Pure functions from raw part bytes to the document model; container I/O
//! lives in [`crate::extractor`]. Parsing is event-driven via `quick-xml`
//! with no DOM construction.

use crate::model::{CellRef, CellScalar, SharedStringTable, SheetGrid};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SheetParseError {
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("invalid cell reference: {0}")]
    InvalidReference(String),
}

/// Parse `xl/sharedStrings.xml`. Each table entry concatenates every `<t>`
/// run inside one `<si>` item, in document order.
pub fn parse_shared_strings(xml: &[u8]) -> Result<SharedStringTable, SheetParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"si" => {
                current.clear();
                in_si = true;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" && in_si => {
                let text = reader
                    .read_text(e.name())
                    .map_err(|e| SheetParseError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
                in_si = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(SharedStringTable::new(strings))
}

/// Parse `xl/workbook.xml`, returning the declared sheet names in document
/// order. Position `i` (1-based) maps the name to `xl/worksheets/sheet{i}.xml`.
pub fn parse_sheet_names(xml: &[u8]) -> Result<Vec<String>, SheetParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut names = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                if let Some(name) = get_attr_value(&e, b"name")? {
                    names.push(name);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(names)
}

/// Parse one worksheet part into a [`SheetGrid`].
///
/// Cells without a `<v>` child are omitted (treated as empty). Cells typed
/// `t="s"` re-resolve through the shared string table; an index that is not
/// purely numeric, or that falls outside the table, resolves to absent
/// rather than an error.
pub fn parse_sheet_cells(
    xml: &[u8],
    shared: &SharedStringTable,
) -> Result<SheetGrid, SheetParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut grid = SheetGrid::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                let start = e.to_owned();
                parse_cell(&mut reader, &start, shared, &mut grid)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(grid)
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    shared: &SharedStringTable,
    grid: &mut SheetGrid,
) -> Result<(), SheetParseError> {
    let reference = get_attr_value(start, b"r")?
        .ok_or_else(|| SheetParseError::Xml("cell missing reference".into()))?;
    let cell: CellRef = reference
        .parse()
        .map_err(|_| SheetParseError::InvalidReference(reference.clone()))?;
    let cell_type = get_attr_value(start, b"t")?;

    let mut value_text: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                let text = reader
                    .read_text(e.name())
                    .map_err(|e| SheetParseError::Xml(e.to_string()))?
                    .into_owned();
                value_text = Some(text);
            }
            Ok(Event::End(e)) if e.name().as_ref() == start.name().as_ref() => break,
            Ok(Event::Eof) => {
                return Err(SheetParseError::Xml("unexpected EOF inside cell".into()));
            }
            Err(e) => return Err(SheetParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(value) = resolve_value(value_text.as_deref(), cell_type.as_deref(), shared) {
        grid.insert(cell, value);
    }
    Ok(())
}

/// Resolve a raw `<v>` text into a scalar, or `None` for an absent cell.
pub(crate) fn resolve_value(
    value_text: Option<&str>,
    cell_type: Option<&str>,
    shared: &SharedStringTable,
) -> Option<CellScalar> {
    let raw = value_text?;
    if raw.is_empty() {
        return None;
    }

    match cell_type {
        Some("s") => {
            let trimmed = raw.trim();
            if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let index: usize = trimmed.parse().ok()?;
            shared.get(index).map(|s| CellScalar::Text(s.to_string()))
        }
        _ => match raw.trim().parse::<f64>() {
            Ok(n) => Some(CellScalar::Number(n)),
            Err(_) => Some(CellScalar::Text(raw.to_string())),
        },
    }
}

fn get_attr_value(
    element: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, SheetParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| SheetParseError::Xml(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(
                attr.unescape_value()
                    .map_err(|e| SheetParseError::Xml(e.to_string()))?
                    .into_owned(),
            ));
        }
    }
    Ok(None)
}
