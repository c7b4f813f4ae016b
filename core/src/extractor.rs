//! Document model extraction from an open container.
//!
//! Bridges [`OpcContainer`] I/O and the pure XML parsers: loads the shared
//! string table and sheet name list once per file, and per-sheet grids and
//! drawing texts on demand.

use crate::container::{ContainerError, OpcContainer};
use crate::drawing::parse_textbox_texts;
use crate::model::{SharedStringTable, SheetGrid};
use crate::sheet_parser::{
    parse_shared_strings, parse_sheet_cells, parse_sheet_names, SheetParseError,
};
use thiserror::Error;
use tracing::debug;

pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
pub const WORKBOOK_PART: &str = "xl/workbook.xml";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    #[error("XML error: {0}")]
    Parse(#[from] SheetParseError),
    #[error("workbook.xml missing or unreadable")]
    WorkbookXmlMissing,
    #[error("worksheet part missing for sheet '{sheet_name}'")]
    WorksheetXmlMissing { sheet_name: String },
}

/// Part name for the sheet at the given 1-based workbook position.
pub fn sheet_part_name(position: usize) -> String {
    format!("xl/worksheets/sheet{position}.xml")
}

/// The workbook-wide portion of the document model, built once per file.
#[derive(Debug, Default)]
pub struct WorkbookModel {
    pub shared: SharedStringTable,
    pub sheet_names: Vec<String>,
}

impl WorkbookModel {
    /// 1-based workbook position of a sheet name, if declared.
    pub fn sheet_position(&self, name: &str) -> Option<usize> {
        self.sheet_names
            .iter()
            .position(|n| n == name)
            .map(|idx| idx + 1)
    }
}

/// Load shared strings and sheet names. A missing shared-string part yields
/// an empty table; a missing workbook manifest is a structural error.
pub fn load_workbook_model(container: &mut OpcContainer) -> Result<WorkbookModel, ExtractError> {
    let shared = match container.read_part_optional(SHARED_STRINGS_PART)? {
        Some(bytes) => parse_shared_strings(&bytes)?,
        None => SharedStringTable::default(),
    };

    let workbook_bytes = container
        .read_part(WORKBOOK_PART)
        .map_err(|_| ExtractError::WorkbookXmlMissing)?;
    let sheet_names = parse_sheet_names(&workbook_bytes)?;

    debug!(
        sheets = sheet_names.len(),
        shared_strings = shared.len(),
        "workbook model loaded"
    );

    Ok(WorkbookModel {
        shared,
        sheet_names,
    })
}

/// Load the cell grid of the sheet at the given 1-based position.
pub fn load_cell_grid(
    container: &mut OpcContainer,
    sheet_name: &str,
    position: usize,
    shared: &SharedStringTable,
) -> Result<SheetGrid, ExtractError> {
    let part = sheet_part_name(position);
    let bytes = container
        .read_part(&part)
        .map_err(|_| ExtractError::WorksheetXmlMissing {
            sheet_name: sheet_name.to_string(),
        })?;
    Ok(parse_sheet_cells(&bytes, shared)?)
}

/// Collect text-box paragraph texts from every drawing part. Workbooks
/// without drawings yield an empty list.
pub fn load_drawing_texts(container: &mut OpcContainer) -> Result<Vec<String>, ExtractError> {
    let parts: Vec<String> = container
        .part_names()
        .filter(|name| name.starts_with("xl/drawings/drawing") && name.ends_with(".xml"))
        .map(str::to_string)
        .collect();

    let mut texts = Vec::new();
    for part in parts {
        let bytes = container.read_part(&part)?;
        texts.extend(parse_textbox_texts(&bytes)?);
    }
    Ok(texts)
}
