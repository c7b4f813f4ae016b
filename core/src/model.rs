//! Document model for one spreadsheet file.
//!
//! This module defines the read-only intermediate representation the rule set
//! consumes:
//! - [`CellRef`]: a parsed A1-style cell reference ("AB12")
//! - [`CellScalar`]: a resolved cell value (text or number)
//! - [`SheetGrid`]: the sparse cell grid of one sheet
//! - [`SharedStringTable`]: the workbook-wide shared string table

use crate::addressing::{column_to_letter, letter_to_column};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cell reference: {0}")]
pub struct CellRefParseError(pub String);

/// A cell reference with 1-based column and row indices.
///
/// The textual form is always uppercase column letters followed by a decimal
/// row number with no separator (`[A-Z]+[0-9]+`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> CellRef {
        debug_assert!(col >= 1 && row >= 1);
        CellRef { col, row }
    }

    /// The cell directly below this one (same column, next row).
    pub fn below(self) -> CellRef {
        CellRef {
            col: self.col,
            row: self.row + 1,
        }
    }

    pub fn to_a1(self) -> String {
        let letters = column_to_letter(self.col).unwrap_or_default();
        format!("{letters}{}", self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl FromStr for CellRef {
    type Err = CellRefParseError;

    fn from_str(s: &str) -> Result<CellRef, CellRefParseError> {
        let split = s.bytes().position(|b| b.is_ascii_digit());
        let Some(split) = split else {
            return Err(CellRefParseError(s.to_string()));
        };
        let (letters, digits) = s.split_at(split);

        let col = letter_to_column(letters).ok_or_else(|| CellRefParseError(s.to_string()))?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CellRefParseError(s.to_string()));
        }
        let row: u32 = digits
            .parse()
            .map_err(|_| CellRefParseError(s.to_string()))?;
        if row == 0 {
            return Err(CellRefParseError(s.to_string()));
        }

        Ok(CellRef { col, row })
    }
}

impl Serialize for CellRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_a1())
    }
}

/// A resolved scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellScalar {
    Text(String),
    Number(f64),
}

impl CellScalar {
    /// The value as text, `None` for numeric cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellScalar::Text(s) => Some(s),
            CellScalar::Number(_) => None,
        }
    }

    /// A display rendition used in diagnostics.
    pub fn display(&self) -> String {
        match self {
            CellScalar::Text(s) => s.clone(),
            CellScalar::Number(n) => n.to_string(),
        }
    }

    /// True when the cell holds no visible content after trimming.
    pub fn is_blank(&self) -> bool {
        matches!(self, CellScalar::Text(s) if s.trim().is_empty())
    }
}

/// The sparse cell grid of one sheet.
///
/// Cells are stored in document order (the order they appear in the sheet
/// XML) with a hash index for reference lookup, so "first match" scans are
/// deterministic and follow the part's layout.
#[derive(Debug, Default, Clone)]
pub struct SheetGrid {
    cells: Vec<(CellRef, CellScalar)>,
    index: FxHashMap<CellRef, u32>,
}

impl SheetGrid {
    pub fn new() -> SheetGrid {
        SheetGrid::default()
    }

    /// Insert a resolved cell. A duplicate reference overwrites the previous
    /// value in place, keeping the original position.
    pub fn insert(&mut self, cell: CellRef, value: CellScalar) {
        if let Some(&slot) = self.index.get(&cell) {
            self.cells[slot as usize].1 = value;
            return;
        }
        self.index.insert(cell, self.cells.len() as u32);
        self.cells.push((cell, value));
    }

    pub fn get(&self, cell: CellRef) -> Option<&CellScalar> {
        self.index
            .get(&cell)
            .map(|&slot| &self.cells[slot as usize].1)
    }

    /// Look up a cell by its A1 reference string.
    pub fn get_a1(&self, reference: &str) -> Option<&CellScalar> {
        let cell: CellRef = reference.parse().ok()?;
        self.get(cell)
    }

    /// Cells in document order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &CellScalar)> {
        self.cells.iter().map(|(cell, value)| (*cell, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The workbook's shared string table, indexed by the `t="s"` cells.
#[derive(Debug, Default, Clone)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    pub fn new(strings: Vec<String>) -> SharedStringTable {
        SharedStringTable { strings }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
