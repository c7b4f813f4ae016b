//! Spreadsheet audit engine.
//!
//! Reads OOXML workbooks directly from their zip containers, extracts a
//! minimal document model (sheet names, shared strings, cell grids, drawing
//! texts), and runs a configurable battery of validation rules over each
//! file. The [`scanner`] module drives whole-directory batches concurrently
//! with cooperative cancellation.

pub mod addressing;
pub mod cancel;
pub mod config;
pub mod container;
pub mod drawing;
pub mod extractor;
pub mod model;
pub mod rules;
pub mod scanner;
pub mod sheet_parser;
pub mod validator;

pub use cancel::CancelFlag;
pub use config::{AuditConfig, ConfigError, PatternRule};
pub use container::{ContainerError, ContainerLimits, OpcContainer};
pub use extractor::{load_workbook_model, ExtractError, WorkbookModel};
pub use model::{CellRef, CellScalar, SharedStringTable, SheetGrid};
pub use rules::{CompiledRules, Diagnostic, RuleId, RuleOptions};
pub use scanner::{scan, ScanEvent, ScanHandle};
pub use validator::{validate_file, FileResult, FileStatus};
