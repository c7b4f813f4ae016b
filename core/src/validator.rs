//! Whole-file validation: opens one workbook, runs the enabled rules in
//! declared order, and folds their diagnostics into a single [`FileResult`].
//!
//! The validator is deterministic and idempotent: rules never mutate the
//! document model, so running it twice over the same bytes yields the same
//! result.

use crate::cancel::CancelFlag;
use crate::config::AuditConfig;
use crate::container::OpcContainer;
use crate::extractor::{load_cell_grid, load_drawing_texts, load_workbook_model, WorkbookModel};
use crate::model::SheetGrid;
use crate::rules::{
    check_cell_pattern, check_confirm_cell, check_filename_prefix, check_forbidden_chars,
    check_forbidden_sheets, check_forbidden_text, check_required_sheets, check_testcase_status,
    check_textbox_content, CompiledRules, Diagnostic, LoadedSheet, RuleId, RuleOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CANCELLED_MESSAGE: &str = "Stopped by user";

/// Terminal status of one file (or of a whole scan, for [`FileStatus::Info`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    Error,
    Cancelled,
    Info,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Ok => "OK",
            FileStatus::Error => "ERROR",
            FileStatus::Cancelled => "CANCELLED",
            FileStatus::Info => "INFO",
        }
    }
}

impl Serialize for FileStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub relative: String,
    pub status: FileStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn new(path: &Path, relative: String, status: FileStatus, diagnostics: Vec<Diagnostic>) -> FileResult {
        FileResult {
            path: path.to_path_buf(),
            relative,
            status,
            diagnostics,
        }
    }

    fn cancelled(path: &Path, relative: String) -> FileResult {
        FileResult::new(
            path,
            relative,
            FileStatus::Cancelled,
            vec![Diagnostic::structural(CANCELLED_MESSAGE)],
        )
    }

    pub(crate) fn info(message: impl Into<String>) -> FileResult {
        FileResult {
            path: PathBuf::new(),
            relative: String::new(),
            status: FileStatus::Info,
            diagnostics: vec![Diagnostic::structural(message)],
        }
    }

    /// All diagnostic messages joined into one display line.
    pub fn diagnostic_text(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn find_grid<'a>(loaded: &'a [LoadedSheet], name: &str) -> Option<&'a SheetGrid> {
    loaded.iter().find(|s| s.name == name).map(|s| &s.grid)
}

/// Run every enabled rule against one workbook file.
///
/// Cancellation discards any partial findings and reports the single
/// [`CANCELLED_MESSAGE`] diagnostic, so a file is never half-reported.
pub fn validate_file(
    root: &Path,
    path: &Path,
    config: &AuditConfig,
    compiled: &CompiledRules,
    options: &RuleOptions,
    cancel: &CancelFlag,
) -> FileResult {
    let relative = relative_display(root, path);
    if cancel.is_cancelled() {
        return FileResult::cancelled(path, relative);
    }

    let mut container = match OpcContainer::open_from_path(path) {
        Ok(container) => container,
        Err(err) => {
            return FileResult::new(
                path,
                relative,
                FileStatus::Error,
                vec![Diagnostic::structural(format!("Cannot open workbook: {err}"))],
            );
        }
    };
    let model = match load_workbook_model(&mut container) {
        Ok(model) => model,
        Err(err) => {
            return FileResult::new(
                path,
                relative,
                FileStatus::Error,
                vec![Diagnostic::structural(format!("Cannot read workbook: {err}"))],
            );
        }
    };

    let mut diagnostics = Vec::new();

    if options.enabled(RuleId::FilenamePrefix) {
        if let Some(message) = check_filename_prefix(path, &config.category_prefix_map) {
            diagnostics.push(Diagnostic::from_rule(RuleId::FilenamePrefix, message));
        }
    }
    if options.enabled(RuleId::RequiredSheets) {
        for message in check_required_sheets(&model.sheet_names, &config.required_sheets) {
            diagnostics.push(Diagnostic::from_rule(RuleId::RequiredSheets, message));
        }
    }
    if options.enabled(RuleId::ForbiddenSheets) {
        for message in check_forbidden_sheets(&model.sheet_names, &config.forbidden_sheets) {
            diagnostics.push(Diagnostic::from_rule(RuleId::ForbiddenSheets, message));
        }
    }
    if cancel.is_cancelled() {
        return FileResult::cancelled(path, relative);
    }

    let loaded = match load_needed_grids(
        &mut container,
        &model,
        config,
        compiled,
        options,
        cancel,
        &mut diagnostics,
    ) {
        Ok(loaded) => loaded,
        Err(CancelledFile) => return FileResult::cancelled(path, relative),
    };

    if options.enabled(RuleId::ForbiddenText) {
        for message in check_forbidden_text(
            &loaded,
            &config.forbidden_text,
            config.forbidden_text_exhaustive,
        ) {
            diagnostics.push(Diagnostic::from_rule(RuleId::ForbiddenText, message));
        }
    }
    if options.enabled(RuleId::ForbiddenChars) {
        match check_forbidden_chars(&loaded, compiled.forbidden_chars.as_ref(), cancel) {
            Ok(Some(message)) => {
                diagnostics.push(Diagnostic::from_rule(RuleId::ForbiddenChars, message));
            }
            Ok(None) => {}
            Err(_) => return FileResult::cancelled(path, relative),
        }
    }
    if options.enabled(RuleId::ConfirmCell) {
        let cover = find_grid(&loaded, &config.cover_sheet);
        if let Some(message) = check_confirm_cell(&model.sheet_names, cover, config) {
            diagnostics.push(Diagnostic::from_rule(RuleId::ConfirmCell, message));
        }
    }
    if options.enabled(RuleId::TestcaseStatus) {
        let test = find_grid(&loaded, &config.test_sheet);
        match check_testcase_status(&model.sheet_names, test, config, cancel) {
            Ok(Some(message)) => {
                diagnostics.push(Diagnostic::from_rule(RuleId::TestcaseStatus, message));
            }
            Ok(None) => {}
            Err(_) => return FileResult::cancelled(path, relative),
        }
    }
    if options.enabled(RuleId::TextboxContent) {
        match load_drawing_texts(&mut container) {
            Ok(texts) => {
                if let Some(message) =
                    check_textbox_content(&texts, &config.forbidden_textbox_token)
                {
                    diagnostics.push(Diagnostic::from_rule(RuleId::TextboxContent, message));
                }
            }
            Err(err) => {
                diagnostics.push(Diagnostic::structural(format!("Cannot read drawings: {err}")));
            }
        }
    }
    if options.enabled(RuleId::CellPattern) {
        if let (Some(rule), Some(detect), Some(valid)) = (
            &config.pattern_rule,
            compiled.pattern_detect.as_ref(),
            compiled.pattern_valid.as_ref(),
        ) {
            if let Some(message) = check_cell_pattern(
                &loaded,
                (rule.column_start, rule.column_end),
                detect,
                valid,
            ) {
                diagnostics.push(Diagnostic::from_rule(RuleId::CellPattern, message));
            }
        }
    }

    let status = if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Error
    };
    debug!(
        path = %relative,
        status = status.as_str(),
        diagnostics = diagnostics.len(),
        "file validated"
    );
    FileResult::new(path, relative, status, diagnostics)
}

struct CancelledFile;

/// Load each sheet grid at most once: every sheet when a whole-workbook
/// rule is enabled, otherwise only the cover and test-item sheets.
fn load_needed_grids(
    container: &mut OpcContainer,
    model: &WorkbookModel,
    config: &AuditConfig,
    compiled: &CompiledRules,
    options: &RuleOptions,
    cancel: &CancelFlag,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<LoadedSheet>, CancelledFile> {
    let needs_all = options.enabled(RuleId::ForbiddenText) && !config.forbidden_text.is_empty()
        || options.enabled(RuleId::ForbiddenChars) && compiled.forbidden_chars.is_some()
        || options.enabled(RuleId::CellPattern) && compiled.pattern_detect.is_some();

    let mut wanted: Vec<&str> = Vec::new();
    for name in &model.sheet_names {
        let single = options.enabled(RuleId::ConfirmCell) && *name == config.cover_sheet
            || options.enabled(RuleId::TestcaseStatus) && *name == config.test_sheet;
        if needs_all || single {
            wanted.push(name);
        }
    }

    let mut loaded = Vec::with_capacity(wanted.len());
    for name in wanted {
        if cancel.is_cancelled() {
            return Err(CancelledFile);
        }
        // sheet_position is always Some for names taken from the model
        let Some(position) = model.sheet_position(name) else {
            continue;
        };
        match load_cell_grid(container, name, position, &model.shared) {
            Ok(grid) => loaded.push(LoadedSheet {
                name: name.to_string(),
                grid,
            }),
            Err(err) => diagnostics.push(Diagnostic::structural(format!(
                "Cannot read sheet '{name}': {err}"
            ))),
        }
    }
    Ok(loaded)
}
