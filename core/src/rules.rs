//! The validation rule set.
//!
//! Every rule is an independent, side-effect-free check over the document
//! model. A rule produces zero or more diagnostic strings; selection,
//! ordering, and flattening into a [`crate::validator::FileResult`] happen in
//! the validator. Rules that walk unbounded cell ranges take the shared
//! [`CancelFlag`] and check it at fixed intervals.

use crate::cancel::{CancelFlag, CANCEL_CHECK_INTERVAL};
use crate::config::{compile_pattern, AuditConfig, ConfigError};
use crate::model::{CellRef, CellScalar, SheetGrid};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;

/// Stable identifier of one toggleable rule, in declared execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    FilenamePrefix,
    RequiredSheets,
    ForbiddenSheets,
    ForbiddenText,
    ForbiddenChars,
    ConfirmCell,
    TestcaseStatus,
    TextboxContent,
    CellPattern,
}

impl RuleId {
    pub const ALL: [RuleId; 9] = [
        RuleId::FilenamePrefix,
        RuleId::RequiredSheets,
        RuleId::ForbiddenSheets,
        RuleId::ForbiddenText,
        RuleId::ForbiddenChars,
        RuleId::ConfirmCell,
        RuleId::TestcaseStatus,
        RuleId::TextboxContent,
        RuleId::CellPattern,
    ];

    /// Stable option key, as consumed by [`RuleOptions`].
    pub fn key(self) -> &'static str {
        match self {
            RuleId::FilenamePrefix => "check_filename_prefix",
            RuleId::RequiredSheets => "check_required_sheets",
            RuleId::ForbiddenSheets => "check_forbidden_sheets",
            RuleId::ForbiddenText => "check_forbidden_text",
            RuleId::ForbiddenChars => "check_forbidden_chars",
            RuleId::ConfirmCell => "check_confirm_cell",
            RuleId::TestcaseStatus => "check_testcase_status",
            RuleId::TextboxContent => "check_textbox_content",
            RuleId::CellPattern => "check_cell_pattern",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleId::FilenamePrefix => "Filename prefix matches its category folder",
            RuleId::RequiredSheets => "Required sheets are present",
            RuleId::ForbiddenSheets => "Forbidden sheets are absent",
            RuleId::ForbiddenText => "Cells contain no forbidden text",
            RuleId::ForbiddenChars => "Cells contain no forbidden characters",
            RuleId::ConfirmCell => "Confirmation marker is filled in",
            RuleId::TestcaseStatus => "All test items are marked OK",
            RuleId::TextboxContent => "Text boxes hold valid content",
            RuleId::CellPattern => "Column range matches the required format",
        }
    }

    pub fn default_enabled(self) -> bool {
        true
    }

    pub fn from_key(key: &str) -> Option<RuleId> {
        RuleId::ALL.iter().copied().find(|rule| rule.key() == key)
    }
}

impl Serialize for RuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// One structured diagnostic. `rule` is `None` for extraction failures that
/// are not attributable to a single rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub rule: Option<RuleId>,
    pub message: String,
}

impl Diagnostic {
    pub fn from_rule(rule: RuleId, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            rule: Some(rule),
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            rule: None,
            message: message.into(),
        }
    }
}

/// Per-run rule toggles keyed by [`RuleId::key`]. Missing keys default to
/// the rule's default; unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    overrides: FxHashMap<String, bool>,
}

impl RuleOptions {
    pub fn new() -> RuleOptions {
        RuleOptions::default()
    }

    pub fn set(&mut self, key: impl Into<String>, enabled: bool) -> &mut Self {
        self.overrides.insert(key.into(), enabled);
        self
    }

    pub fn enabled(&self, rule: RuleId) -> bool {
        self.overrides
            .get(rule.key())
            .copied()
            .unwrap_or_else(|| rule.default_enabled())
    }

    /// The enabled subset, in declared rule order.
    pub fn enabled_rules(&self) -> Vec<RuleId> {
        RuleId::ALL
            .iter()
            .copied()
            .filter(|rule| self.enabled(*rule))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for RuleOptions {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> RuleOptions {
        let mut options = RuleOptions::new();
        for (key, enabled) in iter {
            options.set(key, enabled);
        }
        options
    }
}

/// Patterns compiled once per scan and shared read-only across workers.
#[derive(Debug, Default)]
pub struct CompiledRules {
    pub forbidden_chars: Option<Regex>,
    pub pattern_detect: Option<Regex>,
    pub pattern_valid: Option<Regex>,
}

impl CompiledRules {
    pub fn compile(config: &AuditConfig) -> Result<CompiledRules, ConfigError> {
        let forbidden_chars = if config.forbidden_chars.is_empty() {
            None
        } else {
            let alternation = config
                .forbidden_chars
                .iter()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile_pattern("forbidden_chars", &alternation, false)?)
        };

        let (pattern_detect, pattern_valid) = match &config.pattern_rule {
            Some(rule) => (
                Some(compile_pattern("detect", &rule.detect, true)?),
                Some(compile_pattern("valid", &rule.valid, false)?),
            ),
            None => (None, None),
        };

        Ok(CompiledRules {
            forbidden_chars,
            pattern_detect,
            pattern_valid,
        })
    }
}

/// A sheet name paired with its loaded grid, in workbook order.
#[derive(Debug)]
pub struct LoadedSheet {
    pub name: String,
    pub grid: SheetGrid,
}

/// Marker error: the cancellation flag was observed mid-scan.
#[derive(Debug, PartialEq, Eq)]
pub struct Cancelled;

/// Rule 1: the file name must carry the prefix of the first configured
/// ancestor folder it sits under.
pub fn check_filename_prefix(path: &Path, table: &[(String, String)]) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    let ancestors: Vec<String> = path
        .parent()?
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    for (folder, prefix) in table {
        if ancestors.iter().any(|a| a == folder) {
            if !file_name.starts_with(prefix.as_str()) {
                return Some(format!("Invalid filename for '{folder}'"));
            }
            break;
        }
    }
    None
}

/// Rule 2: one diagnostic per required sheet that is missing.
pub fn check_required_sheets(sheet_names: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !sheet_names.contains(name))
        .map(|name| format!("Missing required sheet: {name}"))
        .collect()
}

/// Rule 3: one diagnostic per forbidden sheet that is present.
pub fn check_forbidden_sheets(sheet_names: &[String], forbidden: &[String]) -> Vec<String> {
    forbidden
        .iter()
        .filter(|name| sheet_names.contains(name))
        .map(|name| format!("Contains invalid sheet: {name}"))
        .collect()
}

/// Rule 4: forbidden substrings in string cells. Stops at the first match
/// unless `exhaustive` is set.
pub fn check_forbidden_text(
    sheets: &[LoadedSheet],
    needles: &[String],
    exhaustive: bool,
) -> Vec<String> {
    let mut hits = Vec::new();
    if needles.is_empty() {
        return hits;
    }

    for sheet in sheets {
        for (cell, value) in sheet.grid.iter() {
            let Some(text) = value.as_text() else {
                continue;
            };
            if needles.iter().any(|needle| text.contains(needle.as_str())) {
                hits.push(format!(
                    "{}: Contains invalid text: {}->{}",
                    sheet.name, cell, text
                ));
                if !exhaustive {
                    return hits;
                }
            }
        }
    }
    hits
}

/// Rule 5: forbidden single characters. Exhaustive across all sheets; all
/// matches are space-joined into one diagnostic.
pub fn check_forbidden_chars(
    sheets: &[LoadedSheet],
    pattern: Option<&Regex>,
    cancel: &CancelFlag,
) -> Result<Option<String>, Cancelled> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };

    let mut fragments = Vec::new();
    let mut walked = 0usize;
    for sheet in sheets {
        for (cell, value) in sheet.grid.iter() {
            walked += 1;
            if walked % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(Cancelled);
            }
            let Some(text) = value.as_text() else {
                continue;
            };
            if pattern.is_match(text) {
                fragments.push(format!("{}: {}->{}", sheet.name, cell, text));
            }
        }
    }

    if fragments.is_empty() {
        Ok(None)
    } else {
        Ok(Some(fragments.join(" ")))
    }
}

/// Rule 6: the cell directly below the first confirmation marker on the
/// cover sheet must be non-empty.
pub fn check_confirm_cell(
    sheet_names: &[String],
    cover_grid: Option<&SheetGrid>,
    config: &AuditConfig,
) -> Option<String> {
    if !sheet_names.iter().any(|name| *name == config.cover_sheet) {
        return Some(format!("Missing required sheet: '{}'", config.cover_sheet));
    }
    let grid = cover_grid?;

    for (cell, value) in grid.iter() {
        if value.as_text() != Some(config.confirm_marker.as_str()) {
            continue;
        }
        return match grid.get(cell.below()) {
            Some(below) if !below.is_blank() => None,
            _ => Some("Missing Confirm".to_string()),
        };
    }

    // No marker anywhere on the cover sheet counts as unconfirmed.
    Some("Missing Confirm".to_string())
}

/// Rule 7: every active test-item row must carry an OK status.
pub fn check_testcase_status(
    sheet_names: &[String],
    test_grid: Option<&SheetGrid>,
    config: &AuditConfig,
    cancel: &CancelFlag,
) -> Result<Option<String>, Cancelled> {
    if !sheet_names.iter().any(|name| *name == config.test_sheet) {
        return Ok(Some(format!(
            "Missing required sheet: '{}'",
            config.test_sheet
        )));
    }
    let Some(grid) = test_grid else {
        return Ok(None);
    };

    let (col_start, col_end) = config.status_header_columns;
    let mut status_col = None;
    'header: for &row in &config.status_header_rows {
        for col in col_start..=col_end {
            let value = grid.get(CellRef::new(col, row));
            if value.and_then(CellScalar::as_text) == Some(config.status_header.as_str()) {
                status_col = Some(col);
                break 'header;
            }
        }
    }
    let Some(status_col) = status_col else {
        return Ok(Some(format!("Column '{}' not found", config.status_header)));
    };

    let mut failing = Vec::new();
    let mut consecutive_empty = 0u32;
    for row in config.first_data_row..=config.max_rows {
        if (row - config.first_data_row) as usize % CANCEL_CHECK_INTERVAL == 0
            && cancel.is_cancelled()
        {
            return Err(Cancelled);
        }

        let identifier = grid.get(CellRef::new(config.identifier_column, row));
        match identifier {
            Some(id) if !id.is_blank() => {
                consecutive_empty = 0;
                let status = grid.get(CellRef::new(status_col, row));
                let passes = status
                    .map(|s| s.display().trim().eq_ignore_ascii_case("OK"))
                    .unwrap_or(false);
                if !passes {
                    failing.push(id.display().trim().to_string());
                }
            }
            _ => {
                consecutive_empty += 1;
                if consecutive_empty >= config.empty_limit {
                    break;
                }
            }
        }
    }

    if failing.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!(
            "{} TC(s) != 'OK': {}",
            failing.len(),
            failing.join("; ")
        )))
    }
}

/// Rule 8: no text box may be empty or contain the forbidden token.
pub fn check_textbox_content(texts: &[String], token: &str) -> Option<String> {
    texts
        .iter()
        .find(|text| text.is_empty() || text.contains(token))
        .map(|text| format!("Incorrect TextBox content: '{text}'"))
}

/// Rule 9: string cells in the configured column range that look like the
/// detect pattern must match the valid pattern.
pub fn check_cell_pattern(
    sheets: &[LoadedSheet],
    column_range: (u32, u32),
    detect: &Regex,
    valid: &Regex,
) -> Option<String> {
    let (start, end) = column_range;
    for sheet in sheets {
        for (cell, value) in sheet.grid.iter() {
            if cell.col < start || cell.col > end {
                continue;
            }
            let Some(text) = value.as_text() else {
                continue;
            };
            if detect.is_match(text) && !valid.is_match(text) {
                return Some(format!("{}: Invalid format: {}->{}", sheet.name, cell, text));
            }
        }
    }
    None
}
