//! Audit configuration.
//!
//! `AuditConfig` centralizes every table and threshold the rule set consumes.
//! The engine treats a config as already validated; [`AuditConfig::validate`]
//! is the single gate, and loading from JSON is a thin convenience for the
//! front end.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spreadsheet_extensions must not be empty")]
    NoExtensions,
    #[error("extension '{0}' must start with '.'")]
    BadExtension(String),
    #[error("max_rows ({max_rows}) must not be below first_data_row ({first_data_row})")]
    RowBoundsInverted { max_rows: u32, first_data_row: u32 },
    #[error("empty_limit must be at least 1")]
    ZeroEmptyLimit,
    #[error("status header column range is inverted: {start}..{end}")]
    HeaderColumnsInverted { start: u32, end: u32 },
    #[error("pattern rule column range is inverted: {start}..{end}")]
    PatternColumnsInverted { start: u32, end: u32 },
    #[error("invalid {which} pattern '{pattern}': {reason}")]
    BadPattern {
        which: &'static str,
        pattern: String,
        reason: String,
    },
    #[error("file_timeout_ms must be at least 1")]
    ZeroTimeout,
}

/// The pattern-validity rule: cells in the column range whose value matches
/// `detect` (case-insensitive) must also match `valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub column_start: u32,
    pub column_end: u32,
    pub detect: String,
    pub valid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Ordered folder-name to required-filename-prefix table. Only the first
    /// matching ancestor folder (in table order) is checked.
    pub category_prefix_map: Vec<(String, String)>,
    pub required_sheets: Vec<String>,
    pub forbidden_sheets: Vec<String>,
    /// Lowercase filename extensions treated as spreadsheet candidates.
    pub spreadsheet_extensions: Vec<String>,
    /// Characters forbidden anywhere in a string cell.
    pub forbidden_chars: Vec<char>,
    /// Substrings forbidden anywhere in a string cell.
    pub forbidden_text: Vec<String>,
    /// When true the forbidden-text scan reports every match instead of
    /// stopping at the first hit in the file.
    pub forbidden_text_exhaustive: bool,
    /// Sheet holding the confirmation marker.
    pub cover_sheet: String,
    /// Sentinel cell value anchoring the confirmation check.
    pub confirm_marker: String,
    /// Sheet holding the test-item table.
    pub test_sheet: String,
    /// Header value identifying the status column on the test sheet.
    pub status_header: String,
    /// Candidate header rows searched for the status header.
    pub status_header_rows: Vec<u32>,
    /// Inclusive column range searched for the status header.
    pub status_header_columns: (u32, u32),
    /// 1-based column whose non-empty value marks a row as an active test item.
    pub identifier_column: u32,
    pub first_data_row: u32,
    pub max_rows: u32,
    /// Consecutive inactive rows after which the test-item scan stops.
    pub empty_limit: u32,
    /// Token forbidden inside text-box content.
    pub forbidden_textbox_token: String,
    pub pattern_rule: Option<PatternRule>,
    /// Per-file validation budget in milliseconds.
    pub file_timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            category_prefix_map: Vec::new(),
            required_sheets: Vec::new(),
            forbidden_sheets: Vec::new(),
            spreadsheet_extensions: vec![".xlsx".into(), ".xlsm".into()],
            forbidden_chars: Vec::new(),
            forbidden_text: Vec::new(),
            forbidden_text_exhaustive: false,
            cover_sheet: "表紙".into(),
            confirm_marker: "確認".into(),
            test_sheet: "テスト項目".into(),
            status_header: "確認".into(),
            status_header_rows: vec![3, 4],
            status_header_columns: (50, 99),
            identifier_column: 2,
            first_data_row: 5,
            max_rows: 1000,
            empty_limit: 10,
            forbidden_textbox_token: "API".into(),
            pattern_rule: None,
            file_timeout_ms: 30_000,
        }
    }
}

impl AuditConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<AuditConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: AuditConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        for ext in &self.spreadsheet_extensions {
            if !ext.starts_with('.') {
                return Err(ConfigError::BadExtension(ext.clone()));
            }
        }
        if self.max_rows < self.first_data_row {
            return Err(ConfigError::RowBoundsInverted {
                max_rows: self.max_rows,
                first_data_row: self.first_data_row,
            });
        }
        if self.empty_limit == 0 {
            return Err(ConfigError::ZeroEmptyLimit);
        }
        let (start, end) = self.status_header_columns;
        if start > end || start == 0 {
            return Err(ConfigError::HeaderColumnsInverted { start, end });
        }
        if let Some(rule) = &self.pattern_rule {
            if rule.column_start > rule.column_end || rule.column_start == 0 {
                return Err(ConfigError::PatternColumnsInverted {
                    start: rule.column_start,
                    end: rule.column_end,
                });
            }
            compile_pattern("detect", &rule.detect, true)?;
            compile_pattern("valid", &rule.valid, false)?;
        }
        if self.file_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

pub(crate) fn compile_pattern(
    which: &'static str,
    pattern: &str,
    case_insensitive: bool,
) -> Result<Regex, ConfigError> {
    let source = if case_insensitive {
        format!("(?i){pattern}")
    } else {
        pattern.to_string()
    };
    Regex::new(&source).map_err(|e| ConfigError::BadPattern {
        which,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
