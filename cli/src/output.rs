//! Report rendering for scan results.

use serde::Serialize;
use sheet_audit::{FileResult, FileStatus};

/// One human-readable line per file. Clean files print without a trailing
/// diagnostic section.
pub fn print_text_line(result: &FileResult) {
    let label = if result.relative.is_empty() {
        "-".to_string()
    } else {
        result.relative.clone()
    };
    let text = result.diagnostic_text();
    if text.is_empty() {
        println!("[{}] {}", result.status.as_str(), label);
    } else {
        println!("[{}] {}: {}", result.status.as_str(), label, text);
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub error: usize,
    pub cancelled: usize,
    pub info: usize,
}

impl Summary {
    pub fn record(&mut self, status: FileStatus) {
        self.total += 1;
        match status {
            FileStatus::Ok => self.ok += 1,
            FileStatus::Error => self.error += 1,
            FileStatus::Cancelled => self.cancelled += 1,
            FileStatus::Info => self.info += 1,
        }
    }

    pub fn print_text(&self) {
        println!(
            "{} file(s): {} ok, {} error, {} cancelled",
            self.total - self.info,
            self.ok,
            self.error,
            self.cancelled
        );
    }
}

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub results: Vec<FileResult>,
    pub summary: Summary,
}

impl JsonReport {
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
