use anyhow::Result;
use serde::Serialize;

use crate::domain::{
    audit::AuditEntry,
    lifecycle::SessionState,
    ports::OutputWriter,
    report::{FileSummary, ProgressReport, SessionReport},
    value_objects::FilePath,
};

// ─── Serialisation view types ─────────────────────────────────────────────────
//
// These mirror the report structs but add a `status` label to each file and
// render warnings as readable messages. They are presentation-only: the
// domain types are never modified.

#[derive(Serialize)]
struct JsonReport<'a> {
    session_id: &'a str,
    created_at: &'a str,
    generated_at: &'a str,
    state: SessionState,
    focused: Option<&'a FilePath>,
    progress: &'a ProgressReport,
    progress_percent: u8,
    can_commit: bool,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a FilePath,
    status: &'static str,
    conflicts: usize,
    resolved: usize,
    unresolved: usize,
    overridden: bool,
    warnings: Vec<String>,
    audit: &'a [AuditEntry],
}

/// One word per file, in priority order: a suspect file is flagged even if
/// it is otherwise resolved.
pub fn file_status(file: &FileSummary) -> &'static str {
    if file.is_suspect() {
        "suspect"
    } else if file.overridden {
        "overridden"
    } else if file.is_resolved() {
        "resolved"
    } else {
        "unresolved"
    }
}

fn build_file(file: &FileSummary) -> JsonFile<'_> {
    JsonFile {
        path: &file.path,
        status: file_status(file),
        conflicts: file.conflicts,
        resolved: file.resolved,
        unresolved: file.unresolved,
        overridden: file.overridden,
        warnings: file.warnings.iter().map(|w| w.to_string()).collect(),
        audit: &file.audit,
    }
}

// ─── Writer ───────────────────────────────────────────────────────────────────

pub struct JsonWriter;

impl OutputWriter for JsonWriter {
    fn format(&self, report: &SessionReport) -> Result<String> {
        let view = JsonReport {
            session_id: &report.session_id,
            created_at: &report.created_at,
            generated_at: &report.generated_at,
            state: report.state,
            focused: report.focused.as_ref(),
            progress: &report.progress,
            progress_percent: (report.progress.ratio * 100.0).round() as u8,
            can_commit: report.can_commit,
            files: report.files.iter().map(build_file).collect(),
        };

        Ok(serde_json::to_string_pretty(&view)?)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
