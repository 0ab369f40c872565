use chrono::Utc;
use serde::Serialize;

use crate::domain::audit::AuditEntry;
use crate::domain::error::ParseWarning;
use crate::domain::lifecycle::SessionState;
use crate::domain::value_objects::FilePath;

/// Point-in-time view of one file's resolution state.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FileSummary {
    pub path: FilePath,
    pub conflicts: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Marked resolved through the whole-file override.
    pub overridden: bool,
    pub warnings: Vec<ParseWarning>,
    pub audit: Vec<AuditEntry>,
}

impl FileSummary {
    pub fn is_resolved(&self) -> bool {
        self.unresolved == 0
    }

    pub fn is_suspect(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Aggregate counts behind `progress()`.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub total_files: usize,
    pub resolved_files: usize,
    pub total_conflicts: usize,
    pub resolved_conflicts: usize,
    /// `resolved_files / total_files`, in `[0, 1]`.
    pub ratio: f64,
}

/// Serializable snapshot of a whole session, consumed by the output writers.
#[derive(Debug, Serialize, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub created_at: String,
    pub generated_at: String,
    pub state: SessionState,
    pub focused: Option<FilePath>,
    pub progress: ProgressReport,
    pub can_commit: bool,
    pub files: Vec<FileSummary>,
}

impl SessionReport {
    pub fn new(
        session_id: &str,
        created_at: &str,
        state: SessionState,
        focused: Option<FilePath>,
        files: Vec<FileSummary>,
    ) -> Self {
        let total_files = files.len();
        let resolved_files = files.iter().filter(|f| f.is_resolved()).count();
        let total_conflicts: usize = files.iter().map(|f| f.conflicts).sum();
        let resolved_conflicts: usize = files.iter().map(|f| f.resolved).sum();

        SessionReport {
            session_id: session_id.to_string(),
            created_at: created_at.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            state,
            focused,
            progress: ProgressReport {
                total_files,
                resolved_files,
                total_conflicts,
                resolved_conflicts,
                ratio: ratio(resolved_files, total_files),
            },
            can_commit: state == SessionState::Active
                && total_files > 0
                && resolved_files == total_files,
            files,
        }
    }
}

/// `part / total`, clamped to `[0, 1]`; an empty total counts as done.
pub fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (part as f64 / total as f64).clamp(0.0, 1.0)
}
