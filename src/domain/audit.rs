use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::segment::ResolutionKind;
use crate::domain::value_objects::SegmentId;

/// One entry of a file's resolution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    /// `None` for whole-file actions.
    pub segment: Option<SegmentId>,
    pub action: AuditAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    Resolved { via: ResolutionKind },
    Undone,
    /// The whole file was declared resolved while `unresolved_segments`
    /// conflicts were still open. Those blocks are committed as their
    /// re-serialised marker form.
    WholeFileOverride { unresolved_segments: usize },
}

impl AuditEntry {
    pub fn now(segment: Option<SegmentId>, action: AuditAction) -> Self {
        Self {
            at: Utc::now(),
            segment,
            action,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self.action, AuditAction::WholeFileOverride { .. })
    }
}
