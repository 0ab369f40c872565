use tracing::{debug, error};

use crate::domain::error::ResolutionError;
use crate::domain::segment::{ConflictBlock, ConflictStatus, Resolution, Segment, SegmentKind};
use crate::domain::value_objects::SegmentId;

// ─────────────────────────────────────────────────────────────────────────────
// Segment resolution state machine
// ─────────────────────────────────────────────────────────────────────────────
//
//   Unresolved ──resolve──▶ Resolved(text) ──resolve──▶ Resolved(text')
//        ▲                        │
//        └──────────undo──────────┘
//
// Plain-text segments have no state machine: every operation here rejects
// them. `ours`/`theirs`/`base` are read, never written.

/// Resolve with our side.
pub fn resolve_with_ours(segments: &mut [Segment], id: SegmentId) -> Result<(), ResolutionError> {
    apply(segments, id, &Resolution::Ours)
}

/// Resolve with their side.
pub fn resolve_with_theirs(
    segments: &mut [Segment],
    id: SegmentId,
) -> Result<(), ResolutionError> {
    apply(segments, id, &Resolution::Theirs)
}

/// Resolve with the lines of ours followed by the lines of theirs.
pub fn resolve_with_both(segments: &mut [Segment], id: SegmentId) -> Result<(), ResolutionError> {
    apply(segments, id, &Resolution::Both)
}

/// Resolve with externally produced text.
pub fn resolve_with_supplied(
    segments: &mut [Segment],
    id: SegmentId,
    text: impl Into<String>,
) -> Result<(), ResolutionError> {
    apply(segments, id, &Resolution::Supplied(text.into()))
}

/// Apply any strategy. Re-resolving overwrites the previous choice.
pub fn apply(
    segments: &mut [Segment],
    id: SegmentId,
    resolution: &Resolution,
) -> Result<(), ResolutionError> {
    let block = conflict_mut(segments, id)?;
    let content = resolved_text(block, resolution);
    debug!(segment = %id, via = %resolution.kind(), bytes = content.len(), "conflict resolved");
    block.status = ConflictStatus::Resolved {
        content,
        via: resolution.kind(),
    };
    Ok(())
}

/// Back to `Unresolved`. The previous resolution text is dropped.
pub fn undo(segments: &mut [Segment], id: SegmentId) -> Result<(), ResolutionError> {
    let block = conflict_mut(segments, id)?;
    debug!(segment = %id, was_resolved = block.is_resolved(), "conflict resolution undone");
    block.status = ConflictStatus::Unresolved;
    Ok(())
}

/// Number of conflict segments without a resolution.
pub fn unresolved_count(segments: &[Segment]) -> usize {
    segments.iter().filter(|s| s.is_unresolved()).count()
}

/// The text a strategy would produce for `block`, without applying it.
pub fn resolved_text(block: &ConflictBlock, resolution: &Resolution) -> String {
    match resolution {
        Resolution::Ours => block.ours.clone(),
        Resolution::Theirs => block.theirs.clone(),
        Resolution::Both => match (block.ours_lines, block.theirs_lines) {
            (0, _) => block.theirs.clone(),
            (_, 0) => block.ours.clone(),
            _ => format!("{}\n{}", block.ours, block.theirs),
        },
        Resolution::Supplied(text) => text.clone(),
    }
}

/// Look up a conflict block for mutation.
///
/// Both failure cases are caller bugs (UI out of sync with the session), so
/// they are logged at error level on top of the typed error.
pub fn conflict_mut(
    segments: &mut [Segment],
    id: SegmentId,
) -> Result<&mut ConflictBlock, ResolutionError> {
    let Some(segment) = segments.iter_mut().find(|s| s.id == id) else {
        error!(segment = %id, "resolution addressed an unknown segment");
        return Err(ResolutionError::SegmentNotFound(id));
    };
    match &mut segment.kind {
        SegmentKind::Conflict(block) => Ok(block),
        SegmentKind::PlainText { .. } => {
            error!(segment = %id, "conflict operation on a plain-text segment");
            Err(ResolutionError::InvalidSegmentKind(id))
        }
    }
}

/// Read-only counterpart of [`conflict_mut`].
pub fn conflict(segments: &[Segment], id: SegmentId) -> Result<&ConflictBlock, ResolutionError> {
    let segment = segments
        .iter()
        .find(|s| s.id == id)
        .ok_or(ResolutionError::SegmentNotFound(id))?;
    segment
        .as_conflict()
        .ok_or(ResolutionError::InvalidSegmentKind(id))
}
