use tracing::{info, warn};

use crate::application::parser::ConflictParser;
use crate::application::render::render;
use crate::application::resolution;
use crate::domain::audit::{AuditAction, AuditEntry};
use crate::domain::error::{FileSessionError, ParseWarning, ResolutionError};
use crate::domain::fingerprint::fingerprint;
use crate::domain::markers::LineEnding;
use crate::domain::report::FileSummary;
use crate::domain::segment::{ConflictBlock, Resolution, Segment};
use crate::domain::value_objects::{FilePath, Fingerprint, SegmentId};

// ─────────────────────────────────────────────────────────────────────────────
// FileConflictSession
// ─────────────────────────────────────────────────────────────────────────────

/// One conflicted file under resolution.
///
/// Owns the parsed segments and keeps `unresolved_count` in step with them
/// after every operation. The file counts as resolved iff
/// `unresolved_count() == 0`.
///
/// `mark_whole_file_resolved` is an escape hatch: it forces the count to zero
/// without touching any segment, and is recorded as a distinct
/// [`AuditAction::WholeFileOverride`]. Any later per-segment resolve or undo
/// drops the override and the count is derived from the segments again.
#[derive(Debug, Clone)]
pub struct FileConflictSession {
    path: FilePath,
    segments: Vec<Segment>,
    warnings: Vec<ParseWarning>,
    line_ending: LineEnding,
    fingerprint: Fingerprint,
    unresolved_count: usize,
    overridden: bool,
    audit: Vec<AuditEntry>,
}

impl FileConflictSession {
    /// Parse `raw_text` and start with every conflict unresolved.
    pub fn open(path: impl Into<String>, raw_text: &str) -> Self {
        let path = FilePath(path.into());
        let doc = ConflictParser::new().parse(raw_text);
        let unresolved_count = resolution::unresolved_count(&doc.segments);

        for w in &doc.warnings {
            warn!(path = %path, line = w.line, kind = ?w.kind, "file marked suspect");
        }
        info!(path = %path, conflicts = unresolved_count, "file opened for resolution");

        Self {
            path,
            segments: doc.segments,
            warnings: doc.warnings,
            line_ending: doc.line_ending,
            fingerprint: fingerprint(raw_text),
            unresolved_count,
            overridden: false,
            audit: Vec::new(),
        }
    }

    /// Apply a strategy to one conflict segment.
    pub fn resolve(
        &mut self,
        id: SegmentId,
        resolution: Resolution,
    ) -> Result<(), FileSessionError> {
        let resolution = match (resolution, self.line_ending) {
            // supplied text joins the document's internal `\n` convention
            (Resolution::Supplied(text), LineEnding::CrLf) => {
                Resolution::Supplied(text.replace("\r\n", "\n"))
            }
            (other, _) => other,
        };
        let via = resolution.kind();

        resolution::apply(&mut self.segments, id, &resolution).map_err(|e| self.wrap(e))?;
        self.after_segment_change(id, AuditAction::Resolved { via });
        Ok(())
    }

    pub fn resolve_with_ours(&mut self, id: SegmentId) -> Result<(), FileSessionError> {
        self.resolve(id, Resolution::Ours)
    }

    pub fn resolve_with_theirs(&mut self, id: SegmentId) -> Result<(), FileSessionError> {
        self.resolve(id, Resolution::Theirs)
    }

    pub fn resolve_with_both(&mut self, id: SegmentId) -> Result<(), FileSessionError> {
        self.resolve(id, Resolution::Both)
    }

    pub fn resolve_with_supplied(
        &mut self,
        id: SegmentId,
        text: impl Into<String>,
    ) -> Result<(), FileSessionError> {
        self.resolve(id, Resolution::Supplied(text.into()))
    }

    /// Apply the same strategy to every conflict, resolved or not.
    pub fn resolve_all(&mut self, resolution: &Resolution) -> Result<(), FileSessionError> {
        for id in self.conflict_ids() {
            self.resolve(id, resolution.clone())?;
        }
        Ok(())
    }

    /// Return one segment to `Unresolved`.
    pub fn undo(&mut self, id: SegmentId) -> Result<(), FileSessionError> {
        resolution::undo(&mut self.segments, id).map_err(|e| self.wrap(e))?;
        self.after_segment_change(id, AuditAction::Undone);
        Ok(())
    }

    /// Declare the file resolved as-is.
    ///
    /// Segment states are left alone, so any still-unresolved block is
    /// committed in its marker form.
    pub fn mark_whole_file_resolved(&mut self) {
        let unresolved_segments = resolution::unresolved_count(&self.segments);
        warn!(
            path = %self.path,
            unresolved_segments,
            "whole file marked resolved by override"
        );
        self.overridden = true;
        self.unresolved_count = 0;
        self.audit.push(AuditEntry::now(
            None,
            AuditAction::WholeFileOverride {
                unresolved_segments,
            },
        ));
    }

    /// Final text for write-back. Fails while conflicts remain, unless the
    /// whole-file override is set.
    pub fn render_final(&self) -> Result<String, FileSessionError> {
        if !self.is_resolved() {
            return Err(FileSessionError::NotResolved {
                path: self.path.clone(),
                unresolved: self.unresolved_count,
            });
        }
        Ok(render(&self.segments, self.line_ending))
    }

    /// Live preview; unresolved blocks appear in marker form. Never commit this.
    pub fn render_preview(&self) -> String {
        render(&self.segments, self.line_ending)
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved_count == 0
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved_count
    }

    pub fn conflict_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_conflict()).count()
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Look up one conflict block.
    pub fn conflict(&self, id: SegmentId) -> Result<&ConflictBlock, FileSessionError> {
        resolution::conflict(&self.segments, id).map_err(|e| self.wrap(e))
    }

    /// Ids of all conflict segments, in source order.
    pub fn conflict_ids(&self) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|s| s.is_conflict())
            .map(|s| s.id)
            .collect()
    }

    /// Ids of the conflicts still waiting for a decision.
    pub fn unresolved_ids(&self) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|s| s.is_unresolved())
            .map(|s| s.id)
            .collect()
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// The parser had to guess somewhere in this file.
    pub fn is_suspect(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn summary(&self) -> FileSummary {
        let conflicts = self.conflict_count();
        let still_open = resolution::unresolved_count(&self.segments);
        FileSummary {
            path: self.path.clone(),
            conflicts,
            resolved: conflicts - still_open,
            unresolved: self.unresolved_count,
            overridden: self.overridden,
            warnings: self.warnings.clone(),
            audit: self.audit.clone(),
        }
    }

    fn after_segment_change(&mut self, id: SegmentId, action: AuditAction) {
        if self.overridden {
            info!(path = %self.path, "per-segment change clears whole-file override");
            self.overridden = false;
        }
        self.unresolved_count = resolution::unresolved_count(&self.segments);
        self.audit.push(AuditEntry::now(Some(id), action));
    }

    fn wrap(&self, source: ResolutionError) -> FileSessionError {
        FileSessionError::Resolution {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::ResolutionKind;

    const SINGLE: &str = "line1\n<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\nline2";
    const TWO: &str = "<<<<<<<\na\n=======\nb\n>>>>>>>\nmid\n<<<<<<<\nc\n=======\nd\n>>>>>>>\n";

    #[test]
    fn open_counts_conflicts() {
        let f = FileConflictSession::open("src/lib.rs", TWO);
        assert_eq!(f.unresolved_count(), 2);
        assert_eq!(f.conflict_count(), 2);
        assert_eq!(f.conflict_ids(), vec![SegmentId(0), SegmentId(2)]);
        assert!(!f.is_resolved());
        assert_eq!(f.fingerprint(), &fingerprint(TWO));
    }

    #[test]
    fn file_without_conflicts_is_resolved_immediately() {
        let f = FileConflictSession::open("README.md", "nothing to see\n");
        assert!(f.is_resolved());
        assert_eq!(f.render_final().unwrap(), "nothing to see\n");
    }

    #[test]
    fn accept_ours_then_render_final() {
        let mut f = FileConflictSession::open("a.txt", SINGLE);
        f.resolve_with_ours(SegmentId(1)).unwrap();
        assert!(f.is_resolved());
        assert_eq!(f.render_final().unwrap(), "line1\nA\nline2");
    }

    #[test]
    fn blank_line_side_reaches_the_committed_text() {
        let raw = "x\n<<<<<<< HEAD\n\n=======\nB\n>>>>>>> b\ny";
        let mut f = FileConflictSession::open("p", raw);
        assert_eq!(f.render_preview(), raw);

        f.resolve_with_ours(SegmentId(1)).unwrap();
        assert_eq!(f.render_final().unwrap(), "x\n\ny");

        f.undo(SegmentId(1)).unwrap();
        assert_eq!(f.render_preview(), raw);
    }

    #[test]
    fn render_final_refuses_unresolved_file() {
        let f = FileConflictSession::open("a.txt", SINGLE);
        assert_eq!(
            f.render_final(),
            Err(FileSessionError::NotResolved {
                path: FilePath::from("a.txt"),
                unresolved: 1
            })
        );
        // the preview is always available
        assert_eq!(f.render_preview(), SINGLE);
    }

    #[test]
    fn undo_recomputes_count() {
        let mut f = FileConflictSession::open("x", TWO);
        f.resolve_with_theirs(SegmentId(0)).unwrap();
        f.resolve_with_both(SegmentId(2)).unwrap();
        assert_eq!(f.unresolved_count(), 0);
        f.undo(SegmentId(2)).unwrap();
        assert_eq!(f.unresolved_count(), 1);
        assert_eq!(f.unresolved_ids(), vec![SegmentId(2)]);
    }

    #[test]
    fn errors_carry_the_path() {
        let mut f = FileConflictSession::open("x", SINGLE);
        let err = f.resolve_with_ours(SegmentId(0)).unwrap_err();
        assert_eq!(
            err,
            FileSessionError::Resolution {
                path: FilePath::from("x"),
                source: ResolutionError::InvalidSegmentKind(SegmentId(0)),
            }
        );
        assert!(f.audit().is_empty());
        assert_eq!(f.unresolved_count(), 1);
    }

    #[test]
    fn whole_file_override_is_audited_and_leaves_segments_alone() {
        let mut f = FileConflictSession::open("x", SINGLE);
        let before = f.segments().to_vec();

        f.mark_whole_file_resolved();

        assert!(f.is_resolved());
        assert!(f.is_overridden());
        assert_eq!(f.segments(), before.as_slice());
        assert_eq!(f.render_final().unwrap(), SINGLE);

        let last = f.audit().last().unwrap();
        assert!(last.is_override());
        assert_eq!(
            last.action,
            AuditAction::WholeFileOverride {
                unresolved_segments: 1
            }
        );
        assert_eq!(last.segment, None);
    }

    #[test]
    fn segment_change_after_override_restores_counting() {
        let mut f = FileConflictSession::open("x", TWO);
        f.mark_whole_file_resolved();
        f.resolve_with_ours(SegmentId(0)).unwrap();
        assert!(!f.is_overridden());
        assert_eq!(f.unresolved_count(), 1);
    }

    #[test]
    fn audit_records_each_step_in_order() {
        let mut f = FileConflictSession::open("x", SINGLE);
        f.resolve_with_ours(SegmentId(1)).unwrap();
        f.undo(SegmentId(1)).unwrap();
        f.resolve_with_supplied(SegmentId(1), "AB").unwrap();

        let actions: Vec<_> = f.audit().iter().map(|e| e.action.clone()).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Resolved {
                    via: ResolutionKind::Ours
                },
                AuditAction::Undone,
                AuditAction::Resolved {
                    via: ResolutionKind::Supplied
                },
            ]
        );
        assert!(f.audit().iter().all(|e| e.segment == Some(SegmentId(1))));
    }

    #[test]
    fn supplied_text_follows_crlf_convention() {
        let raw = "a\r\n<<<<<<< HEAD\r\nA\r\n=======\r\nB\r\n>>>>>>> b\r\n";
        let mut f = FileConflictSession::open("win.txt", raw);
        f.resolve_with_supplied(SegmentId(1), "X\r\nY").unwrap();
        assert_eq!(f.render_final().unwrap(), "a\r\nX\r\nY\r\n");
    }

    #[test]
    fn resolve_all_applies_everywhere() {
        let mut f = FileConflictSession::open("x", TWO);
        f.resolve_all(&Resolution::Theirs).unwrap();
        assert_eq!(f.render_final().unwrap(), "b\nmid\nd\n");
    }

    #[test]
    fn summary_distinguishes_override_from_resolution() {
        let mut f = FileConflictSession::open("x", TWO);
        f.resolve_with_ours(SegmentId(0)).unwrap();
        f.mark_whole_file_resolved();
        let s = f.summary();
        assert_eq!(s.conflicts, 2);
        assert_eq!(s.resolved, 1);
        assert_eq!(s.unresolved, 0);
        assert!(s.overridden);
        assert!(s.is_resolved());
    }

    #[test]
    fn malformed_file_is_suspect() {
        let f = FileConflictSession::open("bad", "<<<<<<< HEAD\nx");
        assert!(f.is_suspect());
        assert_eq!(f.warnings().len(), 1);
    }
}
