use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::application::session::MultiFileResolutionSession;
use crate::domain::error::SessionError;
use crate::domain::lifecycle::SessionState;
use crate::domain::ports::{MergeSuggester, SuggestionRequest};
use crate::domain::segment::{ConflictStatus, Resolution};
use crate::domain::value_objects::SegmentId;

/// Build the suggester input for one conflict of one file.
///
/// Labels and the file extension go into `context`; suggesters are free to
/// ignore them.
pub fn request_for(
    session: &MultiFileResolutionSession,
    path: &str,
    id: SegmentId,
) -> Result<SuggestionRequest, SessionError> {
    let file = session
        .file(path)
        .ok_or_else(|| SessionError::UnknownFile(path.into()))?;
    let block = file.conflict(id)?;

    let mut context = BTreeMap::new();
    if let Some(label) = &block.ours_label {
        context.insert("ours_label".to_string(), label.clone());
    }
    if let Some(label) = &block.theirs_label {
        context.insert("theirs_label".to_string(), label.clone());
    }
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        context.insert("extension".to_string(), ext.to_string());
    }

    Ok(SuggestionRequest {
        path: file.path().clone(),
        segment: id,
        ours: block.ours.clone(),
        theirs: block.theirs.clone(),
        base: block.base.clone(),
        context,
    })
}

/// A suggestion request plus the state of its segment when it was built.
#[derive(Debug, Clone)]
pub struct PendingSuggestion {
    pub request: SuggestionRequest,
    seen: ConflictStatus,
}

/// Build a request for one conflict and remember the segment's status.
pub fn prepare_suggestion(
    session: &MultiFileResolutionSession,
    path: &str,
    id: SegmentId,
) -> Result<PendingSuggestion, SessionError> {
    let request = request_for(session, path, id)?;
    let seen = conflict_status(session, path, id)?;
    Ok(PendingSuggestion { request, seen })
}

/// Apply a suggester's answer with `resolve_with_supplied`.
///
/// Fails with [`SessionError::Suggestion`] when the suggester failed and with
/// [`SessionError::StaleSuggestion`] when the segment changed since
/// [`prepare_suggestion`]. In both cases the segment is left as it is.
pub fn apply_suggestion(
    session: &mut MultiFileResolutionSession,
    pending: &PendingSuggestion,
    answer: Result<String>,
) -> Result<(), SessionError> {
    let path = pending.request.path.as_str();
    let id = pending.request.segment;

    let text = match answer {
        Ok(text) => text,
        Err(e) => {
            warn!(path, segment = %id, error = %e, "merge suggestion failed, segment left unresolved");
            return Err(SessionError::Suggestion(e));
        }
    };

    if session.state() != SessionState::Active {
        return Err(SessionError::NotActive(session.state()));
    }
    if conflict_status(session, path, id)? != pending.seen {
        warn!(path, segment = %id, "segment changed while the suggestion was computed, answer dropped");
        return Err(SessionError::StaleSuggestion {
            path: pending.request.path.clone(),
            segment: id,
        });
    }

    info!(path, segment = %id, bytes = text.len(), "applying merge suggestion");
    session.resolve(path, id, Resolution::Supplied(text))
}

/// Ask `suggester` for a merge and apply it with `resolve_with_supplied`.
///
/// On suggester failure the segment is left exactly as it was and
/// [`SessionError::Suggestion`] is returned. See [`apply_suggestion`] for
/// answers that arrive after the segment changed.
pub async fn resolve_with_suggestion(
    session: &mut MultiFileResolutionSession,
    path: &str,
    id: SegmentId,
    suggester: &dyn MergeSuggester,
) -> Result<(), SessionError> {
    let pending = prepare_suggestion(session, path, id)?;
    let answer = suggester.suggest(&pending.request).await;
    apply_suggestion(session, &pending, answer)
}

fn conflict_status(
    session: &MultiFileResolutionSession,
    path: &str,
    id: SegmentId,
) -> Result<ConflictStatus, SessionError> {
    let file = session
        .file(path)
        .ok_or_else(|| SessionError::UnknownFile(path.into()))?;
    Ok(file.conflict(id)?.status.clone())
}

// ─── ConcatSuggester ─────────────────────────────────────────────────────────

/// Offline suggester: both sides, ours first, blank-line trimmed at the seam.
///
/// Stands in for a real model-backed suggester and doubles as a sensible
/// default for append-only files (changelogs, lists of imports).
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcatSuggester;

#[async_trait]
impl MergeSuggester for ConcatSuggester {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<String> {
        let ours = request.ours.trim_end_matches('\n');
        let theirs = request.theirs.trim_start_matches('\n');
        Ok(match (ours.is_empty(), theirs.is_empty()) {
            (true, _) => theirs.to_string(),
            (_, true) => ours.to_string(),
            _ => format!("{ours}\n{theirs}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::ResolutionKind;

    const RAW: &str = "use a;\n<<<<<<< HEAD\nuse b;\n=======\nuse c;\n>>>>>>> feature\nfn main() {}\n";

    struct FailingSuggester;

    #[async_trait]
    impl MergeSuggester for FailingSuggester {
        async fn suggest(&self, _request: &SuggestionRequest) -> Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    fn session() -> MultiFileResolutionSession {
        MultiFileResolutionSession::open([("src/main.rs", RAW)]).unwrap()
    }

    #[test]
    fn request_carries_sides_and_context() {
        let s = session();
        let req = request_for(&s, "src/main.rs", SegmentId(1)).unwrap();
        assert_eq!(req.ours, "use b;");
        assert_eq!(req.theirs, "use c;");
        assert_eq!(req.context["ours_label"], "HEAD");
        assert_eq!(req.context["theirs_label"], "feature");
        assert_eq!(req.context["extension"], "rs");
    }

    #[test]
    fn request_for_plain_text_is_rejected() {
        let s = session();
        assert!(matches!(
            request_for(&s, "src/main.rs", SegmentId(0)),
            Err(SessionError::File(_))
        ));
    }

    #[tokio::test]
    async fn suggestion_is_applied_as_supplied_text() {
        let mut s = session();
        resolve_with_suggestion(&mut s, "src/main.rs", SegmentId(1), &ConcatSuggester)
            .await
            .unwrap();

        let file = s.file("src/main.rs").unwrap();
        assert!(file.is_resolved());
        assert_eq!(
            file.render_final().unwrap(),
            "use a;\nuse b;\nuse c;\nfn main() {}\n"
        );
        let block = file.conflict(SegmentId(1)).unwrap();
        assert!(matches!(
            block.status,
            crate::domain::segment::ConflictStatus::Resolved {
                via: ResolutionKind::Supplied,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failed_suggestion_leaves_segment_unresolved() {
        let mut s = session();
        let before = s.file("src/main.rs").unwrap().segments().to_vec();

        let err = resolve_with_suggestion(&mut s, "src/main.rs", SegmentId(1), &FailingSuggester)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Suggestion(_)));
        let file = s.file("src/main.rs").unwrap();
        assert_eq!(file.segments(), before.as_slice());
        assert_eq!(file.unresolved_count(), 1);
        assert!(file.audit().is_empty());
    }

    #[test]
    fn answer_for_a_changed_segment_is_dropped() {
        let mut s = session();
        let pending = prepare_suggestion(&s, "src/main.rs", SegmentId(1)).unwrap();
        s.resolve("src/main.rs", SegmentId(1), Resolution::Theirs)
            .unwrap();

        let err = apply_suggestion(&mut s, &pending, Ok("use d;".into())).unwrap_err();
        assert!(matches!(
            err,
            SessionError::StaleSuggestion { segment: SegmentId(1), .. }
        ));
        assert_eq!(
            s.file("src/main.rs").unwrap().render_final().unwrap(),
            "use a;\nuse c;\nfn main() {}\n"
        );
    }

    #[tokio::test]
    async fn concat_skips_empty_side() {
        let req = SuggestionRequest {
            path: "x".into(),
            segment: SegmentId(0),
            ours: String::new(),
            theirs: "only theirs".into(),
            base: None,
            context: BTreeMap::new(),
        };
        assert_eq!(ConcatSuggester.suggest(&req).await.unwrap(), "only theirs");
    }
}
