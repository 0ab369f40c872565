use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::file_session::FileConflictSession;
use crate::domain::error::SessionError;
use crate::domain::lifecycle::{SessionOutcome, SessionState};
use crate::domain::ports::{CommitStore, ResolvedFile};
use crate::domain::report::{ratio, ProgressReport, SessionReport};
use crate::domain::segment::Resolution;
use crate::domain::value_objects::{FilePath, SegmentId};

// ─────────────────────────────────────────────────────────────────────────────
// MultiFileResolutionSession
// ─────────────────────────────────────────────────────────────────────────────

/// The resolution workspace: every conflicted file of one merge/rebase.
///
/// # Lifecycle
/// ```text
/// Active ──commit()──▶ Committing ──store ok──▶ Closed
///   │  ▲                  │
///   │  └───store failed───┘
///   └──abort()──▶ Aborted ──▶ Closed
/// ```
/// File-level mutation is only accepted while `Active`. Closing (either way)
/// discards the in-memory file sessions.
///
/// # Commit gate
/// `commit()` only proceeds when every file reports `is_resolved()`. It takes
/// one snapshot of all rendered files and hands it to the [`CommitStore`] in
/// a single call. Holding `&mut self` across that call is what keeps a
/// concurrent resolve/undo from racing with the snapshot; use
/// [`crate::application::handle::SessionHandle`] to share a session.
#[derive(Debug)]
pub struct MultiFileResolutionSession {
    session_id: String,
    created_at: String,
    files: Vec<FileConflictSession>,
    focused: usize,
    state: SessionState,
    outcome: Option<SessionOutcome>,
}

impl MultiFileResolutionSession {
    /// Open one [`FileConflictSession`] per `(path, raw_text)` entry.
    ///
    /// Rejects an empty list and duplicate paths. Focus starts on the first
    /// file.
    pub fn open<I, P, R>(files: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: AsRef<str>,
    {
        let mut sessions: Vec<FileConflictSession> = Vec::new();
        for (path, raw) in files {
            let file = FileConflictSession::open(path, raw.as_ref());
            if sessions.iter().any(|f| f.path() == file.path()) {
                return Err(SessionError::DuplicatePath(file.path().clone()));
            }
            sessions.push(file);
        }
        if sessions.is_empty() {
            return Err(SessionError::EmptyFileList);
        }

        let session = Self {
            session_id: format!(
                "rs_{}_{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                Uuid::new_v4().simple()
            ),
            created_at: Utc::now().to_rfc3339(),
            files: sessions,
            focused: 0,
            state: SessionState::Active,
            outcome: None,
        };

        info!(
            session = %session.session_id,
            files = session.files.len(),
            conflicts = session.files.iter().map(|f| f.conflict_count()).sum::<usize>(),
            "resolution session opened"
        );
        Ok(session)
    }

    // ─── Focus ───────────────────────────────────────────────────────────────

    /// Change the focused file. No resolution side effect.
    pub fn select_file(&mut self, path: &str) -> Result<(), SessionError> {
        self.focused = self.index_of(path)?;
        Ok(())
    }

    /// The focused file, `None` once the session is closed.
    pub fn focused(&self) -> Option<&FileConflictSession> {
        self.files.get(self.focused)
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    pub fn files(&self) -> &[FileConflictSession] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&FileConflictSession> {
        self.files.iter().find(|f| f.path().as_str() == path)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// How the session ended, once `Closed`.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// `resolved_files / total_files`, always in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let resolved = self.files.iter().filter(|f| f.is_resolved()).count();
        ratio(resolved, self.files.len())
    }

    pub fn progress_report(&self) -> ProgressReport {
        self.report().progress
    }

    /// `true` iff the session is still active and every file is resolved.
    pub fn can_commit(&self) -> bool {
        self.state == SessionState::Active && self.files.iter().all(|f| f.is_resolved())
    }

    /// Paths of files with conflicts still open, in session order.
    pub fn unresolved_files(&self) -> Vec<FilePath> {
        self.files
            .iter()
            .filter(|f| !f.is_resolved())
            .map(|f| f.path().clone())
            .collect()
    }

    /// Files the parser flagged as malformed somewhere.
    pub fn suspect_files(&self) -> Vec<FilePath> {
        self.files
            .iter()
            .filter(|f| f.is_suspect())
            .map(|f| f.path().clone())
            .collect()
    }

    pub fn report(&self) -> SessionReport {
        SessionReport::new(
            &self.session_id,
            &self.created_at,
            self.state,
            self.focused().map(|f| f.path().clone()),
            self.files.iter().map(|f| f.summary()).collect(),
        )
    }

    // ─── Mutations (Active only) ─────────────────────────────────────────────

    pub fn resolve(
        &mut self,
        path: &str,
        id: SegmentId,
        resolution: Resolution,
    ) -> Result<(), SessionError> {
        self.file_mut(path)?.resolve(id, resolution)?;
        Ok(())
    }

    /// Apply one strategy to every conflict of every file.
    pub fn resolve_everywhere(&mut self, resolution: &Resolution) -> Result<(), SessionError> {
        self.ensure_active()?;
        for file in &mut self.files {
            file.resolve_all(resolution)?;
        }
        Ok(())
    }

    pub fn undo(&mut self, path: &str, id: SegmentId) -> Result<(), SessionError> {
        self.file_mut(path)?.undo(id)?;
        Ok(())
    }

    /// Whole-file override for one file; see
    /// [`FileConflictSession::mark_whole_file_resolved`].
    pub fn mark_file_resolved(&mut self, path: &str) -> Result<(), SessionError> {
        self.file_mut(path)?.mark_whole_file_resolved();
        Ok(())
    }

    // ─── Transitions ─────────────────────────────────────────────────────────

    /// Render every file and hand the result to `store` in one call.
    ///
    /// - not `Active` → [`SessionError::NotActive`]
    /// - unresolved files → [`SessionError::UnresolvedFilesRemain`], nothing
    ///   changes and the store is not called
    /// - store fails → back to `Active`, [`SessionError::Storage`]; no retry
    /// - store succeeds → `Closed`
    #[instrument(name = "commit", skip_all, fields(session = %self.session_id, files = self.files.len()), level = "info")]
    pub async fn commit(&mut self, store: &dyn CommitStore) -> Result<(), SessionError> {
        self.ensure_active()?;
        if !self.can_commit() {
            let remaining = self.unresolved_files();
            warn!(remaining = remaining.len(), "commit refused, files still unresolved");
            return Err(SessionError::UnresolvedFilesRemain(remaining));
        }

        self.state = SessionState::Committing;
        let snapshot = match self.snapshot() {
            Ok(files) => files,
            Err(e) => {
                self.state = SessionState::Active;
                return Err(e);
            }
        };

        match store.commit(&snapshot).await {
            Ok(()) => {
                info!(files = snapshot.len(), "resolution committed");
                self.close(SessionOutcome::Committed);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "commit store failed, session active again");
                self.state = SessionState::Active;
                Err(SessionError::Storage(e))
            }
        }
    }

    /// Drop every in-memory resolution without touching storage.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.state = SessionState::Aborted;
        info!(session = %self.session_id, files = self.files.len(), "resolution session aborted");
        self.close(SessionOutcome::Aborted);
        Ok(())
    }

    // ─── Private helpers ─────────────────────────────────────────────────────

    fn snapshot(&self) -> Result<Vec<ResolvedFile>, SessionError> {
        self.files
            .iter()
            .map(|f| {
                Ok(ResolvedFile {
                    path: f.path().clone(),
                    content: f.render_final()?,
                    source_fingerprint: f.fingerprint().clone(),
                    overridden: f.is_overridden(),
                })
            })
            .collect()
    }

    fn close(&mut self, outcome: SessionOutcome) {
        self.files.clear();
        self.focused = 0;
        self.outcome = Some(outcome);
        self.state = SessionState::Closed;
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            other => Err(SessionError::NotActive(other)),
        }
    }

    fn index_of(&self, path: &str) -> Result<usize, SessionError> {
        self.files
            .iter()
            .position(|f| f.path().as_str() == path)
            .ok_or_else(|| SessionError::UnknownFile(FilePath::from(path)))
    }

    fn file_mut(&mut self, path: &str) -> Result<&mut FileConflictSession, SessionError> {
        self.ensure_active()?;
        let idx = self.index_of(path)?;
        Ok(&mut self.files[idx])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ONE: &str = "x\n<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> b\ny\n";
    const TWO: &str = "<<<<<<<\na\n=======\nb\n>>>>>>>\n-\n<<<<<<<\nc\n=======\nd\n>>>>>>>\n";

    /// Records every commit call; fails while `fail` is set.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Vec<ResolvedFile>>>,
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl CommitStore for RecordingStore {
        async fn commit(&self, files: &[ResolvedFile]) -> Result<()> {
            self.calls.lock().unwrap().push(files.to_vec());
            if *self.fail.lock().unwrap() {
                anyhow::bail!("disk full");
            }
            Ok(())
        }
    }

    fn two_files() -> MultiFileResolutionSession {
        MultiFileResolutionSession::open([("f1", ONE), ("f2", ONE)]).unwrap()
    }

    #[test]
    fn open_rejects_empty_list() {
        let files: Vec<(String, String)> = vec![];
        assert!(matches!(
            MultiFileResolutionSession::open(files),
            Err(SessionError::EmptyFileList)
        ));
    }

    #[test]
    fn open_rejects_duplicate_paths() {
        let err = MultiFileResolutionSession::open([("a", ONE), ("a", TWO)]).unwrap_err();
        assert!(matches!(err, SessionError::DuplicatePath(p) if p.as_str() == "a"));
    }

    #[test]
    fn focus_starts_on_first_file_and_moves() {
        let mut s = two_files();
        assert_eq!(s.focused().unwrap().path().as_str(), "f1");
        s.select_file("f2").unwrap();
        assert_eq!(s.focused().unwrap().path().as_str(), "f2");
        assert!(matches!(
            s.select_file("nope"),
            Err(SessionError::UnknownFile(_))
        ));
        assert_eq!(s.focused().unwrap().path().as_str(), "f2");
        assert_eq!(s.progress(), 0.0);
    }

    #[tokio::test]
    async fn two_file_commit_blocked_then_allowed() {
        let store = RecordingStore::default();
        let mut s = two_files();
        assert!(!s.can_commit());

        s.resolve("f1", SegmentId(1), Resolution::Ours).unwrap();
        assert!(!s.can_commit());
        assert_eq!(s.progress(), 0.5);

        s.resolve("f2", SegmentId(1), Resolution::Theirs).unwrap();
        assert!(s.can_commit());
        assert_eq!(s.progress(), 1.0);

        s.commit(&store).await.unwrap();
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(s.outcome(), Some(SessionOutcome::Committed));
        assert!(s.files().is_empty());

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].content, "x\nA\ny\n");
        assert_eq!(calls[0][1].content, "x\nB\ny\n");
        assert_eq!(calls[0][1].path.as_str(), "f2");
    }

    #[tokio::test]
    async fn commit_with_unresolved_files_changes_nothing() {
        let store = RecordingStore::default();
        let mut s = two_files();
        s.resolve("f2", SegmentId(1), Resolution::Both).unwrap();

        let err = s.commit(&store).await.unwrap_err();
        match err {
            SessionError::UnresolvedFilesRemain(paths) => {
                assert_eq!(paths, vec![FilePath::from("f1")]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(s.state(), SessionState::Active);
        assert!(store.calls.lock().unwrap().is_empty());
        assert_eq!(s.files().len(), 2);
        assert!(s.file("f2").unwrap().is_resolved());
    }

    #[tokio::test]
    async fn store_failure_returns_to_active_and_keeps_state() {
        let store = RecordingStore::default();
        *store.fail.lock().unwrap() = true;

        let mut s = two_files();
        s.resolve_everywhere(&Resolution::Ours).unwrap();

        let err = s.commit(&store).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(err.is_retryable());
        assert_eq!(s.state(), SessionState::Active);
        assert!(s.can_commit());

        // retry is up to the caller
        *store.fail.lock().unwrap() = false;
        s.commit(&store).await.unwrap();
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(store.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_mutation_after_close() {
        let store = RecordingStore::default();
        let mut s = MultiFileResolutionSession::open([("clean", "no conflicts")]).unwrap();
        assert!(s.can_commit());
        s.commit(&store).await.unwrap();
        assert!(!s.can_commit());

        assert!(matches!(
            s.resolve("clean", SegmentId(0), Resolution::Ours),
            Err(SessionError::NotActive(SessionState::Closed))
        ));
        assert!(matches!(
            s.commit(&store).await,
            Err(SessionError::NotActive(SessionState::Closed))
        ));
        assert!(matches!(s.abort(), Err(SessionError::NotActive(_))));
    }

    #[test]
    fn abort_discards_everything() {
        let mut s = two_files();
        s.resolve("f1", SegmentId(1), Resolution::Ours).unwrap();
        s.abort().unwrap();
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(s.outcome(), Some(SessionOutcome::Aborted));
        assert!(s.files().is_empty());
        assert!(s.focused().is_none());
        assert!(!s.can_commit());
        assert!(matches!(
            s.undo("f1", SegmentId(1)),
            Err(SessionError::NotActive(_))
        ));
    }

    #[test]
    fn progress_moves_up_on_resolve_and_down_on_undo() {
        let mut s =
            MultiFileResolutionSession::open([("a", TWO), ("b", ONE), ("c", ONE)]).unwrap();
        let steps: [(&str, usize); 4] = [("a", 0), ("a", 2), ("b", 1), ("c", 1)];

        let mut last = s.progress();
        for (path, id) in steps {
            s.resolve(path, SegmentId(id), Resolution::Ours).unwrap();
            let now = s.progress();
            assert!(now >= last, "progress went down: {last} -> {now}");
            assert!((0.0..=1.0).contains(&now));
            last = now;
        }
        assert_eq!(last, 1.0);

        s.undo("a", SegmentId(2)).unwrap();
        let after_undo = s.progress();
        assert!(after_undo < last);
        assert!((0.0..=1.0).contains(&after_undo));
    }

    #[tokio::test]
    async fn whole_file_override_unblocks_commit() {
        let store = RecordingStore::default();
        let mut s = two_files();
        s.resolve("f1", SegmentId(1), Resolution::Ours).unwrap();
        s.mark_file_resolved("f2").unwrap();
        assert!(s.can_commit());

        s.commit(&store).await.unwrap();
        let calls = store.calls.lock().unwrap();
        assert!(!calls[0][0].overridden);
        assert!(calls[0][1].overridden);
        assert_eq!(calls[0][1].content, ONE);
    }

    #[test]
    fn report_aggregates_counts() {
        let mut s = MultiFileResolutionSession::open([("a", TWO), ("b", ONE)]).unwrap();
        s.resolve("a", SegmentId(0), Resolution::Theirs).unwrap();
        s.resolve("b", SegmentId(1), Resolution::Theirs).unwrap();

        let r = s.report();
        assert_eq!(r.progress.total_files, 2);
        assert_eq!(r.progress.resolved_files, 1);
        assert_eq!(r.progress.total_conflicts, 3);
        assert_eq!(r.progress.resolved_conflicts, 2);
        assert_eq!(r.progress.ratio, 0.5);
        assert!(!r.can_commit);
        assert_eq!(r.focused, Some(FilePath::from("a")));
        assert_eq!(s.unresolved_files(), vec![FilePath::from("a")]);
    }

    #[test]
    fn suspect_files_are_listed_separately() {
        let s = MultiFileResolutionSession::open([("ok", ONE), ("bad", "<<<<<<<\nx")]).unwrap();
        assert_eq!(s.suspect_files(), vec![FilePath::from("bad")]);
    }
}
