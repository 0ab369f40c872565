use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::application::session::MultiFileResolutionSession;
use crate::application::suggestion::{apply_suggestion, prepare_suggestion};
use crate::domain::error::SessionError;
use crate::domain::ports::{CommitStore, MergeSuggester};
use crate::domain::report::SessionReport;
use crate::domain::segment::Resolution;
use crate::domain::value_objects::SegmentId;

/// Shareable, serialised access to one [`MultiFileResolutionSession`].
///
/// Every call takes the same async mutex, so a `commit()` snapshot can never
/// interleave with a `resolve()` or `undo()` from another task. The lock is
/// held for the whole commit, store call included.
///
/// Merge suggestions are the exception: the request is built under the lock,
/// the suggester runs without it, and the answer is applied under the lock
/// again. If the segment was resolved or undone in between, the answer is
/// dropped with [`SessionError::StaleSuggestion`]; if the session closed,
/// applying it fails like any other resolve would.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<MultiFileResolutionSession>>,
}

impl SessionHandle {
    pub fn new(session: MultiFileResolutionSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Direct access for read-heavy callers (rendering a UI frame, say).
    pub async fn lock(&self) -> MutexGuard<'_, MultiFileResolutionSession> {
        self.inner.lock().await
    }

    pub async fn resolve(
        &self,
        path: &str,
        id: SegmentId,
        resolution: Resolution,
    ) -> Result<(), SessionError> {
        self.inner.lock().await.resolve(path, id, resolution)
    }

    pub async fn undo(&self, path: &str, id: SegmentId) -> Result<(), SessionError> {
        self.inner.lock().await.undo(path, id)
    }

    pub async fn mark_file_resolved(&self, path: &str) -> Result<(), SessionError> {
        self.inner.lock().await.mark_file_resolved(path)
    }

    pub async fn select_file(&self, path: &str) -> Result<(), SessionError> {
        self.inner.lock().await.select_file(path)
    }

    pub async fn progress(&self) -> f64 {
        self.inner.lock().await.progress()
    }

    pub async fn can_commit(&self) -> bool {
        self.inner.lock().await.can_commit()
    }

    pub async fn report(&self) -> SessionReport {
        self.inner.lock().await.report()
    }

    pub async fn commit(&self, store: &dyn CommitStore) -> Result<(), SessionError> {
        let mut session = self.inner.lock().await;
        session.commit(store).await
    }

    pub async fn abort(&self) -> Result<(), SessionError> {
        self.inner.lock().await.abort()
    }

    /// Same as [`crate::application::suggestion::resolve_with_suggestion`],
    /// without holding the lock while the suggester runs.
    pub async fn resolve_with_suggestion(
        &self,
        path: &str,
        id: SegmentId,
        suggester: &dyn MergeSuggester,
    ) -> Result<(), SessionError> {
        let pending = {
            let session = self.inner.lock().await;
            prepare_suggestion(&session, path, id)?
        };
        let answer = suggester.suggest(&pending.request).await;
        apply_suggestion(&mut *self.inner.lock().await, &pending, answer)
    }
}
