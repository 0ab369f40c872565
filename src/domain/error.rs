//! Error and warning types for the resolution engine.
//!
//! Two families are kept apart: [`ParseWarning`] says the source
//! file is suspect ("fix your source"), while [`SessionError::UnresolvedFilesRemain`]
//! says the user is not done yet ("finish resolving first"). Invalid segment
//! addressing is a caller bug and gets its own [`ResolutionError`].

use serde::Serialize;
use thiserror::Error;

use crate::domain::lifecycle::SessionState;
use crate::domain::value_objects::{FilePath, SegmentId};

// ---------------------------------------------------------------------------
// Parse warnings
// ---------------------------------------------------------------------------

/// Non-fatal finding from the parser. The file still parses; the block
/// concerned is kept as a best-effort conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number of the marker that opened the offending block.
    pub line: usize,
    pub segment: SegmentId,
    pub kind: MalformedKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedKind {
    /// End of file reached with the block still open.
    Unterminated,
    /// Closing marker found before any `=======`.
    MissingSeparator,
    /// A new `<<<<<<<` opened while the previous block was still open.
    NestedOpen,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            MalformedKind::Unterminated => "conflict block is never closed",
            MalformedKind::MissingSeparator => "conflict block has no ======= separator",
            MalformedKind::NestedOpen => "conflict block interrupted by another <<<<<<< marker",
        };
        write!(f, "malformed conflict at line {}: {}", self.line, what)
    }
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Invalid addressing of a segment. Always a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("segment {0} not found")]
    SegmentNotFound(SegmentId),

    #[error("segment {0} is plain text, not a conflict")]
    InvalidSegmentKind(SegmentId),
}

// ---------------------------------------------------------------------------
// File session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileSessionError {
    #[error("{path}: {source}")]
    Resolution {
        path: FilePath,
        #[source]
        source: ResolutionError,
    },

    /// `render_final` called while conflicts remain and no override is set.
    #[error("{path} still has {unresolved} unresolved conflict(s)")]
    NotResolved { path: FilePath, unresolved: usize },
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a resolution session needs at least one file")]
    EmptyFileList,

    #[error("file {0} was given more than once")]
    DuplicatePath(FilePath),

    #[error("file {0} is not part of this session")]
    UnknownFile(FilePath),

    #[error("session is {0}, expected active")]
    NotActive(SessionState),

    /// Commit refused: these files still have unresolved conflicts.
    #[error("{} file(s) still unresolved: {}", .0.len(), join_paths(.0))]
    UnresolvedFilesRemain(Vec<FilePath>),

    #[error(transparent)]
    File(#[from] FileSessionError),

    /// The commit store failed. The session is active again; retry or abort.
    #[error("commit failed, session is active again: {0:#}")]
    Storage(anyhow::Error),

    /// The merge suggester failed. The segment was left untouched.
    #[error("merge suggestion failed: {0:#}")]
    Suggestion(anyhow::Error),

    /// The segment was resolved or undone while its suggestion was being
    /// computed. The answer was dropped and the newer choice kept.
    #[error("segment {segment} of {path} changed while a suggestion was pending")]
    StaleSuggestion { path: FilePath, segment: SegmentId },
}

impl SessionError {
    /// Conditions the user can act on (as opposed to caller bugs).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::UnresolvedFilesRemain(_)
                | SessionError::Storage(_)
                | SessionError::Suggestion(_)
                | SessionError::StaleSuggestion { .. }
        )
    }
}

fn join_paths(paths: &[FilePath]) -> String {
    paths
        .iter()
        .map(FilePath::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
