use crate::domain::report::SessionReport;
use crate::domain::value_objects::{FilePath, Fingerprint, SegmentId};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Port: supplies the conflicted files that enter a session
/// (implemented by FsTextSource).
#[async_trait]
pub trait TextSource: Send + Sync {
    /// `(path, raw_text)` pairs, in the order they should appear in the session.
    async fn load(&self) -> Result<Vec<(String, String)>>;
}

/// Port: write-back of resolved files at commit time
/// (implemented by FsCommitStore, decorated by MonitoringCommitStore).
///
/// Atomicity of the underlying write is the implementor's job. The engine
/// calls this once per commit attempt and never retries.
#[async_trait]
pub trait CommitStore: Send + Sync {
    async fn commit(&self, files: &[ResolvedFile]) -> Result<()>;
}

/// Port: produces a proposed merge for one conflict block
/// (implemented by ConcatSuggester, or anything smarter).
///
/// The answer is opaque text fed into `resolve_with_supplied`.
#[async_trait]
pub trait MergeSuggester: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<String>;
}

/// Final content of one file, handed to the [`CommitStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub path: FilePath,
    pub content: String,
    /// Fingerprint of the raw text the session was opened with.
    pub source_fingerprint: Fingerprint,
    /// `true` when the file went through the whole-file override.
    pub overridden: bool,
}

/// Input to a [`MergeSuggester`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionRequest {
    pub path: FilePath,
    pub segment: SegmentId,
    pub ours: String,
    pub theirs: String,
    pub base: Option<String>,
    /// Free-form context (labels, surrounding lines, language hints…).
    pub context: BTreeMap<String, String>,
}

/// Port: report formatting (implemented by JsonWriter, TextWriter)
pub trait OutputWriter: Send + Sync {
    /// Serializes the session report to a string (JSON, plain text, etc.)
    fn format(&self, report: &SessionReport) -> Result<String>;
    /// Extension of the produced file (e.g. "json", "txt")
    fn extension(&self) -> &'static str;
}
