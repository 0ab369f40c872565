use crate::domain::ports::{CommitStore, MergeSuggester, ResolvedFile, SuggestionRequest};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

// ─── PerfReport ──────────────────────────────────────────────────────────────

/// A single timed collaborator call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpTiming {
    /// Operation name: "commit" or "suggest".
    pub operation: &'static str,
    /// What the call was about: a file path, or the file count for commits.
    pub target: String,
    /// Elapsed wall time in milliseconds.
    pub duration_ms: u128,
    /// Bytes handed over (commit) or received (suggest).
    pub bytes: usize,
    pub ok: bool,
}

/// Accumulated timings of the external collaborators for one session.
///
/// Shared across decorator instances via `Arc<Mutex<_>>`. Render it with
/// [`crate::presentation::cli_summary::print_perf_summary`].
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct PerfReport {
    pub timings: Vec<OpTiming>,
    pub failures: usize,
    pub total_ms: u128,
}

impl PerfReport {
    pub fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }

    fn record(report: &Arc<Mutex<Self>>, timing: OpTiming) {
        if let Ok(mut r) = report.lock() {
            r.total_ms += timing.duration_ms;
            if !timing.ok {
                r.failures += 1;
            }
            r.timings.push(timing);
        }
    }
}

// ─── MonitoringCommitStore ───────────────────────────────────────────────────

/// Decorator: wraps any `CommitStore`, measures each commit attempt and
/// appends it to the shared `PerfReport`. Failures are recorded and passed
/// through untouched.
pub struct MonitoringCommitStore {
    inner: Arc<dyn CommitStore>,
    report: Arc<Mutex<PerfReport>>,
}

impl MonitoringCommitStore {
    pub fn new(inner: Arc<dyn CommitStore>, report: Arc<Mutex<PerfReport>>) -> Self {
        Self { inner, report }
    }
}

#[async_trait]
impl CommitStore for MonitoringCommitStore {
    #[instrument(name = "store_commit", skip(self, files), fields(files = files.len()), level = "info")]
    async fn commit(&self, files: &[ResolvedFile]) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.commit(files).await;
        let duration_ms = start.elapsed().as_millis();
        let bytes: usize = files.iter().map(|f| f.content.len()).sum();

        match &result {
            Ok(()) => info!(files = files.len(), bytes, duration_ms, "commit completed"),
            Err(e) => warn!(files = files.len(), duration_ms, error = %e, "commit failed"),
        }

        PerfReport::record(
            &self.report,
            OpTiming {
                operation: "commit",
                target: format!("{} file(s)", files.len()),
                duration_ms,
                bytes,
                ok: result.is_ok(),
            },
        );

        result
    }
}

// ─── MonitoringSuggester ─────────────────────────────────────────────────────

/// Decorator: wraps any `MergeSuggester`, measures each suggestion call.
pub struct MonitoringSuggester {
    inner: Arc<dyn MergeSuggester>,
    report: Arc<Mutex<PerfReport>>,
}

impl MonitoringSuggester {
    pub fn new(inner: Arc<dyn MergeSuggester>, report: Arc<Mutex<PerfReport>>) -> Self {
        Self { inner, report }
    }
}

#[async_trait]
impl MergeSuggester for MonitoringSuggester {
    #[instrument(
        name = "suggest",
        skip(self, request),
        fields(file = %request.path, segment = %request.segment),
        level = "info"
    )]
    async fn suggest(&self, request: &SuggestionRequest) -> Result<String> {
        let start = Instant::now();
        let result = self.inner.suggest(request).await;
        let duration_ms = start.elapsed().as_millis();

        let bytes = result.as_ref().map(|s| s.len()).unwrap_or(0);
        info!(file = %request.path, ok = result.is_ok(), bytes, duration_ms, "suggest completed");

        PerfReport::record(
            &self.report,
            OpTiming {
                operation: "suggest",
                target: request.path.to_string(),
                duration_ms,
                bytes,
                ok: result.is_ok(),
            },
        );

        result
    }
}
