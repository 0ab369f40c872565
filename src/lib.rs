use anyhow::{Context, Result};
use std::sync::Arc;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// ─── Log level ────────────────────────────────────────────────────────────────

/// Controls the verbosity of unconflict's internal tracing output.
///
/// Pass to [`init_tracing`] before calling any async entry point.
///
/// | Variant | `tracing` level | When to use                              |
/// |---------|-----------------|------------------------------------------|
/// | `Error` | `error`         | `--quiet` / CI scripting                 |
/// | `Info`  | `info`          | Default, shows session and commit events |
/// | `Debug` | `debug`         | `--verbose`, shows per-segment parsing   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => anyhow::bail!("Unknown log level: {} (expected error, info or debug)", other),
        }
    }
}

/// Initialise the global `tracing` subscriber for unconflict.
///
/// This is a convenience wrapper around `tracing_subscriber`. It respects
/// `RUST_LOG` when set, falling back to `level` otherwise.
///
/// Call this **once** at application startup. Library consumers who manage
/// their own subscriber should skip this and configure tracing themselves.
///
/// Only available when the `cli` feature is enabled (pulls in
/// `tracing-subscriber`).
#[cfg(feature = "cli")]
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let default_filter = match level {
        LogLevel::Error => "unconflict=error",
        LogLevel::Info => "unconflict=info",
        LogLevel::Debug => "unconflict=debug",
    };

    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

// ─── Public API Facade ───

pub use application::file_session::FileConflictSession;
pub use application::handle::SessionHandle;
pub use application::monitoring::PerfReport;
pub use application::parser::{parse, ConflictParser};
pub use application::render::render;
pub use application::session::MultiFileResolutionSession;
pub use application::suggestion::ConcatSuggester;
pub use domain::document::ParsedDocument;
pub use domain::error::{FileSessionError, ParseWarning, ResolutionError, SessionError};
pub use domain::lifecycle::{SessionOutcome, SessionState};
pub use domain::markers::LineEnding;
pub use domain::ports::{CommitStore, MergeSuggester, ResolvedFile, TextSource};
pub use domain::report::{FileSummary, ProgressReport, SessionReport};
pub use domain::segment::{ConflictBlock, ConflictStatus, Resolution, Segment, SegmentKind};
pub use domain::value_objects::{FilePath, Fingerprint, SegmentId};
pub use infrastructure::config::AppConfig;
pub use infrastructure::fs::{FsCommitStore, FsTextSource};

use crate::application::monitoring::MonitoringCommitStore;

// ─── Public entry points ───

/// Load every file from `source` and open one session over them.
pub async fn open_session(source: &dyn TextSource) -> Result<MultiFileResolutionSession> {
    let files = source.load().await?;
    let session = MultiFileResolutionSession::open(files)?;
    Ok(session)
}

/// Open a session over files on disk and report where each one stands.
/// Nothing is resolved and nothing is written.
pub async fn status(paths: &[String]) -> Result<SessionReport> {
    let session = open_session(&FsTextSource::new(paths)).await?;
    Ok(session.report())
}

/// Render one file on disk with its conflicts in marker form, resolved or
/// not. Labels and line endings are kept.
pub async fn preview(path: &str) -> Result<String> {
    let session = open_session(&FsTextSource::new([path])).await?;
    let file = session
        .file(path)
        .with_context(|| format!("{path} missing from its own session"))?;
    Ok(file.render_preview())
}

/// What [`run_resolve`] did.
#[derive(Debug, Clone)]
pub struct ResolveRun {
    /// Session state right before the commit attempt.
    pub report: SessionReport,
    /// `false` on a dry run.
    pub committed: bool,
    pub perf: PerfReport,
}

/// Apply one strategy to every conflict of every file and write the result
/// back, unless `dry_run` is set (or `cfg.commit.dry_run`).
///
/// When `strategy` is `None` the configured `resolve.default_strategy` is
/// used; having neither is an error.
pub async fn run_resolve(
    cfg: &AppConfig,
    paths: &[String],
    strategy: Option<Resolution>,
    dry_run: bool,
) -> Result<ResolveRun> {
    let strategy = match strategy {
        Some(s) => s,
        None => cfg
            .default_strategy()?
            .context("No strategy given and resolve.default_strategy is not set")?,
    };

    let mut session = open_session(&FsTextSource::new(paths)).await?;
    session.resolve_everywhere(&strategy)?;
    let report = session.report();

    if dry_run || cfg.commit.dry_run {
        tracing::info!(session = %report.session_id, "dry run, nothing written");
        return Ok(ResolveRun {
            report,
            committed: false,
            perf: PerfReport::default(),
        });
    }

    let perf = PerfReport::new();
    let store = MonitoringCommitStore::new(
        Arc::new(FsCommitStore::new(".").verify_unchanged(cfg.commit.verify_unchanged)),
        Arc::clone(&perf),
    );
    let outcome = session.commit(&store).await;
    let perf = perf
        .lock()
        .map(|r| r.clone())
        .unwrap_or_default();
    outcome?;

    Ok(ResolveRun {
        report,
        committed: true,
        perf,
    })
}
