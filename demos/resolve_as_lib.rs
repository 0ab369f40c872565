//! # Unconflict: library usage example
//!
//! Shows three common patterns for consuming unconflict as a Rust library:
//!
//! 1. **Files on disk**: mirrors the CLI `status` command
//! 2. **In-memory session**: resolve block by block, ask a suggester, commit
//!    to your own store
//! 3. **Inspect the segments**: walk the parsed file for custom logic
//!
//! Run against real conflicted files:
//!   cargo run --example resolve_as_lib -- src/a.rs src/b.rs
//!
//! Run with the built-in in-memory files:
//!   cargo run --example resolve_as_lib

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use unconflict::{
    application::suggestion::resolve_with_suggestion,
    presentation::writers::writer_for,
    CommitStore, ConcatSuggester, FileConflictSession, MultiFileResolutionSession, Resolution,
    ResolvedFile, SegmentId, SegmentKind,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() {
        in_memory_session().await
    } else {
        from_disk(&args).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 1: open files from disk (same as `unconflict status`)
// ─────────────────────────────────────────────────────────────────────────────
async fn from_disk(paths: &[String]) -> Result<()> {
    println!("=== Pattern 1: files on disk ===\n");

    let report = unconflict::status(paths).await?;
    let text = writer_for("text")
        .ok_or_else(|| anyhow::anyhow!("text writer missing"))?
        .format(&report)?;
    println!("{text}");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 2: an in-memory session committed to a custom store.
// Any type implementing `CommitStore` works: a git index, an editor buffer,
// a remote API.
// ─────────────────────────────────────────────────────────────────────────────

const CHANGELOG: &str = "\
# Changelog
<<<<<<< HEAD
- add retry to uploads
=======
- fix crash on empty config
>>>>>>> release/1.4
";

const CONFIG: &str = "\
[server]
<<<<<<< HEAD
port = 8080
||||||| base
port = 80
=======
port = 9000
>>>>>>> release/1.4
host = \"0.0.0.0\"
";

#[derive(Default)]
struct MemoryStore {
    written: Mutex<Vec<ResolvedFile>>,
}

#[async_trait]
impl CommitStore for MemoryStore {
    async fn commit(&self, files: &[ResolvedFile]) -> Result<()> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        written.extend_from_slice(files);
        Ok(())
    }
}

async fn in_memory_session() -> Result<()> {
    println!("=== Pattern 2: in-memory session ===\n");

    let mut session =
        MultiFileResolutionSession::open([("CHANGELOG.md", CHANGELOG), ("server.toml", CONFIG)])?;

    // Hand off to pattern 3 before anything is resolved
    if let Some(file) = session.file("server.toml") {
        inspect_file(file);
    }

    // Append-only file: let the suggester keep both entries
    resolve_with_suggestion(&mut session, "CHANGELOG.md", SegmentId(1), &ConcatSuggester).await?;

    // Committing now is refused: server.toml is still open
    let store = MemoryStore::default();
    if let Err(e) = session.commit(&store).await {
        println!("commit refused: {e}");
    }

    session.resolve("server.toml", SegmentId(1), Resolution::Theirs)?;
    println!("progress: {:.0}%", session.progress() * 100.0);

    session.commit(&store).await?;
    println!("session {}: {}\n", session.session_id(), session.state());

    let written = store
        .written
        .lock()
        .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
    for file in written.iter() {
        println!("━━ {} ━━", file.path);
        print!("{}", file.content);
        println!();
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 3: walk the segments of one file.
// Segments are plain Rust data: match on the kind and read the sides.
// ─────────────────────────────────────────────────────────────────────────────
fn inspect_file(file: &FileConflictSession) {
    println!("=== Pattern 3: inspecting {} ===\n", file.path());

    for segment in file.segments() {
        match &segment.kind {
            SegmentKind::PlainText { content } => {
                println!("{}  text      {} line(s)", segment.id, content.lines().count());
            }
            SegmentKind::Conflict(block) => {
                println!(
                    "{}  conflict  ours={:?} theirs={:?} base={:?}",
                    segment.id, block.ours, block.theirs, block.base
                );
            }
        }
    }

    if file.is_suspect() {
        for warning in file.warnings() {
            eprintln!("⚠  {warning}");
        }
    }
    println!();
}
