use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::domain::fingerprint::fingerprint;
use crate::domain::ports::{CommitStore, ResolvedFile, TextSource};

// ─── FsTextSource ────────────────────────────────────────────────────────────

/// Reads an explicit list of files from disk.
///
/// Files that are not valid UTF-8 are rejected as binary.
pub struct FsTextSource {
    paths: Vec<PathBuf>,
}

impl FsTextSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TextSource for FsTextSource {
    async fn load(&self) -> Result<Vec<(String, String)>> {
        let mut files = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => bail!(
                    "{} is not valid UTF-8 text (binary files are not supported)",
                    path.display()
                ),
            };
            debug!(path = %path.display(), bytes = text.len(), "loaded conflicted file");
            files.push((path.to_string_lossy().into_owned(), text));
        }
        Ok(files)
    }
}

// ─── FsCommitStore ───────────────────────────────────────────────────────────

/// Writes resolved files back to disk.
///
/// Paths are resolved against `root` (absolute paths are taken as-is).
/// The write goes in three phases so that a failure leaves every target file
/// untouched:
/// 1. verify each file still has the content the session was opened with
///    (skipped when `verify_unchanged` is off),
/// 2. write every new content to a temporary sibling file,
/// 3. rename the temporaries over the targets.
///
/// Only phase 3 can leave a partial result, and only if a rename itself fails.
pub struct FsCommitStore {
    root: PathBuf,
    verify_unchanged: bool,
}

impl FsCommitStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            verify_unchanged: true,
        }
    }

    pub fn verify_unchanged(mut self, on: bool) -> Self {
        self.verify_unchanged = on;
        self
    }

    fn target(&self, file: &ResolvedFile) -> PathBuf {
        self.root.join(file.path.as_str())
    }

    async fn verify(&self, file: &ResolvedFile, target: &Path) -> Result<()> {
        let current = tokio::fs::read(target)
            .await
            .with_context(|| format!("Failed to re-read {} before commit", target.display()))?;
        let current = String::from_utf8_lossy(&current);
        if fingerprint(&current) != file.source_fingerprint {
            bail!(
                "{} changed on disk since the session opened it; refusing to overwrite",
                file.path
            );
        }
        Ok(())
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.unconflict.tmp"))
}

async fn remove_temps(temps: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in temps {
        if let Err(e) = tokio::fs::remove_file(tmp).await {
            warn!(path = %tmp.display(), error = %e, "could not remove temporary file");
        }
    }
}

#[async_trait]
impl CommitStore for FsCommitStore {
    async fn commit(&self, files: &[ResolvedFile]) -> Result<()> {
        if self.verify_unchanged {
            for file in files {
                self.verify(file, &self.target(file)).await?;
            }
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
        for file in files {
            let target = self.target(file);
            let tmp = temp_path(&target);
            if let Err(e) = tokio::fs::write(&tmp, file.content.as_bytes()).await {
                remove_temps(&staged).await;
                return Err(e).with_context(|| format!("Failed to stage {}", target.display()));
            }
            staged.push((tmp, target));
        }

        for (tmp, target) in &staged {
            tokio::fs::rename(tmp, target)
                .await
                .with_context(|| format!("Failed to replace {}", target.display()))?;
        }

        let overridden = files.iter().filter(|f| f.overridden).count();
        if overridden > 0 {
            warn!(overridden, "committed file(s) marked resolved by override");
        }
        info!(files = files.len(), root = %self.root.display(), "resolved files written");
        Ok(())
    }
}
