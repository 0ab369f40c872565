use serde::{Deserialize, Serialize};

/// Newtype for the path label of a conflicted file.
///
/// The engine never interprets it: it is whatever the text source handed in,
/// and it is handed back unchanged to the commit store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FilePath(pub String);

impl FilePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        FilePath(s.to_string())
    }
}

/// Position-derived identifier of a segment inside one parsed file.
///
/// Stable across resolve/undo, meaningless across re-parses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct SegmentId(pub usize);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// SHA-256 hex fingerprint of a file's raw conflicted text.
///
/// Computed by `unconflict::fingerprint(raw)` when the file enters the
/// session, and checked again by the filesystem store before write-back so a
/// file edited behind the session's back is never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Returns the raw hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
