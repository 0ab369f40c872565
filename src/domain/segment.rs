use serde::Serialize;

use crate::domain::value_objects::SegmentId;

/// A unit of a parsed file: either a run of untouched lines or one conflict
/// block.
///
/// Segments are created once by the parser and never added, removed or
/// re-bounded afterwards. Only the `status` of a conflict changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub id: SegmentId,
    pub kind: SegmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Lines outside any conflict block, joined by the document line break.
    PlainText { content: String },
    Conflict(ConflictBlock),
}

/// One `<<<<<<< … >>>>>>>` block.
///
/// `ours`, `theirs` and `base` are fixed at parse time; resolution only
/// touches `status`, which is what makes undo exact.
///
/// Sections are stored `\n`-joined, so an empty section and a section made
/// of one blank line are both `""`. The `*_lines` counts tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictBlock {
    pub ours: String,
    pub theirs: String,
    /// Common-ancestor section of a diff3-style block, if there was one.
    pub base: Option<String>,
    pub ours_lines: usize,
    pub theirs_lines: usize,
    pub base_lines: usize,
    pub ours_label: Option<String>,
    pub base_label: Option<String>,
    pub theirs_label: Option<String>,
    pub status: ConflictStatus,
}

impl ConflictBlock {
    /// A fresh, unresolved two-way block without labels.
    ///
    /// An empty string counts as an empty section.
    pub fn new(ours: impl Into<String>, theirs: impl Into<String>) -> Self {
        let ours = ours.into();
        let theirs = theirs.into();
        Self {
            ours_lines: text_lines(&ours),
            theirs_lines: text_lines(&theirs),
            base_lines: 0,
            ours,
            theirs,
            base: None,
            ours_label: None,
            base_label: None,
            theirs_label: None,
            status: ConflictStatus::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ConflictStatus::Resolved { .. })
    }

    /// The chosen text, if resolved.
    pub fn resolved_content(&self) -> Option<&str> {
        match &self.status {
            ConflictStatus::Unresolved => None,
            ConflictStatus::Resolved { content, .. } => Some(content),
        }
    }

    /// Number of lines the resolution contributes to the file, if resolved.
    /// `Some(0)` means the block is deleted.
    pub fn resolved_lines(&self) -> Option<usize> {
        match &self.status {
            ConflictStatus::Unresolved => None,
            ConflictStatus::Resolved { content, via } => Some(match via {
                ResolutionKind::Ours => self.ours_lines,
                ResolutionKind::Theirs => self.theirs_lines,
                ResolutionKind::Both => self.ours_lines + self.theirs_lines,
                ResolutionKind::Supplied => text_lines(content),
            }),
        }
    }
}

/// Lines in a `\n`-joined text, reading `""` as no lines at all.
pub fn text_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConflictStatus {
    Unresolved,
    Resolved {
        content: String,
        via: ResolutionKind,
    },
}

/// Which strategy produced a resolution. Kept alongside the text for the
/// audit trail and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Ours,
    Theirs,
    Both,
    Supplied,
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionKind::Ours => "ours",
            ResolutionKind::Theirs => "theirs",
            ResolutionKind::Both => "both",
            ResolutionKind::Supplied => "supplied",
        };
        f.write_str(s)
    }
}

/// A resolution request: one of the four strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ours,
    Theirs,
    /// Ours first, then theirs, joined by `\n`.
    Both,
    /// Externally produced text (manual edit or a merge suggestion).
    Supplied(String),
}

impl Resolution {
    pub fn kind(&self) -> ResolutionKind {
        match self {
            Resolution::Ours => ResolutionKind::Ours,
            Resolution::Theirs => ResolutionKind::Theirs,
            Resolution::Both => ResolutionKind::Both,
            Resolution::Supplied(_) => ResolutionKind::Supplied,
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = anyhow::Error;

    /// Parses the three text-free strategies; `Supplied` needs its text and
    /// cannot come from a bare name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ours" => Ok(Resolution::Ours),
            "theirs" => Ok(Resolution::Theirs),
            "both" => Ok(Resolution::Both),
            other => anyhow::bail!("Unknown strategy: {} (expected ours, theirs or both)", other),
        }
    }
}

impl Segment {
    pub fn plain(id: usize, content: impl Into<String>) -> Self {
        Segment {
            id: SegmentId(id),
            kind: SegmentKind::PlainText {
                content: content.into(),
            },
        }
    }

    pub fn conflict(id: usize, block: ConflictBlock) -> Self {
        Segment {
            id: SegmentId(id),
            kind: SegmentKind::Conflict(block),
        }
    }

    pub fn as_conflict(&self) -> Option<&ConflictBlock> {
        match &self.kind {
            SegmentKind::Conflict(block) => Some(block),
            SegmentKind::PlainText { .. } => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.as_conflict().is_some()
    }

    /// Plain text is implicitly resolved; a conflict only once it has a status.
    pub fn is_unresolved(&self) -> bool {
        self.as_conflict().is_some_and(|c| !c.is_resolved())
    }
}
