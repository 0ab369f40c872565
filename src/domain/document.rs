use serde::Serialize;

use crate::domain::error::ParseWarning;
use crate::domain::markers::LineEnding;
use crate::domain::segment::Segment;

/// Output of the conflict parser for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    /// Source-ordered segments; `segments[i].id == SegmentId(i)`.
    pub segments: Vec<Segment>,
    pub warnings: Vec<ParseWarning>,
    pub line_ending: LineEnding,
}

impl ParsedDocument {
    pub fn conflict_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_conflict()).count()
    }

    /// `true` when the parser had to guess at least once.
    pub fn is_suspect(&self) -> bool {
        !self.warnings.is_empty()
    }
}
