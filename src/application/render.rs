use std::borrow::Cow;

use crate::domain::markers::{
    marker_line, LineEnding, BASE_MARKER, OURS_MARKER, SEPARATOR_MARKER, THEIRS_MARKER,
};
use crate::domain::segment::{ConflictBlock, ConflictStatus, Segment, SegmentKind};

// ─────────────────────────────────────────────────────────────────────────────
// Reconstruction
// ─────────────────────────────────────────────────────────────────────────────

/// Render segments back into one text buffer.
///
/// - plain text → verbatim
/// - resolved conflict → its resolution text; a resolution of zero lines
///   removes the block entirely
/// - unresolved conflict → the marker block, labels included
///
/// Segments are joined with `\n` and the result is converted to the
/// document's line ending. Pure and total: the output is only committable
/// when no conflict is unresolved, which the file session enforces.
pub fn render(segments: &[Segment], line_ending: LineEnding) -> String {
    let joined = segments
        .iter()
        .filter_map(render_segment)
        .collect::<Vec<_>>()
        .join("\n");

    match line_ending {
        LineEnding::Lf => joined,
        LineEnding::CrLf => joined.replace('\n', "\r\n"),
    }
}

/// Text contributed by one segment, `None` when it contributes no lines.
pub fn render_segment(segment: &Segment) -> Option<Cow<'_, str>> {
    match &segment.kind {
        SegmentKind::PlainText { content } => Some(Cow::Borrowed(content.as_str())),
        SegmentKind::Conflict(block) => match &block.status {
            ConflictStatus::Resolved { .. } if block.resolved_lines() == Some(0) => None,
            ConflictStatus::Resolved { content, .. } => Some(Cow::Borrowed(content.as_str())),
            ConflictStatus::Unresolved => Some(Cow::Owned(serialize_block(block))),
        },
    }
}

/// Re-serialise a block in marker form, `\n`-separated.
///
/// An empty section contributes no line between its markers; a section of
/// one blank line contributes one empty line.
pub fn serialize_block(block: &ConflictBlock) -> String {
    let mut lines: Vec<Cow<'_, str>> = Vec::with_capacity(7);

    lines.push(marker_line(OURS_MARKER, block.ours_label.as_deref()).into());
    push_section(&mut lines, &block.ours, block.ours_lines);
    if let Some(base) = &block.base {
        lines.push(marker_line(BASE_MARKER, block.base_label.as_deref()).into());
        push_section(&mut lines, base, block.base_lines);
    }
    lines.push(Cow::Borrowed(SEPARATOR_MARKER));
    push_section(&mut lines, &block.theirs, block.theirs_lines);
    lines.push(marker_line(THEIRS_MARKER, block.theirs_label.as_deref()).into());

    lines.join("\n")
}

fn push_section<'a>(lines: &mut Vec<Cow<'a, str>>, section: &'a str, line_count: usize) {
    if line_count > 0 {
        lines.push(Cow::Borrowed(section));
    }
}
