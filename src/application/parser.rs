use tracing::{debug, instrument, warn};

use crate::domain::document::ParsedDocument;
use crate::domain::error::{MalformedKind, ParseWarning};
use crate::domain::markers::{classify, LineEnding, MarkerLine};
use crate::domain::segment::{ConflictBlock, ConflictStatus, Segment};
use crate::domain::value_objects::SegmentId;

// ─────────────────────────────────────────────────────────────────────────────
// ConflictParser
// ─────────────────────────────────────────────────────────────────────────────

/// Turns conflict-marked text into an ordered list of [`Segment`]s.
///
/// # Algorithm
/// One pass over the lines with an explicit state
/// (`InPlainText`, `InOurs`, `InBase`, `InTheirs`):
/// 1. `<<<<<<<` flushes the plain-text run and opens a block (`InOurs`).
/// 2. `|||||||` inside ours switches to the diff3 base section (`InBase`).
/// 3. `=======` inside ours/base switches to `InTheirs`.
/// 4. `>>>>>>>` inside theirs closes the block as `Unresolved`.
/// 5. Anything else, including markers that make no sense in the current
///    state, is content of whatever is open.
/// 6. At end of input the plain run is flushed; a still-open block is kept
///    best-effort and reported as a [`ParseWarning`].
///
/// Section contents are stored with `\n` between lines whatever the file's
/// line-ending convention; the renderer puts the convention back.
///
/// The parser never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictParser;

impl ConflictParser {
    pub fn new() -> Self {
        Self
    }

    #[instrument(name = "parse", skip_all, fields(bytes = raw.len()), level = "debug")]
    pub fn parse(&self, raw: &str) -> ParsedDocument {
        let line_ending = LineEnding::detect(raw);
        let mut builder = Builder::new();

        for (idx, line) in line_ending.split(raw).into_iter().enumerate() {
            builder.feed(idx + 1, line);
        }
        let (segments, warnings) = builder.finish();

        debug!(
            segments = segments.len(),
            conflicts = segments.iter().filter(|s| s.is_conflict()).count(),
            warnings = warnings.len(),
            ?line_ending,
            "parsed conflict document"
        );

        ParsedDocument {
            segments,
            warnings,
            line_ending,
        }
    }
}

/// Parse with the default parser.
pub fn parse(raw: &str) -> ParsedDocument {
    ConflictParser::new().parse(raw)
}

/// Parse and keep only the segments.
pub fn parse_segments(raw: &str) -> Vec<Segment> {
    parse(raw).segments
}

// ─── Internal state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InPlainText,
    InOurs,
    InBase,
    InTheirs,
}

/// Accumulator for the block currently being read.
struct OpenBlock<'a> {
    start_line: usize,
    ours_label: Option<&'a str>,
    base_label: Option<&'a str>,
    ours: Vec<&'a str>,
    base: Option<Vec<&'a str>>,
    theirs: Vec<&'a str>,
}

impl<'a> OpenBlock<'a> {
    fn new(start_line: usize, ours_label: Option<&'a str>) -> Self {
        Self {
            start_line,
            ours_label,
            base_label: None,
            ours: Vec::new(),
            base: None,
            theirs: Vec::new(),
        }
    }

    fn into_block(self, theirs_label: Option<&'a str>) -> ConflictBlock {
        ConflictBlock {
            ours: self.ours.join("\n"),
            theirs: self.theirs.join("\n"),
            ours_lines: self.ours.len(),
            theirs_lines: self.theirs.len(),
            base_lines: self.base.as_ref().map_or(0, Vec::len),
            base: self.base.map(|lines| lines.join("\n")),
            ours_label: self.ours_label.map(str::to_string),
            base_label: self.base_label.map(str::to_string),
            theirs_label: theirs_label.map(str::to_string),
            status: ConflictStatus::Unresolved,
        }
    }
}

struct Builder<'a> {
    state: State,
    plain: Vec<&'a str>,
    open: Option<OpenBlock<'a>>,
    segments: Vec<Segment>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Builder<'a> {
    fn new() -> Self {
        Self {
            state: State::InPlainText,
            plain: Vec::new(),
            open: None,
            segments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn feed(&mut self, line_no: usize, line: &'a str) {
        match (self.state, classify(line)) {
            (_, Some(MarkerLine::Ours(label))) => {
                if self.open.is_some() {
                    self.close(None, Some(MalformedKind::NestedOpen));
                }
                self.flush_plain();
                self.open = Some(OpenBlock::new(line_no, label));
                self.state = State::InOurs;
            }
            (State::InOurs, Some(MarkerLine::Base(label))) => {
                if let Some(open) = self.open.as_mut() {
                    open.base = Some(Vec::new());
                    open.base_label = label;
                }
                self.state = State::InBase;
            }
            (State::InOurs | State::InBase, Some(MarkerLine::Separator)) => {
                self.state = State::InTheirs;
            }
            (State::InTheirs, Some(MarkerLine::Theirs(label))) => {
                self.close(label, None);
            }
            (State::InOurs | State::InBase, Some(MarkerLine::Theirs(label))) => {
                self.close(label, Some(MalformedKind::MissingSeparator));
            }
            _ => self.push_content(line),
        }
    }

    fn push_content(&mut self, line: &'a str) {
        match (self.state, self.open.as_mut()) {
            (State::InOurs, Some(open)) => open.ours.push(line),
            (State::InBase, Some(open)) => open.base.get_or_insert_with(Vec::new).push(line),
            (State::InTheirs, Some(open)) => open.theirs.push(line),
            _ => self.plain.push(line),
        }
    }

    fn flush_plain(&mut self) {
        if self.plain.is_empty() {
            return;
        }
        let content = self.plain.join("\n");
        self.plain.clear();
        let id = self.segments.len();
        self.segments.push(Segment::plain(id, content));
    }

    fn close(&mut self, theirs_label: Option<&'a str>, malformed: Option<MalformedKind>) {
        self.state = State::InPlainText;
        let Some(open) = self.open.take() else {
            return;
        };

        let id = self.segments.len();
        if let Some(kind) = malformed {
            let warning = ParseWarning {
                line: open.start_line,
                segment: SegmentId(id),
                kind,
            };
            warn!(line = warning.line, kind = ?kind, "malformed conflict block kept best-effort");
            self.warnings.push(warning);
        }
        let block = open.into_block(theirs_label);
        self.segments.push(Segment::conflict(id, block));
    }

    fn finish(mut self) -> (Vec<Segment>, Vec<ParseWarning>) {
        if self.open.is_some() {
            self.close(None, Some(MalformedKind::Unterminated));
        }
        self.flush_plain();
        (self.segments, self.warnings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::SegmentKind;

    const SINGLE: &str = "line1\n<<<<<<< HEAD\nA\n=======\nB\n>>>>>>> branch\nline2";

    fn plain_content(seg: &Segment) -> &str {
        match &seg.kind {
            SegmentKind::PlainText { content } => content,
            other => panic!("expected plain text, got {other:?}"),
        }
    }

    #[test]
    fn single_conflict_splits_into_three_segments() {
        let doc = parse(SINGLE);
        assert_eq!(doc.segments.len(), 3);
        assert_eq!(plain_content(&doc.segments[0]), "line1");
        assert_eq!(plain_content(&doc.segments[2]), "line2");

        let block = doc.segments[1].as_conflict().unwrap();
        assert_eq!(block.ours, "A");
        assert_eq!(block.theirs, "B");
        assert_eq!(block.status, ConflictStatus::Unresolved);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn ids_follow_position() {
        let doc = parse(SINGLE);
        for (i, seg) in doc.segments.iter().enumerate() {
            assert_eq!(seg.id, SegmentId(i));
        }
    }

    #[test]
    fn labels_are_kept_out_of_content() {
        let block = parse(SINGLE).segments[1].as_conflict().cloned().unwrap();
        assert_eq!(block.ours_label.as_deref(), Some("HEAD"));
        assert_eq!(block.theirs_label.as_deref(), Some("branch"));
        assert!(!block.ours.contains("HEAD"));
        assert!(!block.theirs.contains("branch"));
    }

    #[test]
    fn text_without_markers_is_one_plain_segment() {
        let doc = parse("fn main() {\n    println!(\"hi\");\n}\n");
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(
            plain_content(&doc.segments[0]),
            "fn main() {\n    println!(\"hi\");\n}\n"
        );
    }

    #[test]
    fn counts_conflicts_in_source_order() {
        let raw = "<<<<<<< a\n1\n=======\n2\n>>>>>>> b\nmid\n<<<<<<< a\n3\n=======\n4\n>>>>>>> b\n<<<<<<< a\n5\n=======\n6\n>>>>>>> b";
        let doc = parse(raw);
        assert_eq!(doc.conflict_count(), 3);
        let ours: Vec<&str> = doc
            .segments
            .iter()
            .filter_map(|s| s.as_conflict())
            .map(|c| c.ours.as_str())
            .collect();
        assert_eq!(ours, vec!["1", "3", "5"]);
        // leading conflict, one run between, adjacent conflicts, no trailing run
        assert_eq!(doc.segments.len(), 4);
    }

    #[test]
    fn multi_line_sections() {
        let raw = "<<<<<<< HEAD\na1\na2\n=======\nb1\nb2\nb3\n>>>>>>> other\n";
        let doc = parse(raw);
        let block = doc.segments[0].as_conflict().unwrap();
        assert_eq!(block.ours, "a1\na2");
        assert_eq!(block.theirs, "b1\nb2\nb3");
        // trailing newline survives as an empty trailing line
        assert_eq!(plain_content(&doc.segments[1]), "");
    }

    #[test]
    fn empty_sections() {
        let doc = parse("<<<<<<<\n=======\n>>>>>>>");
        let block = doc.segments[0].as_conflict().unwrap();
        assert_eq!(block.ours, "");
        assert_eq!(block.theirs, "");
        assert_eq!(block.ours_label, None);
    }

    #[test]
    fn blank_line_section_is_told_apart_from_empty_one() {
        let raw = "<<<<<<<\n\n||||||| base\n=======\n\n\n>>>>>>>";
        let block = parse(raw).segments[0].as_conflict().cloned().unwrap();
        assert_eq!(block.ours, "");
        assert_eq!(block.ours_lines, 1);
        assert_eq!(block.base.as_deref(), Some(""));
        assert_eq!(block.base_lines, 0);
        assert_eq!(block.theirs, "\n");
        assert_eq!(block.theirs_lines, 2);
    }

    #[test]
    fn separator_outside_conflict_is_plain_text() {
        let raw = "Title\n=======\nbody\n>>>>>>> stray";
        let doc = parse(raw);
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(plain_content(&doc.segments[0]), raw);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn extra_separator_in_theirs_is_content() {
        let doc = parse("<<<<<<<\na\n=======\nb\n=======\nc\n>>>>>>>");
        let block = doc.segments[0].as_conflict().unwrap();
        assert_eq!(block.theirs, "b\n=======\nc");
    }

    #[test]
    fn unterminated_block_is_flushed_with_warning() {
        let raw = "keep\n<<<<<<< HEAD\nours\n=======\npartial";
        let doc = parse(raw);
        assert_eq!(doc.segments.len(), 2);
        let block = doc.segments[1].as_conflict().unwrap();
        assert_eq!(block.ours, "ours");
        assert_eq!(block.theirs, "partial");
        assert_eq!(block.theirs_label, None);

        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, MalformedKind::Unterminated);
        assert_eq!(doc.warnings[0].line, 2);
        assert_eq!(doc.warnings[0].segment, SegmentId(1));
        assert!(doc.is_suspect());
    }

    #[test]
    fn unterminated_before_separator_has_empty_theirs() {
        let doc = parse("<<<<<<< HEAD\nonly ours");
        let block = doc.segments[0].as_conflict().unwrap();
        assert_eq!(block.ours, "only ours");
        assert_eq!(block.theirs, "");
        assert_eq!(doc.warnings[0].kind, MalformedKind::Unterminated);
    }

    #[test]
    fn closing_without_separator_warns() {
        let doc = parse("<<<<<<< HEAD\nx\n>>>>>>> b\ntail");
        assert_eq!(doc.segments.len(), 2);
        let block = doc.segments[0].as_conflict().unwrap();
        assert_eq!(block.ours, "x");
        assert_eq!(block.theirs, "");
        assert_eq!(block.theirs_label.as_deref(), Some("b"));
        assert_eq!(doc.warnings[0].kind, MalformedKind::MissingSeparator);
    }

    #[test]
    fn nested_open_closes_previous_block() {
        let raw = "<<<<<<< one\na\n<<<<<<< two\nb\n=======\nc\n>>>>>>> end";
        let doc = parse(raw);
        assert_eq!(doc.conflict_count(), 2);
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, MalformedKind::NestedOpen);
        assert_eq!(doc.warnings[0].segment, SegmentId(0));
        let second = doc.segments[1].as_conflict().unwrap();
        assert_eq!(second.ours_label.as_deref(), Some("two"));
        assert_eq!(second.theirs, "c");
    }

    #[test]
    fn diff3_base_section_is_kept_apart() {
        let raw = "<<<<<<< ours\nnew\n||||||| base\nold\n=======\nother\n>>>>>>> theirs";
        let block = parse(raw).segments[0].as_conflict().cloned().unwrap();
        assert_eq!(block.ours, "new");
        assert_eq!(block.base.as_deref(), Some("old"));
        assert_eq!(block.base_label.as_deref(), Some("base"));
        assert_eq!(block.theirs, "other");
    }

    #[test]
    fn base_marker_in_plain_text_is_content() {
        let doc = parse("a\n|||||||\nb");
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.conflict_count(), 0);
    }

    #[test]
    fn crlf_document_is_detected_and_stripped() {
        let raw = "x\r\n<<<<<<< HEAD\r\nA\r\n=======\r\nB\r\n>>>>>>> b\r\ny\r\n";
        let doc = parse(raw);
        assert_eq!(doc.line_ending, LineEnding::CrLf);
        let block = doc.segments[1].as_conflict().unwrap();
        assert_eq!(block.ours, "A");
        assert_eq!(block.theirs, "B");
        assert_eq!(plain_content(&doc.segments[2]), "y\n");
    }

    #[test]
    fn empty_input() {
        let doc = parse("");
        assert_eq!(doc.segments, vec![Segment::plain(0, "")]);
    }
}
