use serde::Serialize;

// ─── Delimiter convention ─────────────────────────────────────────────────────
//
// The one wire format the engine honours bit-for-bit. Every marker is exactly
// seven repeated characters; the ours, base and theirs markers may carry a
// label after a single space.

pub const OURS_MARKER: &str = "<<<<<<<";
pub const BASE_MARKER: &str = "|||||||";
pub const SEPARATOR_MARKER: &str = "=======";
pub const THEIRS_MARKER: &str = ">>>>>>>";

/// A line recognised as one of the conflict delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLine<'a> {
    Ours(Option<&'a str>),
    Base(Option<&'a str>),
    Separator,
    Theirs(Option<&'a str>),
}

/// Classify a single line (without its `\n`).
///
/// A trailing `\r` is ignored so CRLF files are recognised even when the
/// document as a whole is kept in LF mode. Eight `<` in a row is not a
/// marker, nor is a marker glued to its label without a space.
pub fn classify(line: &str) -> Option<MarkerLine<'_>> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line == SEPARATOR_MARKER {
        return Some(MarkerLine::Separator);
    }
    if let Some(label) = labelled(line, OURS_MARKER) {
        return Some(MarkerLine::Ours(label));
    }
    if let Some(label) = labelled(line, BASE_MARKER) {
        return Some(MarkerLine::Base(label));
    }
    if let Some(label) = labelled(line, THEIRS_MARKER) {
        return Some(MarkerLine::Theirs(label));
    }
    None
}

/// `Some(None)` for a bare marker, `Some(Some(label))` for `marker + ' ' + label`.
fn labelled<'a>(line: &'a str, marker: &str) -> Option<Option<&'a str>> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() {
        Some(None)
    } else {
        rest.strip_prefix(' ').map(Some)
    }
}

/// Re-serialise a marker line, label preserved verbatim.
pub fn marker_line(marker: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{marker} {label}"),
        None => marker.to_string(),
    }
}

// ─── Line endings ─────────────────────────────────────────────────────────────

/// Line-break convention of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// CRLF only when every `\n` in the text is preceded by `\r`.
    ///
    /// Mixed files stay in LF mode and keep their stray `\r` inside the line
    /// content, which keeps the round trip byte-exact.
    pub fn detect(raw: &str) -> Self {
        let newlines = raw.matches('\n').count();
        if newlines > 0 && raw.matches("\r\n").count() == newlines {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Split `raw` into lines under this convention.
    ///
    /// A trailing line break produces a trailing empty line, so joining the
    /// result with [`LineEnding::as_str`] gives back `raw` exactly.
    pub fn split<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        match self {
            LineEnding::Lf => raw.split('\n').collect(),
            LineEnding::CrLf => raw.split("\r\n").collect(),
        }
    }
}
