use anyhow::Result;
use std::fmt::Write;

use crate::domain::{ports::OutputWriter, report::SessionReport};

use super::json::file_status;

/// Plain-text report, one block per file. Meant for terminals without
/// colour and for attaching to tickets.
pub struct TextWriter;

impl OutputWriter for TextWriter {
    fn format(&self, report: &SessionReport) -> Result<String> {
        let mut out = String::new();
        let p = &report.progress;

        writeln!(out, "session   {}", report.session_id)?;
        writeln!(out, "state     {}", report.state)?;
        writeln!(out, "created   {}", report.created_at)?;
        writeln!(out, "generated {}", report.generated_at)?;
        if let Some(focused) = &report.focused {
            writeln!(out, "focused   {focused}")?;
        }
        writeln!(
            out,
            "progress  {}/{} files, {}/{} conflicts ({:.0}%)",
            p.resolved_files,
            p.total_files,
            p.resolved_conflicts,
            p.total_conflicts,
            p.ratio * 100.0
        )?;
        writeln!(
            out,
            "commit    {}",
            if report.can_commit { "ready" } else { "blocked" }
        )?;

        for file in &report.files {
            writeln!(out)?;
            writeln!(
                out,
                "{} [{}] {}/{} resolved",
                file.path,
                file_status(file),
                file.resolved,
                file.conflicts
            )?;
            for warning in &file.warnings {
                writeln!(out, "  ! {warning}")?;
            }
            if file.overridden {
                let open = file.conflicts - file.resolved;
                writeln!(
                    out,
                    "  ! marked resolved by override with {open} conflict(s) still open"
                )?;
            }
        }

        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::MultiFileResolutionSession;

    const RAW: &str = "<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> b\n";

    #[test]
    fn text_report_lists_files_and_flags() {
        let mut s = MultiFileResolutionSession::open([
            ("a.txt", RAW),
            ("b.txt", "<<<<<<< HEAD\nx\n>>>>>>> b\n"),
        ])
        .unwrap();
        s.mark_file_resolved("a.txt").unwrap();

        let out = TextWriter.format(&s.report()).unwrap();

        assert!(out.contains("state     active"));
        assert!(out.contains("commit    blocked"));
        assert!(out.contains("a.txt [overridden] 0/1 resolved"));
        assert!(out.contains("override with 1 conflict(s) still open"));
        assert!(out.contains("b.txt [suspect] 0/1 resolved"));
        assert!(out.contains("no ======= separator"));
    }
}
