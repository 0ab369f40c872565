use crate::application::monitoring::PerfReport;
use crate::domain::report::{FileSummary, SessionReport};
use crate::presentation::writers::json::file_status;
use colored::*;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct FileRow {
    file: String,
    status: String,
    conflicts: String,
    resolved: String,
    open: String,
}

#[derive(Tabled)]
struct SummaryRow {
    metric: String,
    value: String,
}

fn coloured_status(file: &FileSummary) -> String {
    let status = file_status(file);
    match status {
        "resolved" => status.green().to_string(),
        "overridden" => status.yellow().to_string(),
        "suspect" => status.red().bold().to_string(),
        _ => status.red().to_string(),
    }
}

/// Print a coloured per-file table and the session totals to stdout.
///
/// Returns `true` if the session can be committed.
pub fn print_session_summary(report: &SessionReport) -> bool {
    println!();

    println!("{}", "UNCONFLICT SESSION SUMMARY".bold().cyan());
    println!(
        "Session: {}  ({})",
        report.session_id.bright_yellow(),
        report.state.to_string().blue()
    );
    if let Some(focused) = &report.focused {
        println!("Focused: {}", focused.as_str().bold());
    }
    println!();

    if report.files.is_empty() {
        println!("{}", "No files in session.".italic());
        return false;
    }

    let rows: Vec<FileRow> = report
        .files
        .iter()
        .map(|f| FileRow {
            file: f.path.as_str().bold().to_string(),
            status: coloured_status(f),
            conflicts: f.conflicts.to_string(),
            resolved: f.resolved.to_string().green().to_string(),
            open: if f.unresolved == 0 {
                "0".dimmed().to_string()
            } else {
                f.unresolved.to_string().red().to_string()
            },
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..=4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let warnings: Vec<String> = report
        .files
        .iter()
        .flat_map(|f| f.warnings.iter().map(move |w| format!("{}: {}", f.path, w)))
        .collect();
    if !warnings.is_empty() {
        println!();
        println!("{}", "MALFORMED MARKERS".bold().red());
        for w in &warnings {
            println!("  {} {}", "!".red(), w);
        }
    }

    let overridden: Vec<&FileSummary> = report.files.iter().filter(|f| f.overridden).collect();
    if !overridden.is_empty() {
        println!();
        for f in overridden {
            println!(
                "  {} {} marked resolved with {} conflict(s) left in marker form",
                "override →".yellow(),
                f.path.as_str().bold(),
                f.conflicts - f.resolved
            );
        }
    }

    let p = &report.progress;
    let summary_rows = vec![
        SummaryRow {
            metric: "Files resolved".into(),
            value: format!("{}/{}", p.resolved_files, p.total_files),
        },
        SummaryRow {
            metric: "Conflicts resolved".into(),
            value: format!("{}/{}", p.resolved_conflicts, p.total_conflicts),
        },
        SummaryRow {
            metric: "Progress".into(),
            value: format!("{:.0}%", p.ratio * 100.0).bold().to_string(),
        },
        SummaryRow {
            metric: "Commit".into(),
            value: if report.can_commit {
                "ready".green().bold().to_string()
            } else {
                "blocked".red().bold().to_string()
            },
        },
    ];

    let summary_table = Table::new(summary_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()))
        .to_string();

    println!();
    println!("{summary_table}");
    println!();

    report.can_commit
}

// ─── Performance summary ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PerfRow {
    operation: String,
    target: String,
    bytes: String,
    #[tabled(rename = "time (ms)")]
    duration_ms: String,
    ok: String,
}

/// Print a performance timing table to stdout.
pub fn print_perf_summary(report: &PerfReport) {
    if report.timings.is_empty() {
        return;
    }

    println!("{}", "PERFORMANCE".bold().cyan());

    let rows: Vec<PerfRow> = report
        .timings
        .iter()
        .map(|t| PerfRow {
            operation: t.operation.dimmed().to_string(),
            target: t.target.bold().to_string(),
            bytes: t.bytes.to_string(),
            duration_ms: format_duration(t.duration_ms),
            ok: if t.ok {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            },
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..=3)).with(Alignment::right()))
        .to_string();

    println!("{table}");

    println!(
        "  Total: {} call(s)  ·  {} failed  ·  {} ms elapsed",
        report.timings.len().to_string().bold(),
        report.failures.to_string().bold(),
        format_duration(report.total_ms),
    );
    println!();
}

fn format_duration(ms: u128) -> String {
    if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0).yellow().to_string()
    } else if ms >= 100 {
        ms.to_string().yellow().to_string()
    } else {
        ms.to_string().green().to_string()
    }
}
