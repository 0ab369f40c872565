use crate::domain::{ports::OutputWriter, report::SessionReport};
use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use self::{json::JsonWriter, text::TextWriter};

pub mod json;
pub mod text;

/// Register available writers - OCP: add new ones without touching main.rs
pub fn all_writers() -> Vec<Box<dyn OutputWriter>> {
    vec![Box::new(JsonWriter), Box::new(TextWriter)]
}

pub fn writer_for(format: &str) -> Option<Box<dyn OutputWriter>> {
    match format {
        "json" => Some(Box::new(JsonWriter)),
        "text" | "txt" => Some(Box::new(TextWriter)),
        _ => None,
    }
}

/// Writes the session report to disk via the chosen writer
pub fn write_to_file(
    writer: &dyn OutputWriter,
    report: &SessionReport,
    dir: &str,
) -> Result<PathBuf> {
    // Ensure the output directory exists
    fs::create_dir_all(dir)?;

    let content = writer.format(report)?;
    let path = PathBuf::from(dir).join(format!("{}.{}", report.session_id, writer.extension()));
    fs::write(&path, &content)?;
    Ok(path)
}
