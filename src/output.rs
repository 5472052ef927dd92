//! Report rendering and persistence.
//!
//! Supports the comma-separated table, pretty-printed JSON, and writing
//! either to a file.

use anyhow::Result;
use tracing::info;

use crate::analyzers::report::{Report, ReportRow};
use crate::analyzers::types::ReportKind;
use csv::{Terminator, WriterBuilder};
use std::fs;
use std::path::Path;

/// Header of the table: fixed leading columns, then one per category.
pub fn header(report: &Report) -> Vec<String> {
    let mut columns = vec![report.level.column_label().to_string(), "Direction".to_string()];
    if report.kind == ReportKind::FifteenMinute {
        columns.push("Time".to_string());
    }
    columns.extend(
        ["StationCount", "SumOfRecords", "StartTime", "EndTime"]
            .into_iter()
            .map(String::from),
    );
    columns.extend(report.category_names.iter().cloned());
    columns
}

fn record(kind: ReportKind, row: &ReportRow) -> Vec<String> {
    let mut fields = vec![row.entity.clone(), row.direction.to_string()];
    if kind == ReportKind::FifteenMinute {
        fields.push(row.time.map(|t| t.to_string()).unwrap_or_default());
    }
    fields.extend([
        row.coverage.to_string(),
        row.expected_records.to_string(),
        row.start_time.to_string(),
        row.end_time.to_string(),
    ]);
    fields.extend(row.counts.iter().map(u64::to_string));
    fields
}

/// Renders the report as a comma-separated table.
///
/// Rows keep the order of [`Report::rows`]; an empty report yields the
/// header line only.
pub fn format_table(report: &Report) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header(report))?;
    for row in &report.rows {
        writer.write_record(record(report.kind, row))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// The table preceded by the `"<region> <year>"` title line, when known.
pub fn format_titled(report: &Report) -> Result<String> {
    let table = format_table(report)?;
    Ok(match &report.title {
        Some(title) => format!("{title}\n{table}"),
        None => table,
    })
}

/// Renders the report as pretty-printed JSON.
pub fn format_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes rendered report text to `path`, replacing any existing file.
pub fn write_report(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    info!(path = %path.display(), bytes = text.len(), "Report written");
    Ok(())
}
