//! Metadata file reading: delimited text and spreadsheets.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::format::MetadataFormat;
use crate::table::{MetadataTable, RawRow};
use limsync_core::{Error, Result};

/// A source line number with its raw cells.
type SourceLine = (u64, Vec<String>);

/// Load a metadata file into a table of string cells.
///
/// The first non-blank line is the header. The schema is not checked here;
/// see [`MetadataTable::validate`].
pub fn load_metadata(path: &Path) -> Result<MetadataTable> {
    let format = MetadataFormat::from_path(path)?;
    let lines = match format.delimiter() {
        Some(delimiter) => read_delimited(path, delimiter)?,
        None => read_workbook(path)?,
    };

    let table = build_table(lines)?;
    info!(
        "Loaded {} metadata rows ({} columns) from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<SourceLine>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Metadata(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| Error::Metadata(format!("{}: {}", path.display(), e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        lines.push((line, record.iter().map(str::to_string).collect()));
    }
    debug!("Read {} delimited lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Read the first worksheet of an xlsx/xls/ods workbook.
fn read_workbook(path: &Path) -> Result<Vec<SourceLine>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Metadata(format!("Failed to open {}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Metadata(format!("{} has no worksheets", path.display())))?
        .map_err(|e| Error::Metadata(format!("{}: {}", path.display(), e)))?;

    let first_row = range.start().map(|(row, _)| row as u64).unwrap_or(0);
    Ok(range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i as u64 + 1, row.iter().map(render_cell).collect()))
        .collect())
}

/// Render a spreadsheet cell the way it reads in the LIMS export.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => render_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => render_datetime(value),
            None => render_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            warn!("Spreadsheet cell error {:?} read as empty", e);
            String::new()
        }
    }
}

fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn render_datetime(value: NaiveDateTime) -> String {
    if value.hour() == 0 && value.minute() == 0 && value.second() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Turn raw lines into a table: header from the first non-blank line,
/// short rows padded. Header names are trimmed; cell text is kept exactly
/// as loaded so filenames match and values post unchanged.
fn build_table(lines: Vec<SourceLine>) -> Result<MetadataTable> {
    let mut lines = lines
        .into_iter()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()));

    let Some((header_line, header)) = lines.next() else {
        return Ok(MetadataTable::default());
    };

    let mut columns = Vec::with_capacity(header.len());
    let mut seen = HashSet::new();
    for (i, raw) in header.iter().enumerate() {
        let name = raw.trim_start_matches('\u{feff}').trim();
        let name = if name.is_empty() {
            format!("column_{}", i + 1)
        } else {
            name.to_string()
        };
        if !seen.insert(name.clone()) {
            return Err(Error::Metadata(format!(
                "line {}: duplicate column '{}'",
                header_line, name
            )));
        }
        columns.push(name);
    }

    let mut rows = Vec::new();
    for (line, mut cells) in lines {
        if cells.len() > columns.len() {
            if cells[columns.len()..].iter().any(|c| !c.trim().is_empty()) {
                return Err(Error::Metadata(format!(
                    "line {}: {} cells but the header has {} columns",
                    line,
                    cells.len(),
                    columns.len()
                )));
            }
            cells.truncate(columns.len());
        }
        cells.resize(columns.len(), String::new());

        rows.push(RawRow {
            line,
            values: columns
                .iter()
                .cloned()
                .zip(cells)
                .collect(),
        });
    }

    Ok(MetadataTable::new(columns, rows))
}
