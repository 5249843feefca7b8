//! Delimited-text export of report listings (CSV / TSV).
//!
//! Files open cleanly in spreadsheet tools: UTF-8 with a BOM, `\r\n` row
//! endings, and RFC 4180 quoting.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use shiftreport_core::ReportField;

use crate::types::StoredReport;

pub const BOM: char = '\u{feff}';

/// Heading of the creation-date column, which precedes the report fields.
pub const DATE_COLUMN: &str = "Fecha";

const ROW_END: &str = "\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn delimiter(&self) -> char {
        match self {
            ExportFormat::Csv => ',',
            ExportFormat::Tsv => '\t',
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export format '{0}' (expected csv or tsv)")]
pub struct UnknownFormat(String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// A rendered export, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
    /// Data rows, header excluded.
    pub rows: usize,
}

/// `conductores_{YYYY-MM-DD}.{ext}`
pub fn export_filename(date: NaiveDate, format: ExportFormat) -> String {
    format!("conductores_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// `dd/mm/yyyy, HH:MM` in `offset`.
pub fn format_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%d/%m/%Y, %H:%M").to_string()
}

/// Column headings, in order.
pub fn header() -> Vec<&'static str> {
    std::iter::once(DATE_COLUMN)
        .chain(ReportField::ALL.iter().map(|f| f.label()))
        .collect()
}

/// Render `reports` as one file named after `date`.
pub fn export_reports(
    reports: &[StoredReport],
    format: ExportFormat,
    offset: FixedOffset,
    date: NaiveDate,
) -> ExportFile {
    let delimiter = format.delimiter();
    let mut contents = String::new();
    contents.push(BOM);

    push_row(&mut contents, header().into_iter().map(Cow::Borrowed), delimiter);
    for stored in reports {
        let date_cell = stored
            .timestamp()
            .map(|ts| format_timestamp(ts, offset))
            .unwrap_or_default();
        let cells = std::iter::once(date_cell)
            .chain(ReportField::ALL.iter().map(|f| f.value_of(&stored.report)))
            .map(Cow::Owned);
        push_row(&mut contents, cells, delimiter);
    }

    let file = ExportFile {
        filename: export_filename(date, format),
        contents,
        rows: reports.len(),
    };
    tracing::info!(filename = %file.filename, rows = file.rows, "export rendered");
    file
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = Cow<'a, str>>, delimiter: char) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape_field(&cell, delimiter));
    }
    out.push_str(ROW_END);
}

/// Quote `value` if it contains the delimiter, a quote or a line break.
pub fn escape_field(value: &str, delimiter: char) -> Cow<'_, str> {
    if value.contains([delimiter, '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Read delimited text back into rows of cells.
///
/// Accepts what [`export_reports`] writes: optional BOM, quoted cells with
/// doubled quotes and embedded line breaks, `\r\n` or `\n` row endings.
pub fn parse_delimited(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                row_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
                row_started = false;
            }
            c if c == delimiter => {
                row.push(std::mem::take(&mut cell));
                row_started = true;
            }
            c => {
                cell.push(c);
                row_started = true;
            }
        }
    }

    if row_started {
        row.push(cell);
        rows.push(row);
    }
    rows
}
