use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::model::format_date;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    Empty,
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8")]
    Encoding,
}

/// One table row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayRow {
    columns: Vec<(String, String)>,
}

impl DisplayRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

pub fn export_filename(today: NaiveDate) -> String {
    format!("health-sphere-predictions-{}.csv", format_date(today))
}

/// Header from the first row's columns, then every value quoted. Columns a
/// row lacks export as empty strings. Lines are joined with `\n`.
pub fn rows_to_csv(rows: &[DisplayRow]) -> Result<String, ExportError> {
    let first = rows.first().ok_or(ExportError::Empty)?;
    let headers: Vec<&str> = first.columns().collect();

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(headers.iter().map(|h| row.get(h).unwrap_or("")))?;
    }
    let body = writer
        .into_inner()
        .map_err(|err| ExportError::Csv(err.into_error().into()))?;
    let body = String::from_utf8(body).map_err(|_| ExportError::Encoding)?;

    let mut output = headers.join(",");
    output.push('\n');
    output.push_str(body.strip_suffix('\n').unwrap_or(&body));
    Ok(output)
}
