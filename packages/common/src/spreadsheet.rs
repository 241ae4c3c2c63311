use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Number, Value};

/// Spreadsheet upload formats understood by the importer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetFormat {
    /// Comma-separated text with a header row.
    Csv,
    /// Any workbook calamine can open (xlsx, xlsm, xlsb, xls, ods).
    Workbook,
}

impl SheetFormat {
    /// Pick a format from the uploaded file name and content type.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Self {
        let is_csv_name = file_name
            .map(|n| n.trim().to_ascii_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        let is_csv_type = content_type
            .map(|t| t.starts_with("text/csv") || t.starts_with("text/plain"))
            .unwrap_or(false);
        if is_csv_name || is_csv_type {
            Self::Csv
        } else {
            Self::Workbook
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("Unreadable workbook: {0}")]
    Workbook(String),
    #[error("Workbook has no worksheets")]
    NoSheets,
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Decode the first worksheet into one object per data row.
///
/// The first row holds the column headers. Empty cells are left out of the
/// row object and rows with no cells at all are skipped.
pub fn read_rows(bytes: &[u8], format: SheetFormat) -> Result<Vec<Map<String, Value>>, SpreadsheetError> {
    match format {
        SheetFormat::Csv => read_csv(bytes),
        SheetFormat::Workbook => read_workbook(bytes),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, SpreadsheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, v)| !h.is_empty() && !v.is_empty())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoSheets)?
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell_value(cell) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let row: Map<String, Value> = headers
            .iter()
            .zip(cells.iter())
            .filter(|(h, _)| !h.is_empty())
            .filter_map(|(h, cell)| cell_value(cell).map(|v| (h.clone(), v)))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::Number((*i).into())),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Some(Value::String(ndt.date().format("%Y-%m-%d").to_string())),
            None => Number::from_f64(dt.as_f64()).map(Value::Number),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
    }
}
