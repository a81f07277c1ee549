use crate::domain::model::{RecordTable, Value};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};
use crate::utils::validation::validate_file_extensions;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// An uploaded workbook held in memory, with its sheet list read up front.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceWorkbook {
    filename: String,
    bytes: Vec<u8>,
    sheet_names: Vec<String>,
}

impl SourceWorkbook {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        validate_file_extensions("input", std::slice::from_ref(&filename), &ACCEPTED_EXTENSIONS)
            .map_err(|e| WorkflowError::UnsupportedFileType {
                file: filename.clone(),
                reason: e.to_string(),
            })?;

        let sheet_names = open_workbook_auto_from_rs(Cursor::new(bytes.as_slice()))?.sheet_names();
        tracing::debug!("Opened '{}' with sheets {:?}", filename, sheet_names);

        Ok(Self {
            filename,
            bytes,
            sheet_names,
        })
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self::from_bytes(filename, bytes)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Checks that `sheet` exists and may be processed under `rules`.
    pub fn check_sheet(&self, sheet: &str, rules: &ProcessingRules) -> Result<()> {
        if !self.sheet_names.iter().any(|s| s == sheet) {
            return Err(WorkflowError::UnknownSheet {
                sheet: sheet.to_string(),
            });
        }
        if rules.is_reserved_sheet(sheet) {
            return Err(WorkflowError::ReservedSheet {
                sheet: sheet.to_string(),
            });
        }
        Ok(())
    }

    /// Reads `sheet` into a table. The first row of the used range is the header.
    pub fn read_table(&self, sheet: &str, rules: &ProcessingRules) -> Result<RecordTable> {
        self.check_sheet(sheet, rules)?;

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))?;
        let range = workbook.worksheet_range(sheet)?;
        let table = range_to_table(&range)?;

        tracing::info!(
            "Read sheet '{}' from '{}': {} rows, {} columns",
            sheet,
            self.filename,
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }
}

fn range_to_table(range: &Range<Data>) -> Result<RecordTable> {
    // the used range may start right of column A; keep positions absolute
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    let mut rows = range.rows();

    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(RecordTable::default()),
    };

    let width = offset + header.len();
    let mut raw_headers = vec![Value::Missing; offset];
    raw_headers.extend(header.iter().map(cell_to_value));
    let mut table = RecordTable::new(header_names(&raw_headers));

    for cells in rows {
        let mut row = vec![Value::Missing; width];
        for (i, cell) in cells.iter().enumerate() {
            row[offset + i] = cell_to_value(cell);
        }
        if row.iter().all(Value::is_missing) {
            continue;
        }
        table.push_row(row)?;
    }

    Ok(table)
}

/// Column names from the header row: blanks become `Unnamed: {i}` and repeats
/// get a `.1`, `.2` suffix.
fn header_names(headers: &[Value]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let base = match value.to_string().trim() {
                "" => format!("Unnamed: {}", i),
                name => name.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

pub(crate) fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::String(s) if s.is_empty() => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // as_datetime honours the workbook's 1904 date system
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(datetime) if datetime.year() >= 1900 => Value::Date(datetime.date()),
            _ => Value::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => parse_iso_date(s).map_or_else(|| Value::Text(s.clone()), Value::Date),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
