use crate::domain::area::Area;
use crate::utils::error::{Result, WorkflowError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";

/// A single spreadsheet cell as seen by the processing rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

fn excel_epoch() -> NaiveDate {
    // 1900 date system; serial 60 is Excel's phantom 1900-02-29
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Excel serial in the 1900 date system. Excel has no serials before 1900-01-01
/// or after 9999-12-31.
pub fn date_to_excel_serial(date: NaiveDate) -> Result<f64> {
    let days = date.signed_duration_since(excel_epoch()).num_days();
    if !(2..=2_958_465).contains(&days) {
        return Err(WorkflowError::SerializationError {
            message: format!("date {} is outside the Excel date range", date),
        });
    }
    if days < 61 {
        Ok((days - 1) as f64)
    } else {
        Ok(days as f64)
    }
}

/// Ordered columns plus positional rows; every row has exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(WorkflowError::InvalidArgument {
                message: format!(
                    "row {} has {} values but the table has {} columns",
                    self.rows.len(),
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| WorkflowError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |r| r.get(column))
    }

    /// Same columns, rows chosen by index in the given order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    SplitByOffice,
    WholeTable,
}

/// Finished spreadsheet handed to the download sink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBlob {
    pub filename: String,
    pub label: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl OutputBlob {
    pub fn for_office(area: Area, office: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: format!("{}_oficina_{}_GEDO.xls", area.name(), office),
            label: format!("Descargar planilla de la oficina: {}", office),
            mime_type: XLS_MIME_TYPE,
            bytes,
        }
    }

    pub fn for_whole_table(area: Area, bytes: Vec<u8>) -> Self {
        Self {
            filename: format!("{}_oficina_COMPLETA_GEDO.xls", area.name()),
            label: "Descargar planilla".to_string(),
            mime_type: XLS_MIME_TYPE,
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    PendingOffices { offices: Vec<String> },
    IncompleteTable { missing_rows: usize },
}

impl Diagnostic {
    /// Text shown to the person who uploaded the workbook.
    pub fn message(&self) -> String {
        match self {
            Diagnostic::PendingOffices { offices } => {
                let list = offices
                    .iter()
                    .map(|o| format!("- {}", o))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Estas son las oficinas que no pueden ser procesadas porque faltan completar \
                     la fecha de egreso del cargo para algunas evaluaciones. \
                     Por favor completar y volver a realizar procedimiento.\n{}",
                    list
                )
            }
            Diagnostic::IncompleteTable { .. } => "No se puede procesar el documento porque faltan \
                 completar la fecha de egreso del cargo para algunas evaluaciones. \
                 Por favor completar y volver a realizar procedimiento."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub blobs: Vec<OutputBlob>,
    pub pending_offices: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub rows_in: usize,
    pub rows_out: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredBlob {
    pub filename: String,
    pub label: String,
    pub location: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub area: String,
    pub mode: ProcessingMode,
    pub delivered: Vec<DeliveredBlob>,
    pub pending_offices: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}
