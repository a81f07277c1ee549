use crate::core::biff::{self, RecordWriter, SharedStrings, XF_DATE, XF_GENERAL};
use crate::domain::model::{date_to_excel_serial, RecordTable, Value};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};

/// Where dates go and how they are displayed in the emitted sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitLayout {
    pub date_columns: Vec<usize>,
    pub date_format: String,
    pub sheet_name: String,
}

impl Default for EmitLayout {
    fn default() -> Self {
        Self::from_rules(&ProcessingRules::default())
    }
}

impl EmitLayout {
    pub fn from_rules(rules: &ProcessingRules) -> Self {
        Self {
            date_columns: rules.date_columns.clone(),
            date_format: rules.date_format.clone(),
            sheet_name: rules.output_sheet_name.chars().take(31).collect(),
        }
    }

    fn is_date_column(&self, col: usize) -> bool {
        self.date_columns.contains(&col)
    }

    /// Columns the table must have so every date column exists.
    pub fn required_columns(&self) -> usize {
        self.date_columns.iter().max().map_or(0, |&max| max + 1)
    }
}

/// Serializes `table` as a single-sheet BIFF8 workbook.
///
/// Row 0 holds the headers. Date columns get the layout's date format whatever
/// the value type; dates elsewhere use it too so they stay dates. Missing values
/// are written as blank cells.
pub fn emit(table: &RecordTable, layout: &EmitLayout) -> Result<Vec<u8>> {
    check_bounds(table, layout)?;

    let mut strings = SharedStrings::default();
    let sheet = write_sheet(table, layout, &mut strings)?;

    let mut globals = RecordWriter::new();
    globals.push(biff::RECORD_BOF, &biff::bof(biff::BOF_DT_WORKBOOK_GLOBALS))?;
    globals.push(biff::RECORD_CODEPAGE, &biff::codepage())?;
    globals.push(biff::RECORD_WINDOW1, &biff::window1())?;
    globals.push(biff::RECORD_DATEMODE, &biff::datemode())?;
    for _ in 0..4 {
        globals.push(biff::RECORD_FONT, &biff::font("Arial"))?;
    }
    globals.push(
        biff::RECORD_FORMAT,
        &biff::format_record(biff::FIRST_CUSTOM_FORMAT, &layout.date_format),
    )?;
    for _ in 0..XF_GENERAL {
        globals.push(biff::RECORD_XF, &biff::xf_record(0, 0, true))?;
    }
    globals.push(biff::RECORD_XF, &biff::xf_record(0, 0, false))?;
    globals.push(
        biff::RECORD_XF,
        &biff::xf_record(0, biff::FIRST_CUSTOM_FORMAT, false),
    )?;
    globals.push(biff::RECORD_STYLE, &biff::style_normal())?;

    let boundsheet_pos = globals.len() + 4;
    globals.push(biff::RECORD_BOUNDSHEET, &biff::boundsheet(&layout.sheet_name))?;
    strings.write_to(&mut globals)?;
    globals.push(biff::RECORD_EOF, &[])?;

    let sheet_offset = globals.len() as u32;
    globals.patch_u32(boundsheet_pos, sheet_offset);
    globals.extend(sheet);

    tracing::debug!(
        "Emitted sheet '{}': {} rows x {} columns, {} shared strings",
        layout.sheet_name,
        table.row_count(),
        table.column_count(),
        strings.unique()
    );

    biff::into_compound_file(globals.into_bytes())
}

fn check_bounds(table: &RecordTable, layout: &EmitLayout) -> Result<()> {
    let required = layout.required_columns();
    if table.column_count() < required {
        return Err(WorkflowError::SerializationError {
            message: format!(
                "table has {} columns but date column {} needs at least {}",
                table.column_count(),
                required - 1,
                required
            ),
        });
    }
    if table.column_count() > biff::MAX_COLUMNS {
        return Err(WorkflowError::SerializationError {
            message: format!(
                "table has {} columns, a .xls sheet holds {}",
                table.column_count(),
                biff::MAX_COLUMNS
            ),
        });
    }
    if table.row_count() + 1 > biff::MAX_ROWS {
        return Err(WorkflowError::SerializationError {
            message: format!(
                "table has {} rows, a .xls sheet holds {} including the header",
                table.row_count(),
                biff::MAX_ROWS
            ),
        });
    }
    Ok(())
}

fn write_sheet(
    table: &RecordTable,
    layout: &EmitLayout,
    strings: &mut SharedStrings,
) -> Result<RecordWriter> {
    let mut sheet = RecordWriter::new();
    sheet.push(biff::RECORD_BOF, &biff::bof(biff::BOF_DT_WORKSHEET))?;
    sheet.push(
        biff::RECORD_DIMENSIONS,
        &biff::dimensions(table.row_count() as u32 + 1, table.column_count() as u16),
    )?;
    sheet.push(biff::RECORD_WINDOW2, &biff::window2())?;

    for (col, name) in table.columns().iter().enumerate() {
        let sst = strings.intern(name)?;
        sheet.push(
            biff::RECORD_LABELSST,
            &biff::labelsst_cell(0, col as u16, XF_GENERAL, sst),
        )?;
    }

    for (index, row) in table.rows().enumerate() {
        // bounds were checked, both fit in u16
        let r = (index + 1) as u16;
        for (col, value) in row.iter().enumerate() {
            let c = col as u16;
            let xf = if layout.is_date_column(col) || matches!(value, Value::Date(_)) {
                XF_DATE
            } else {
                XF_GENERAL
            };
            match value {
                Value::Missing => sheet.push(biff::RECORD_BLANK, &biff::blank_cell(r, c, xf))?,
                Value::Text(s) => {
                    let sst = strings.intern(s)?;
                    sheet.push(biff::RECORD_LABELSST, &biff::labelsst_cell(r, c, xf, sst))?
                }
                Value::Number(n) => {
                    sheet.push(biff::RECORD_NUMBER, &biff::number_cell(r, c, xf, *n))?
                }
                Value::Date(d) => sheet.push(
                    biff::RECORD_NUMBER,
                    &biff::number_cell(r, c, xf, date_to_excel_serial(*d)?),
                )?,
            }
        }
    }

    sheet.push(biff::RECORD_EOF, &[])?;
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn nine_column_table() -> RecordTable {
        let columns = (0..9).map(|i| format!("col{}", i)).collect();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let row = vec![
            Value::text("Pérez, Ana"),
            Value::Number(20123456.0),
            Value::Missing,
            Value::text("Farmacia"),
            Value::Number(999.0),
            Value::Number(1.5),
            Value::text(""),
            Value::Date(start),
            Value::Date(end),
        ];
        RecordTable::from_rows(columns, vec![row]).unwrap()
    }

    #[test]
    fn fewer_columns_than_date_positions_is_rejected() {
        let columns = (0..8).map(|i| format!("c{}", i)).collect();
        let table = RecordTable::new(columns);
        let err = emit(&table, &EmitLayout::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::SerializationError { .. }));
    }

    #[test]
    fn too_many_columns_is_rejected() {
        let columns = (0..257).map(|i| format!("c{}", i)).collect();
        let table = RecordTable::new(columns);
        let err = emit(&table, &EmitLayout::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::SerializationError { .. }));
    }

    #[test]
    fn dates_before_1900_are_rejected() {
        let columns = (0..9).map(|i| format!("c{}", i)).collect();
        let mut row = vec![Value::Missing; 9];
        row[8] = Value::Date(NaiveDate::from_ymd_opt(1899, 6, 30).unwrap());
        let table = RecordTable::from_rows(columns, vec![row]).unwrap();

        let err = emit(&table, &EmitLayout::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::SerializationError { .. }));
    }

    #[test]
    fn layout_follows_rules() {
        let rules = ProcessingRules {
            date_columns: vec![2],
            output_sheet_name: "x".repeat(40),
            ..ProcessingRules::default()
        };
        let layout = EmitLayout::from_rules(&rules);
        assert_eq!(layout.required_columns(), 3);
        assert_eq!(layout.sheet_name.chars().count(), 31);
    }

    #[test]
    fn output_is_an_ole_container() {
        let bytes = emit(&nine_column_table(), &EmitLayout::default()).unwrap();
        assert_eq!(&bytes[..8], &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    }

    #[test]
    fn emitted_sheet_reads_back() {
        let table = nine_column_table();
        let bytes = emit(&table, &EmitLayout::default()).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Sheet1".to_string()]);
        let range = workbook.worksheet_range("Sheet1").unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 2);

        let headers: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(headers, table.columns().to_vec());

        let data = rows[1];
        assert_eq!(data[0], Data::String("Pérez, Ana".to_string()));
        assert_eq!(data[1], Data::Float(20123456.0));
        assert_eq!(data[2], Data::Empty);
        assert_eq!(data[4], Data::Float(999.0));
        assert_eq!(data[5], Data::Float(1.5));

        for (col, expected) in [(7usize, (2024, 2, 1)), (8, (2024, 2, 29))] {
            match &data[col] {
                Data::DateTime(dt) => {
                    assert!(dt.is_datetime());
                    let date = dt.as_datetime().unwrap().date();
                    let (y, m, d) = expected;
                    assert_eq!(date, NaiveDate::from_ymd_opt(y, m, d).unwrap());
                }
                other => panic!("column {} should be a date, got {:?}", col, other),
            }
        }
    }
}
