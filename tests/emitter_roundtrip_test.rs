use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use mensualizados::{emit, EmitLayout, ProcessingRules, RecordTable, SourceWorkbook, Value};
use std::io::Cursor;

fn columns() -> Vec<String> {
    [
        "Legajo",
        "Oficina",
        "Categoría",
        "Apellido y Nombre",
        "Cargo",
        "Evaluador",
        "Puntaje",
        "Fecha Inicio",
        "Fecha Egreso Cargo",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn parse(bytes: Vec<u8>) -> Vec<Vec<Data>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("Sheet1").unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn as_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) if dt.is_datetime() => dt.as_datetime().map(|d| d.date()),
        _ => None,
    }
}

#[test]
fn test_headers_values_and_dates_survive_a_round_trip() {
    let start = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
    let rows = vec![
        vec![
            Value::Number(10234.0),
            Value::text("Dirección de Atención Primaria"),
            Value::Number(999.0),
            Value::text("Núñez, María José"),
            Value::text("Enfermera"),
            Value::Missing,
            Value::Number(9.25),
            Value::Date(start),
            Value::Date(end),
        ],
        vec![
            Value::Number(10235.0),
            Value::text("Dirección de Atención Primaria"),
            Value::Number(2.0),
            Value::text("Paz, Luis"),
            Value::text("Chofer"),
            Value::text("Ruiz"),
            Value::Number(7.0),
            Value::Date(start),
            Value::Date(end),
        ],
    ];
    let table = RecordTable::from_rows(columns(), rows).unwrap();

    let parsed = parse(emit(&table, &EmitLayout::default()).unwrap());
    assert_eq!(parsed.len(), 3);

    let headers: Vec<String> = parsed[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(headers, columns());

    for (r, row) in table.rows().enumerate() {
        let cells = &parsed[r + 1];
        for (c, value) in row.iter().enumerate().take(7) {
            let expected = match value {
                Value::Missing => Data::Empty,
                Value::Text(s) => Data::String(s.clone()),
                Value::Number(n) => Data::Float(*n),
                Value::Date(_) => unreachable!(),
            };
            assert_eq!(cells[c], expected, "row {} column {}", r, c);
        }
        assert_eq!(as_date(&cells[7]), Some(start));
        assert_eq!(as_date(&cells[8]), Some(end));
    }
}

#[test]
fn test_date_columns_follow_the_layout() {
    let mut names = columns();
    names.push("Extra".to_string());
    let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let mut row = vec![Value::Missing; 10];
    row[0] = Value::Number(45351.0);
    row[9] = Value::Date(day);
    let table = RecordTable::from_rows(names, vec![row]).unwrap();

    let layout = EmitLayout {
        date_columns: vec![0],
        ..EmitLayout::default()
    };
    let parsed = parse(emit(&table, &layout).unwrap());

    // a number in a date column displays as a date
    assert_eq!(as_date(&parsed[1][0]), Some(day));
    // dates outside the date columns stay dates
    assert_eq!(as_date(&parsed[1][9]), Some(day));
}

#[test]
fn test_large_string_table_is_readable() {
    let rows: Vec<Vec<Value>> = (0..3000)
        .map(|i| {
            let mut row = vec![Value::Missing; 9];
            row[0] = Value::Number(i as f64);
            row[1] = Value::text(format!("Oficina número {}", i % 40));
            row[3] = Value::text(format!("Agente {:05} con un nombre bastante largo", i));
            row[8] = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1 + (i % 28) as u32).unwrap());
            row
        })
        .collect();
    let table = RecordTable::from_rows(columns(), rows).unwrap();

    let parsed = parse(emit(&table, &EmitLayout::default()).unwrap());

    assert_eq!(parsed.len(), 3001);
    assert_eq!(
        parsed[2999][3],
        Data::String("Agente 02998 con un nombre bastante largo".to_string())
    );
    assert_eq!(parsed[3000][1], Data::String("Oficina número 39".to_string()));
}

#[test]
fn test_emitted_file_is_accepted_as_input() {
    let day = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
    let mut row = vec![Value::Missing; 9];
    row[1] = Value::text("Tesorería");
    row[8] = Value::Date(day);
    let table = RecordTable::from_rows(columns(), vec![row]).unwrap();

    let rules = ProcessingRules::default();
    let bytes = emit(&table, &EmitLayout::from_rules(&rules)).unwrap();
    let workbook = SourceWorkbook::from_bytes("GEDO.xls", bytes).unwrap();
    let read = workbook.read_table("Sheet1", &rules).unwrap();

    assert_eq!(read.columns(), table.columns());
    assert_eq!(read.get(0, "Oficina"), Some(&Value::text("Tesorería")));
    assert_eq!(read.get(0, "Fecha Egreso Cargo"), Some(&Value::Date(day)));
}
