use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use mensualizados::domain::model::Diagnostic;
use mensualizados::{
    process_request, Area, MemorySink, ProcessingRules, SourceWorkbook, StaticConfig, Value,
    WorkflowRequest,
};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

enum Cell {
    Empty,
    Text(&'static str),
    Number(f64),
    /// Serial in whichever date system the workbook declares, styled dd/mm/yyyy.
    Date(f64),
}

const HEADERS: [&str; 12] = [
    "Legajo",
    "Office",
    "Category",
    "Apellido y Nombre",
    "Cargo",
    "Evaluador",
    "Puntaje",
    "Start Date",
    "Departure Date of Position",
    "Observaciones",
    "Control",
    "Firma",
];

fn person(id: f64, office: &'static str, category: Cell, start: f64, departure: Cell) -> Vec<Cell> {
    vec![
        Cell::Number(id),
        Cell::Text(office),
        category,
        Cell::Text("Agente"),
        Cell::Text("Administrativo"),
        Cell::Empty,
        Cell::Number(8.0),
        Cell::Date(start),
        departure,
        Cell::Empty,
        Cell::Text("ok"),
        Cell::Text("firma"),
    ]
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Minimal workbook: one sheet, shared strings, and a cell style using a custom
/// dd/mm/yyyy number format for date cells.
fn build_xlsx(sheet: &str, date1904: bool, rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut intern = |s: &str| -> usize {
        match strings.iter().position(|x| x == s) {
            Some(i) => i,
            None => {
                strings.push(s.to_string());
                strings.len() - 1
            }
        }
    };

    let mut sheet_rows = String::new();
    let header: Vec<Cell> = HEADERS.iter().map(|&h| Cell::Text(h)).collect();
    for (r, row) in std::iter::once(&header).chain(rows.iter()).enumerate() {
        sheet_rows.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => sheet_rows.push_str(&format!(
                    "<c r=\"{}\" t=\"s\"><v>{}</v></c>",
                    reference,
                    intern(*s)
                )),
                Cell::Number(n) => {
                    sheet_rows.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, n))
                }
                Cell::Date(serial) => sheet_rows.push_str(&format!(
                    "<c r=\"{}\" s=\"1\"><v>{}</v></c>",
                    reference, serial
                )),
            }
        }
        sheet_rows.push_str("</row>");
    }

    let shared_strings = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"{0}\" uniqueCount=\"{0}\">{1}</sst>",
        strings.len(),
        strings
            .iter()
            .map(|s| format!("<si><t xml:space=\"preserve\">{}</t></si>", xml_escape(s)))
            .collect::<String>()
    );

    let files: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
             <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
             <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
             <Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>\
             </Types>"
                .to_string(),
        ),
        (
            "_rels/.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <workbookPr date1904=\"{}\"/>\
                 <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets>\
                 </workbook>",
                if date1904 { "1" } else { "0" },
                xml_escape(sheet)
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
             <Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
             <Relationship Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" Target=\"sharedStrings.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/styles.xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
             <numFmts count=\"1\"><numFmt numFmtId=\"164\" formatCode=\"dd/mm/yyyy\"/></numFmts>\
             <cellXfs count=\"2\"><xf numFmtId=\"0\"/><xf numFmtId=\"164\" applyNumberFormat=\"1\"/></cellXfs>\
             </styleSheet>"
                .to_string(),
        ),
        ("xl/sharedStrings.xml", shared_strings),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
                 <sheetData>{}</sheetData></worksheet>",
                sheet_rows
            ),
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn read_back(bytes: Vec<u8>) -> Vec<Vec<Data>> {
    let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
    let range = wb.worksheet_range("Sheet1").unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn as_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) if dt.is_datetime() => dt.as_datetime().map(|d| d.date()),
        _ => None,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// 1900 date system serials
const JAN_1_2024: f64 = 45292.0;
const JUN_30_2024: f64 = 45473.0;
// the same days in the 1904 date system
const JAN_1_2024_1904: f64 = JAN_1_2024 - 1462.0;
const JUN_30_2024_1904: f64 = JUN_30_2024 - 1462.0;

#[test]
fn test_xlsx_sheet_reads_into_a_table() {
    let bytes = build_xlsx(
        "Junio",
        false,
        &[person(1.0, "Farmacia", Cell::Number(2.0), JAN_1_2024, Cell::Date(JUN_30_2024))],
    );
    let workbook = SourceWorkbook::from_bytes("mensualizados.xlsx", bytes).unwrap();
    assert_eq!(workbook.sheet_names(), &["Junio".to_string()]);

    let table = workbook.read_table("Junio", &ProcessingRules::default()).unwrap();
    assert_eq!(table.column_count(), 12);
    assert_eq!(table.get(0, "Office"), Some(&Value::text("Farmacia")));
    assert_eq!(table.get(0, "Category"), Some(&Value::Number(2.0)));
    assert_eq!(
        table.get(0, "Departure Date of Position"),
        Some(&Value::Date(ymd(2024, 6, 30)))
    );
    assert_eq!(table.get(0, "Evaluador"), Some(&Value::Missing));
}

#[test]
fn test_1904_workbook_dates_keep_their_calendar_day() {
    let bytes = build_xlsx(
        "Marzo",
        true,
        &[person(1.0, "Farmacia", Cell::Number(1.0), 43904.0, Cell::Date(43904.0))],
    );
    let workbook = SourceWorkbook::from_bytes("mac.xlsx", bytes).unwrap();
    let table = workbook.read_table("Marzo", &ProcessingRules::default()).unwrap();

    assert_eq!(table.get(0, "Start Date"), Some(&Value::Date(ymd(2024, 3, 15))));
    assert_eq!(
        table.get(0, "Departure Date of Position"),
        Some(&Value::Date(ymd(2024, 3, 15)))
    );
}

#[tokio::test]
async fn test_xlsx_upload_splits_by_office() {
    let bytes = build_xlsx(
        "Junio",
        false,
        &[
            person(1.0, "Farmacia", Cell::Text("NOT CATEGORIZED"), JAN_1_2024, Cell::Date(JUN_30_2024)),
            person(2.0, "Guardia", Cell::Number(1.0), JAN_1_2024, Cell::Empty),
            person(3.0, "Farmacia", Cell::Number(3.0), JAN_1_2024, Cell::Date(JUN_30_2024)),
            person(4.0, "Guardia", Cell::Number(1.0), JAN_1_2024, Cell::Text("Send designation note")),
        ],
    );
    let request = WorkflowRequest {
        area: Area::SaludPublica,
        split_by_office: false,
        workbook: Some(SourceWorkbook::from_bytes("mensualizados.xlsx", bytes).unwrap()),
        sheet: Some("Junio".to_string()),
    };
    let sink = MemorySink::new();

    let report = process_request(request, &StaticConfig::default(), &sink)
        .await
        .unwrap();

    assert_eq!(report.pending_offices, vec!["Guardia".to_string()]);
    let blobs = sink.take();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].filename, "SALUD PUBLICA_oficina_Farmacia_GEDO.xls");

    let rows = read_back(blobs[0].bytes.clone());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].len(), 9);
    assert_eq!(rows[1][2], Data::Float(999.0));
    assert_eq!(as_date(&rows[1][7]), Some(ymd(2024, 1, 1)));
    assert_eq!(as_date(&rows[2][8]), Some(ymd(2024, 6, 30)));
}

#[tokio::test]
async fn test_1904_xlsx_upload_emits_the_same_days() {
    let bytes = build_xlsx(
        "Junio",
        true,
        &[person(1.0, "Farmacia", Cell::Number(1.0), JAN_1_2024_1904, Cell::Date(JUN_30_2024_1904))],
    );
    let request = WorkflowRequest {
        area: Area::SaludPublica,
        split_by_office: false,
        workbook: Some(SourceWorkbook::from_bytes("mac.xlsx", bytes).unwrap()),
        sheet: Some("Junio".to_string()),
    };
    let sink = MemorySink::new();

    process_request(request, &StaticConfig::default(), &sink)
        .await
        .unwrap();

    let rows = read_back(sink.take().remove(0).bytes);
    assert_eq!(as_date(&rows[1][7]), Some(ymd(2024, 1, 1)));
    assert_eq!(as_date(&rows[1][8]), Some(ymd(2024, 6, 30)));
}

#[tokio::test]
async fn test_xlsx_whole_table_blocks_on_missing_departure() {
    let bytes = build_xlsx(
        "Junio",
        false,
        &[
            person(1.0, "Despacho", Cell::Number(1.0), JAN_1_2024, Cell::Date(JUN_30_2024)),
            person(2.0, "Archivo", Cell::Number(1.0), JAN_1_2024, Cell::Empty),
        ],
    );
    let request = WorkflowRequest {
        area: Area::Gobierno,
        split_by_office: false,
        workbook: Some(SourceWorkbook::from_bytes("mensualizados.xlsx", bytes).unwrap()),
        sheet: Some("Junio".to_string()),
    };
    let sink = MemorySink::new();

    let report = process_request(request, &StaticConfig::default(), &sink)
        .await
        .unwrap();

    assert!(sink.blobs().is_empty());
    assert_eq!(
        report.diagnostics,
        vec![Diagnostic::IncompleteTable { missing_rows: 1 }]
    );
}

#[tokio::test]
async fn test_whitespace_departure_counts_as_filled() {
    let bytes = build_xlsx(
        "Junio",
        false,
        &[person(1.0, "Archivo", Cell::Number(1.0), JAN_1_2024, Cell::Text(" "))],
    );
    let request = WorkflowRequest {
        area: Area::SaludPublica,
        split_by_office: false,
        workbook: Some(SourceWorkbook::from_bytes("mensualizados.xlsx", bytes).unwrap()),
        sheet: Some("Junio".to_string()),
    };
    let sink = MemorySink::new();

    let report = process_request(request, &StaticConfig::default(), &sink)
        .await
        .unwrap();

    assert!(report.pending_offices.is_empty());
    assert_eq!(sink.blobs().len(), 1);
}
