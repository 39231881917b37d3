//! End-to-end tests for the spreadsheet ingestion pipeline.
//!
//! Every test drives `process_upload` with real file bytes, the same
//! entry point the upload route hands the multipart body to. The XLSX
//! cases run against a minimal workbook assembled in memory so the
//! full decode path is exercised, not just the CSV shortcut.

use std::io::{Cursor, Write};

use icta_portal_server::ingest::{process_upload, IngestError, RowFlag};
use serde_json::json;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;

// =============================================================================
// Workbook Fixtures
// =============================================================================

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// One worksheet cell for the workbook builder
enum Cell<'a> {
    S(&'a str),
    N(f64),
}

fn cell_xml(cell: &Cell, col: usize, row: usize) -> String {
    let reference = format!("{}{}", (b'A' + col as u8) as char, row);
    match cell {
        Cell::S(s) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{s}</t></is></c>"#),
        Cell::N(n) => format!(r#"<c r="{reference}"><v>{n}</v></c>"#),
    }
}

/// Assemble a single-sheet XLSX around the given rows
fn xlsx_bytes(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            sheet.push_str(&cell_xml(cell, c, r + 1));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Three sessions with known rates: 50/100/0 attendance, 50/0/0 completion
fn attendance_sheet() -> Vec<Vec<Cell<'static>>> {
    vec![
        vec![
            Cell::S("name"),
            Cell::S("present"),
            Cell::S("total"),
            Cell::S("completed"),
        ],
        vec![Cell::S("Week 1"), Cell::N(1.0), Cell::N(2.0), Cell::N(1.0)],
        vec![Cell::S("Week 2"), Cell::N(2.0), Cell::N(2.0), Cell::N(0.0)],
        vec![Cell::S("Week 3"), Cell::N(0.0), Cell::N(1.0), Cell::N(0.0)],
    ]
}

/// The same sessions in CSV form
const ATTENDANCE_CSV: &[u8] =
    b"name,present,total,completed\nWeek 1,1,2,1\nWeek 2,2,2,0\nWeek 3,0,1,0\n";

fn assert_rates(rates: &[(f64, f64)], expected: &[(f64, f64)]) {
    assert_eq!(rates, expected, "derived rates diverged");
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_csv_upload_end_to_end() {
    let outcome = process_upload("attendance.csv", ATTENDANCE_CSV, 10, |_| {}).unwrap();

    assert_eq!(outcome.record_count, 3);
    assert_eq!(outcome.raw_rows.len(), 3);
    assert_eq!(outcome.raw_rows[0]["name"], json!("Week 1"));

    let rates: Vec<(f64, f64)> = outcome
        .processed_rows
        .iter()
        .map(|r| (r.attendance_rate, r.completion_rate))
        .collect();
    assert_rates(&rates, &[(50.0, 50.0), (100.0, 0.0), (0.0, 0.0)]);
    assert!(outcome.processed_rows.iter().all(|r| r.flags.is_empty()));

    let summary = outcome.summary;
    assert_eq!(summary.attendance_avg, 0.5);
    assert!((summary.completion_avg - 50.0 / 3.0 / 100.0).abs() < 1e-9);
    assert_eq!(summary.present_students, 3);
    assert_eq!(summary.total_students, 5);
    assert_eq!(summary.completed_assignments, 1);
}

#[test]
fn test_xlsx_upload_matches_csv_semantics() {
    let bytes = xlsx_bytes(&attendance_sheet());
    let outcome = process_upload("attendance.xlsx", &bytes, 10, |_| {}).unwrap();

    assert_eq!(outcome.record_count, 3);
    assert_eq!(outcome.raw_rows[1]["name"], json!("Week 2"));

    let rates: Vec<(f64, f64)> = outcome
        .processed_rows
        .iter()
        .map(|r| (r.attendance_rate, r.completion_rate))
        .collect();
    assert_rates(&rates, &[(50.0, 50.0), (100.0, 0.0), (0.0, 0.0)]);

    assert_eq!(outcome.summary.attendance_avg, 0.5);
    assert_eq!(outcome.summary.total_students, 5);
}

#[test]
fn test_xlsx_zero_total_rows_are_flagged_not_dropped() {
    let bytes = xlsx_bytes(&[
        vec![Cell::S("name"), Cell::S("present"), Cell::S("total")],
        vec![Cell::S("Week 1"), Cell::N(2.0), Cell::N(0.0)],
        vec![Cell::S("Week 2"), Cell::N(1.0), Cell::N(2.0)],
    ]);
    let outcome = process_upload("attendance.xlsx", &bytes, 10, |_| {}).unwrap();

    assert_eq!(outcome.record_count, 2);
    let flagged = &outcome.processed_rows[0];
    assert_eq!(flagged.attendance_rate, 0.0);
    assert!(flagged.flags.contains(&RowFlag::ZeroTotal));

    // The flag travels into the stored payload as a plain string
    let value = serde_json::to_value(flagged).unwrap();
    assert_eq!(value["flags"], json!(["zero_total"]));

    assert_eq!(outcome.processed_rows[1].attendance_rate, 50.0);
}

#[test]
fn test_non_numeric_cells_flag_the_offending_field() {
    let csv = b"name,present,total\nWeek 1,absent,2\n";
    let outcome = process_upload("attendance.csv", csv, 10, |_| {}).unwrap();

    let row = &outcome.processed_rows[0];
    assert_eq!(row.attendance_rate, 0.0);
    assert_eq!(row.flags, vec![RowFlag::NonNumeric("present".to_string())]);
    // The source cell survives verbatim for the dashboard to show
    assert_eq!(row.fields["present"], json!("absent"));
}

#[test]
fn test_progress_milestones_report_in_order() {
    let mut milestones = Vec::new();
    process_upload("attendance.csv", ATTENDANCE_CSV, 10, |m| milestones.push(m)).unwrap();
    assert_eq!(milestones, vec![30, 60, 80, 100]);
}

#[test]
fn test_size_ceiling_is_enforced_before_decoding() {
    let oversized = vec![0u8; 1_600_000];
    let err = process_upload("big.csv", &oversized, 1, |_| {}).unwrap_err();
    assert!(matches!(err, IngestError::TooLarge(1)));
    assert_eq!(err.to_string(), "File size exceeds 1MB limit");
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let err = process_upload("notes.txt", b"a,b\n1,2\n", 10, |_| {}).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_unreadable_workbook_reports_a_generic_decode_error() {
    let err = process_upload("attendance.xlsx", b"definitely not a zip", 10, |_| {}).unwrap_err();
    assert!(matches!(err, IngestError::Decode { .. }));
    // Decode detail stays in the log; clients get the generic message
    assert_eq!(err.to_string(), "Failed to process file");
}

#[test]
fn test_header_only_workbook_yields_an_empty_outcome() {
    let bytes = xlsx_bytes(&[vec![
        Cell::S("name"),
        Cell::S("present"),
        Cell::S("total"),
    ]]);

    let mut milestones = Vec::new();
    let outcome = process_upload("empty.xlsx", &bytes, 10, |m| milestones.push(m)).unwrap();

    assert_eq!(outcome.record_count, 0);
    assert!(outcome.processed_rows.is_empty());
    assert_eq!(outcome.summary.attendance_avg, 0.0);
    assert_eq!(outcome.summary.total_students, 0);
    // The pipeline still runs to completion
    assert_eq!(milestones.last(), Some(&100));
}

#[test]
fn test_summary_checksum_covers_the_uploaded_bytes() {
    let outcome = process_upload("attendance.csv", ATTENDANCE_CSV, 10, |_| {}).unwrap();
    let expected = hex::encode(Sha256::digest(ATTENDANCE_CSV));
    assert_eq!(outcome.summary.checksum, expected);

    // Any byte change shows up in the checksum
    let mut altered = ATTENDANCE_CSV.to_vec();
    altered.push(b'\n');
    let outcome = process_upload("attendance.csv", &altered, 10, |_| {}).unwrap();
    assert_ne!(outcome.summary.checksum, expected);
}
