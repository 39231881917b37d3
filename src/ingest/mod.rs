//! Spreadsheet ingestion pipeline: decode an uploaded workbook or CSV,
//! key rows by their header names, derive attendance and completion
//! rates, and summarize the sheet for persistence.

pub mod sheet;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::{
    ERR_DECODE_FAILED, ERR_UNSUPPORTED_FORMAT, PROGRESS_DONE, PROGRESS_FILE_READ,
    PROGRESS_ROWS_DERIVED, PROGRESS_SHEET_DECODED,
};
use crate::models::AnalysisSummary;

/// Ingestion failures, ordered by how early in the pipeline they occur
#[derive(Error, Debug)]
pub enum IngestError {
    /// Upload ceiling in megabytes
    #[error("File size exceeds {0}MB limit")]
    TooLarge(u64),

    #[error("{}", ERR_UNSUPPORTED_FORMAT)]
    UnsupportedFormat(String),

    /// Display stays generic; `detail` is for the server log only
    #[error("{}", ERR_DECODE_FAILED)]
    Decode { detail: String },
}

/// Accepted upload formats, keyed off the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Xlsx,
    Xls,
    Csv,
}

impl SheetKind {
    pub fn from_file_name(name: &str) -> Option<SheetKind> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(SheetKind::Xlsx),
            "xls" => Some(SheetKind::Xls),
            "csv" => Some(SheetKind::Csv),
            _ => None,
        }
    }
}

/// Quality marker attached to a row whose metrics could not be derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum RowFlag {
    /// The `total` field was present but zero or negative
    ZeroTotal,
    /// A well-known field held a value that does not parse as a number
    NonNumeric(String),
}

impl From<RowFlag> for String {
    fn from(flag: RowFlag) -> String {
        match flag {
            RowFlag::ZeroTotal => "zero_total".to_string(),
            RowFlag::NonNumeric(field) => format!("non_numeric:{field}"),
        }
    }
}

/// A source row with its derived metrics
///
/// Source fields are kept verbatim and flattened back into the JSON
/// object, so downstream consumers see the original columns alongside
/// `attendanceRate` and `completionRate`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRow {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "attendanceRate")]
    pub attendance_rate: f64,
    #[serde(rename = "completionRate")]
    pub completion_rate: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<RowFlag>,
}

impl ProcessedRow {
    /// Numeric view of a source field, if it parses
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(value_as_f64)
    }
}

/// Everything the upload handler needs after one file is processed
#[derive(Debug)]
pub struct IngestOutcome {
    pub raw_rows: Vec<Map<String, Value>>,
    pub processed_rows: Vec<ProcessedRow>,
    pub record_count: usize,
    pub summary: AnalysisSummary,
}

/// Run one upload through the full pipeline
///
/// `on_progress` is called with the coarse milestones (30/60/80/100)
/// as each stage completes. Rows that fail metric derivation are kept
/// with zeroed rates and flagged, never dropped; only a file that
/// cannot be decoded at all fails the upload.
pub fn process_upload(
    file_name: &str,
    bytes: &[u8],
    max_upload_mb: u64,
    mut on_progress: impl FnMut(u8),
) -> Result<IngestOutcome, IngestError> {
    if bytes.len() as u64 > max_upload_mb * 1024 * 1024 {
        return Err(IngestError::TooLarge(max_upload_mb));
    }

    let kind = SheetKind::from_file_name(file_name)
        .ok_or_else(|| IngestError::UnsupportedFormat(file_name.to_string()))?;
    on_progress(PROGRESS_FILE_READ);

    let raw_rows = sheet::decode_rows(kind, bytes)?;
    on_progress(PROGRESS_SHEET_DECODED);

    let processed_rows: Vec<ProcessedRow> = raw_rows.iter().cloned().map(derive_row).collect();
    on_progress(PROGRESS_ROWS_DERIVED);

    let summary = summarize(&processed_rows, bytes);
    let record_count = processed_rows.len();
    on_progress(PROGRESS_DONE);

    Ok(IngestOutcome {
        raw_rows,
        processed_rows,
        record_count,
        summary,
    })
}

/// Attach derived metrics to one source row
pub fn derive_row(fields: Map<String, Value>) -> ProcessedRow {
    let mut flags = Vec::new();
    let present = numeric_field(&fields, "present", &mut flags);
    let total = numeric_field(&fields, "total", &mut flags);
    let completed = numeric_field(&fields, "completed", &mut flags);

    if matches!(total, Some(t) if t <= 0.0) {
        flags.push(RowFlag::ZeroTotal);
    }

    ProcessedRow {
        attendance_rate: derive_rate(present, total),
        completion_rate: derive_rate(completed, total),
        fields,
        flags,
    }
}

/// Rates are defined only when numerator and denominator are both
/// positive; anything else flattens to zero rather than NaN
pub fn derive_rate(numerator: Option<f64>, total: Option<f64>) -> f64 {
    match (numerator, total) {
        (Some(n), Some(t)) if n > 0.0 && t > 0.0 => (n / t) * 100.0,
        _ => 0.0,
    }
}

fn numeric_field(fields: &Map<String, Value>, key: &str, flags: &mut Vec<RowFlag>) -> Option<f64> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match value_as_f64(value) {
            Some(n) => Some(n),
            None => {
                flags.push(RowFlag::NonNumeric(key.to_string()));
                None
            }
        },
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn summarize(rows: &[ProcessedRow], bytes: &[u8]) -> AnalysisSummary {
    let mut present = 0.0;
    let mut total = 0.0;
    let mut completed = 0.0;
    let mut attendance_sum = 0.0;
    let mut completion_sum = 0.0;

    for row in rows {
        present += row.numeric("present").unwrap_or(0.0);
        total += row.numeric("total").unwrap_or(0.0);
        completed += row.numeric("completed").unwrap_or(0.0);
        attendance_sum += row.attendance_rate;
        completion_sum += row.completion_rate;
    }

    // Averages are stored as fractions, per-row rates as percentages
    let (attendance_avg, completion_avg) = if rows.is_empty() {
        (0.0, 0.0)
    } else {
        let n = rows.len() as f64;
        (attendance_sum / n / 100.0, completion_sum / n / 100.0)
    };

    AnalysisSummary {
        attendance_avg,
        completion_avg,
        present_students: present.round() as i64,
        total_students: total.round() as i64,
        completed_assignments: completed.round() as i64,
        total_assignments: total.round() as i64,
        checksum: hex::encode(Sha256::digest(bytes)),
    }
}
