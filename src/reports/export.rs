use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::models::ReportData;

use super::ReportsError;

/// Requested download format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<ExportFormat> {
        match s {
            "csv" => Some(ExportFormat::Csv),
            "excel" => Some(ExportFormat::Excel),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// Rows belonging to the selected source file, or every row when no
/// filter is given
///
/// Matching is loose string equality on the `id` column, the same rule
/// the dashboard's file picker applies, so numeric ids match their
/// decimal form. An empty subset is an error so callers never ship an
/// empty export.
pub fn row_subset(
    data: &ReportData,
    file_id: Option<&str>,
) -> Result<Vec<Map<String, Value>>, ReportsError> {
    let Some(file_id) = file_id else {
        return Ok(data.rows.clone());
    };

    let rows: Vec<Map<String, Value>> = data
        .rows
        .iter()
        .filter(|row| row.get("id").map(|v| id_string(v) == file_id).unwrap_or(false))
        .cloned()
        .collect();

    if rows.is_empty() {
        return Err(ReportsError::NoExportData);
    }
    Ok(rows)
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Download name: `report_{template}_{scope}_{timestamp}.{ext}`
///
/// PDF scopes read `summary` or `file_{id}`; tabular scopes read `all`
/// or the bare id. The timestamp is RFC 3339 with colons and dots
/// replaced so the name survives every filesystem.
pub fn export_filename(
    template_id: &str,
    format: ExportFormat,
    file_id: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let scope = match (format, file_id) {
        (ExportFormat::Pdf, Some(id)) => format!("file_{id}"),
        (ExportFormat::Pdf, None) => "summary".to_string(),
        (_, Some(id)) => id.to_string(),
        (_, None) => "all".to_string(),
    };
    format!(
        "report_{template_id}_{scope}_{timestamp}.{}",
        format.extension()
    )
}
