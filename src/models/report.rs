use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Report template as served by the reporting backend
///
/// `created_at` arrives as a naive timestamp string and is passed
/// through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: String,
    pub columns: Vec<String>,
    pub created_at: String,
}

/// Generated report payload
///
/// `columns` and `rows` are mandatory; a payload without both is
/// rejected as malformed. `analysis` is optional and defaults empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub analysis: Option<ReportAnalysis>,
}

/// Aggregate block attached to a generated report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportAnalysis {
    #[serde(default)]
    pub status_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub total_records: Option<u64>,
}

/// Human label for a status bucket, folding the null-ish values the
/// reporting backend emits into one bucket
pub fn status_label(status: &str) -> &str {
    match status {
        "" | "unknown" | "null" => "Pending/Unknown",
        other => other,
    }
}
