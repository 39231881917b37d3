use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingest::ProcessedRow;

/// Analysis result row from the `analysis_results` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisRecord {
    pub id: i64,
    /// Original upload file name
    pub file_name: String,
    /// Stored analysis payload (rows plus summary statistics)
    pub data: Value,
    pub record_count: i32,
    pub session_date: Option<NaiveDate>,
    pub present_students: Option<i32>,
    pub total_students: Option<i32>,
    pub attendance_rate: Option<f64>,
    pub completed_assignments: Option<i32>,
    pub total_assignments: Option<i32>,
    pub completion_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns written when a processed upload is persisted
#[derive(Debug, Clone)]
pub struct NewAnalysisRecord {
    pub file_name: String,
    pub data: Value,
    pub record_count: i32,
    pub present_students: i32,
    pub total_students: i32,
    pub attendance_rate: f64,
    pub completed_assignments: i32,
    pub total_assignments: i32,
    pub completion_rate: f64,
}

/// JSON blob stored in `analysis_results.data`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPayload {
    pub rows: Vec<ProcessedRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<AnalysisSummary>,
}

/// Summary statistics derived from one uploaded sheet
///
/// Averages are fractions in 0..=1; the per-row rates they are built
/// from are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub attendance_avg: f64,
    pub completion_avg: f64,
    pub present_students: i64,
    pub total_students: i64,
    pub completed_assignments: i64,
    pub total_assignments: i64,
    /// SHA-256 of the uploaded bytes, hex encoded
    pub checksum: String,
}

impl NewAnalysisRecord {
    /// Assemble the insert row from a processed upload
    pub fn from_summary(file_name: &str, payload: Value, count: usize, stats: &AnalysisSummary) -> Self {
        NewAnalysisRecord {
            file_name: file_name.to_string(),
            data: payload,
            record_count: clamp_count(count as i64),
            present_students: clamp_count(stats.present_students),
            total_students: clamp_count(stats.total_students),
            attendance_rate: stats.attendance_avg * 100.0,
            completed_assignments: clamp_count(stats.completed_assignments),
            total_assignments: clamp_count(stats.total_assignments),
            completion_rate: stats.completion_avg * 100.0,
        }
    }
}

/// Sheet cells can sum past the 32-bit KPI columns; pin such counts to
/// the column bounds instead of wrapping
fn clamp_count(n: i64) -> i32 {
    n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_scales_averages_to_percentages() {
        let stats = AnalysisSummary {
            attendance_avg: 0.5,
            completion_avg: 0.25,
            present_students: 3,
            total_students: 6,
            completed_assignments: 1,
            total_assignments: 4,
            checksum: "00".to_string(),
        };

        let rec = NewAnalysisRecord::from_summary("week1.xlsx", Value::Null, 6, &stats);
        assert_eq!(rec.attendance_rate, 50.0);
        assert_eq!(rec.completion_rate, 25.0);
        assert_eq!(rec.record_count, 6);
        assert_eq!(rec.file_name, "week1.xlsx");
    }

    #[test]
    fn test_counts_wider_than_the_columns_clamp() {
        let stats = AnalysisSummary {
            attendance_avg: 1.0,
            completion_avg: 0.0,
            present_students: 3_000_000_000,
            total_students: i64::MAX,
            completed_assignments: -3_000_000_000,
            total_assignments: 12,
            checksum: "00".to_string(),
        };

        let rec = NewAnalysisRecord::from_summary("big.csv", Value::Null, 1, &stats);
        assert_eq!(rec.present_students, i32::MAX);
        assert_eq!(rec.total_students, i32::MAX);
        assert_eq!(rec.completed_assignments, i32::MIN);
        assert_eq!(rec.total_assignments, 12);
        assert_eq!(rec.record_count, 1);
    }
}
