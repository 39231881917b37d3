use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::ingest::{self, ProcessedRow};
use crate::models::{AnalysisPayload, AnalysisRecord, NewAnalysisRecord};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "rawData")]
    pub raw_data: Vec<Map<String, Value>>,
    #[serde(rename = "processedData")]
    pub processed_data: Vec<ProcessedRow>,
    #[serde(rename = "recordCount")]
    pub record_count: usize,
    pub analysis: AnalysisRecord,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    #[serde(rename = "totalStudents")]
    pub total_students: i32,
    #[serde(rename = "presentStudents")]
    pub present_students: i32,
    #[serde(rename = "attendanceRate")]
    pub attendance_rate: f64,
    #[serde(rename = "completionRate")]
    pub completion_rate: f64,
    pub latest: Option<AnalysisRecord>,
}

/// Upload and analyze one spreadsheet
///
/// # Pipeline
/// 1. Single-flight gate: concurrent uploads are rejected outright
/// 2. Size and format checks, then decode into header-keyed rows
/// 3. Derive attendance/completion rates per row (flagging, not dropping,
///    rows whose metrics cannot be computed)
/// 4. Persist the payload plus summary columns and return the stored row
pub async fn upload_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    // 1. One upload at a time; the dashboard disables its uploader while
    //    a run is active, so overlap means a second client
    let _permit = state
        .upload_gate
        .clone()
        .try_acquire_owned()
        .map_err(|_| AppError::UploadInFlight)?;

    // 2. Pull the file part out of the multipart body
    let mut file: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field
                .file_name()
                .ok_or_else(|| AppError::InvalidInput("Missing file name".to_string()))?
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {e}")))?;
            file = Some((name, bytes));
            break;
        }
    }
    let (file_name, bytes) = file
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;

    tracing::info!("Processing upload '{}' ({} bytes)", file_name, bytes.len());

    // 3. Decode and derive off the async runtime
    let max_upload_mb = state.config.max_upload_mb;
    let name_for_task = file_name.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        ingest::process_upload(&name_for_task, &bytes, max_upload_mb, |milestone| {
            tracing::debug!("Upload '{}' progress: {}%", name_for_task, milestone);
        })
    })
    .await??;

    // 4. Persist payload and summary columns
    let payload = serde_json::to_value(AnalysisPayload {
        rows: outcome.processed_rows.clone(),
        stats: Some(outcome.summary.clone()),
    })?;
    let record = NewAnalysisRecord::from_summary(
        &file_name,
        payload,
        outcome.record_count,
        &outcome.summary,
    );
    let stored = state.public.insert_analysis(&record).await?;

    tracing::info!(
        "Analysis stored for '{}': {} records, attendance {:.1}%",
        file_name,
        outcome.record_count,
        record.attendance_rate
    );

    Ok(Json(UploadResponse {
        raw_data: outcome.raw_rows,
        processed_data: outcome.processed_rows,
        record_count: outcome.record_count,
        analysis: stored,
    }))
}

/// All stored analyses, newest first
pub async fn list_analysis(State(state): State<AppState>) -> Result<Json<Vec<AnalysisRecord>>> {
    let records = state.public.list_analysis().await?;
    Ok(Json(records))
}

/// Headline numbers for the dashboard, from the most recent upload
pub async fn latest_analysis(State(state): State<AppState>) -> Result<Json<DashboardSummary>> {
    let latest = state.public.latest_analysis().await?;

    let summary = match latest {
        Some(record) => DashboardSummary {
            total_students: record.total_students.unwrap_or(0),
            present_students: record.present_students.unwrap_or(0),
            attendance_rate: record.attendance_rate.unwrap_or(0.0),
            completion_rate: record.completion_rate.unwrap_or(0.0),
            latest: Some(record),
        },
        None => DashboardSummary {
            total_students: 0,
            present_students: 0,
            attendance_rate: 0.0,
            completion_rate: 0.0,
            latest: None,
        },
    };

    Ok(Json(summary))
}
