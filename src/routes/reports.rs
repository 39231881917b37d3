use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{ReportData, ReportTemplate};
use crate::reports::{build_summary_pdf, export_filename, row_subset, ExportFormat, ReportsError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub template_id: String,
    pub file_id: Option<String>,
}

/// Report templates from the reporting backend (retried on failure)
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Vec<ReportTemplate>>> {
    let templates = state.reports.fetch_templates().await?;
    Ok(Json(templates))
}

/// Run one template and return the typed payload
pub async fn generate_report(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Result<Json<ReportData>> {
    let data = state.reports.generate(&template_id).await?;
    tracing::info!(
        "Report generated for template {}: {} rows",
        template_id,
        data.rows.len()
    );
    Ok(Json(data))
}

/// Download a report as csv, excel or pdf
///
/// Tabular formats are rendered by the backend and proxied through;
/// PDF is assembled here from the generated payload. When a file
/// filter is set, the subset is checked first so an empty selection
/// fails up front instead of shipping an empty download.
pub async fn export_report(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response> {
    // 1. Resolve the requested format
    let format = ExportFormat::parse(&format)
        .ok_or_else(|| AppError::Reports(ReportsError::UnsupportedFormat(format)))?;
    let file_id = params.file_id.as_deref();

    // 2. Produce the export bytes
    let bytes: Vec<u8> = match format {
        ExportFormat::Pdf => {
            let data = state.reports.generate(&params.template_id).await?;
            // Subset existence gates the export; the summary itself
            // stays whole-report
            row_subset(&data, file_id).map_err(AppError::Reports)?;

            let owned_id = params.file_id.clone();
            tokio::task::spawn_blocking(move || build_summary_pdf(&data, owned_id.as_deref()))
                .await?
                .map_err(AppError::Reports)?
        }
        ExportFormat::Csv | ExportFormat::Excel => {
            if file_id.is_some() {
                let data = state.reports.generate(&params.template_id).await?;
                row_subset(&data, file_id).map_err(AppError::Reports)?;
            }
            state
                .reports
                .export_remote(format, &params.template_id, file_id)
                .await?
                .to_vec()
        }
    };

    // 3. Attachment headers with the canonical download name
    let filename = export_filename(&params.template_id, format, file_id, Utc::now());
    tracing::info!("Exporting {} ({} bytes)", filename, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}
