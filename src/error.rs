use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::constants::{ERR_NO_EXPORT_DATA, ERR_REPORT_TIMEOUT, ERR_UPLOAD_IN_FLIGHT};
use crate::ingest::IngestError;
use crate::reports::ReportsError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Report pipeline error: {0}")]
    Reports(#[from] ReportsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Upload already in progress")]
    UploadInFlight,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::TaskJoin(ref e) => {
                tracing::error!("Task join error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Ingest(ref e) => {
                let status = match e {
                    IngestError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                    IngestError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
                    IngestError::Decode { ref detail } => {
                        tracing::warn!("Spreadsheet decode failed: {}", detail);
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                };
                (status, e.to_string())
            }
            AppError::Reports(ref e) => {
                let (status, message) = match e {
                    ReportsError::Timeout => {
                        (StatusCode::GATEWAY_TIMEOUT, ERR_REPORT_TIMEOUT.to_string())
                    }
                    ReportsError::Status(_) | ReportsError::Connect(_) | ReportsError::Network(_) => {
                        tracing::error!("Report service failure: {:?}", e);
                        (StatusCode::BAD_GATEWAY, e.to_string())
                    }
                    ReportsError::InvalidFormat => (StatusCode::BAD_GATEWAY, e.to_string()),
                    ReportsError::NoExportData => {
                        (StatusCode::NOT_FOUND, ERR_NO_EXPORT_DATA.to_string())
                    }
                    ReportsError::UnsupportedFormat(_) => {
                        (StatusCode::BAD_REQUEST, e.to_string())
                    }
                    ReportsError::Pdf(ref detail) => {
                        tracing::error!("PDF export failed: {}", detail);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to export PDF report. Please try again.".to_string(),
                        )
                    }
                };
                (status, message)
            }
            AppError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "User already exists".to_string())
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AppError::UploadInFlight => {
                (StatusCode::CONFLICT, ERR_UPLOAD_IN_FLIGHT.to_string())
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
