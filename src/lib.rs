//! ICTA Admin Portal Server Library
//!
//! Backend for the attendance analytics portal: spreadsheet ingestion,
//! report generation and export, user administration, security logs
//! and realtime change streaming over hosted Postgres.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod netmon;
pub mod realtime;
pub mod reports;
pub mod routes;

pub use config::Config;
pub use db::{Store, StoreRole};
pub use error::{AppError, Result};
pub use realtime::RealtimeHub;
pub use reports::ReportsClient;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tokio::sync::Semaphore;

use crate::constants::UPLOAD_BODY_SLACK_BYTES;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Anon-key store for dashboard reads and uploads
    pub public: Store,
    /// Service-role store for user management writes
    pub privileged: Store,
    pub reports: ReportsClient,
    pub realtime: RealtimeHub,
    /// Single-flight gate for spreadsheet uploads
    pub upload_gate: Arc<Semaphore>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        public: Store,
        privileged: Store,
        reports: ReportsClient,
        realtime: RealtimeHub,
        config: Config,
    ) -> Self {
        Self {
            public,
            privileged,
            reports,
            realtime,
            upload_gate: Arc::new(Semaphore::new(1)),
            config,
        }
    }
}

/// Build the API router over the given state
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes() as usize + UPLOAD_BODY_SLACK_BYTES;

    Router::new()
        .route("/api/health", get(routes::health_check))
        .route("/api/analysis/upload", post(routes::upload_analysis))
        .route("/api/analysis", get(routes::list_analysis))
        .route("/api/analysis/latest", get(routes::latest_analysis))
        .route("/api/reports/templates", get(routes::list_templates))
        .route(
            "/api/reports/generate/:template_id",
            post(routes::generate_report),
        )
        .route("/api/reports/export/:format", get(routes::export_report))
        .route("/api/users", get(routes::list_users).post(routes::create_user))
        .route("/api/users/activity", get(routes::activity_log))
        .route("/api/users/:user_id/role", put(routes::update_user_role))
        .route("/api/auth/events", post(routes::record_auth_event))
        .route("/api/security/auth-logs", get(routes::list_auth_logs))
        .route("/api/security/events", get(routes::list_security_events))
        .route("/api/network/metrics", get(routes::network_metrics))
        .route("/api/realtime/:table", get(routes::realtime_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
