use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::constants::NETWORK_METRICS_DEFAULT_LIMIT;
use crate::error::Result;
use crate::models::NetworkMetric;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub limit: Option<i64>,
}

/// Recent network samples, newest first
///
/// The default limit matches the dashboard's 24-point sparkline.
pub async fn network_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<Vec<NetworkMetric>>> {
    let limit = params
        .limit
        .unwrap_or(NETWORK_METRICS_DEFAULT_LIMIT)
        .clamp(1, 1000);
    let metrics = state.public.list_network_metrics(limit).await?;
    Ok(Json(metrics))
}
