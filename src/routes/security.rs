use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::LOG_LISTING_LIMIT;
use crate::error::{AppError, Result};
use crate::models::{AuthLog, SecurityEvent};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthEventRequest {
    pub event_type: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AuthEventResponse {
    pub success: bool,
}

/// Record an authentication event (login, logout, failed_login)
///
/// Client address and user agent come from the request itself rather
/// than the body, so clients cannot spoof them.
pub async fn record_auth_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AuthEventRequest>,
) -> Result<Json<AuthEventResponse>> {
    if req.event_type.trim().is_empty() {
        return Err(AppError::InvalidInput("Missing event type".to_string()));
    }

    let ip_address = client_ip(&headers);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    state
        .public
        .insert_auth_log(req.user_id, &req.event_type, &ip_address, user_agent)
        .await?;

    tracing::info!("Auth event recorded: {} from {}", req.event_type, ip_address);

    Ok(Json(AuthEventResponse { success: true }))
}

/// Recent authentication events, newest first
pub async fn list_auth_logs(State(state): State<AppState>) -> Result<Json<Vec<AuthLog>>> {
    let logs = state.public.list_auth_logs(LOG_LISTING_LIMIT).await?;
    Ok(Json(logs))
}

/// All security events, newest first
pub async fn list_security_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<SecurityEvent>>> {
    let events = state.public.list_security_events().await?;
    Ok(Json(events))
}

/// Best-effort client address: first hop of X-Forwarded-For, else the
/// loopback placeholder the dashboard has always logged
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_defaults_to_loopback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
