use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::constants::LOG_LISTING_LIMIT;
use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::error::{AppError, Result};
use crate::models::{Role, User, UserRole, UserWithRole};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
    pub role: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub action: String,
    pub details: serde_json::Value,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// All users with their current role
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserWithRole>>> {
    let users = state.privileged.list_users().await?;
    let roles = state.privileged.list_roles().await?;

    let merged = users
        .into_iter()
        .map(|user| {
            let role = roles
                .iter()
                .find(|r| r.user_id == user.id)
                .map(|r| r.role.clone());
            UserWithRole { user, role }
        })
        .collect();

    Ok(Json(merged))
}

/// Create a user and assign their initial role
///
/// Runs on the privileged store; the anon credential cannot write the
/// user tables. The creation is recorded in the activity log.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserWithRole>> {
    // 1. Validate inputs before touching the database
    if !User::validate_email(&req.email) {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    let role = Role::parse(&req.role)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid role: {}", req.role)))?;

    // 2. Insert the user, mapping duplicate emails to a conflict
    let user = state
        .privileged
        .insert_user(&req.email, req.full_name.as_deref(), req.is_active)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::UserAlreadyExists
            } else {
                AppError::Database(e)
            }
        })?;

    // 3. Assign the role and record the action
    let assigned = state.privileged.upsert_role(user.id, role.as_str()).await?;
    state
        .privileged
        .insert_activity(
            Some(user.id),
            &format!("created {} user", role.as_str()),
            &json!({ "email": user.email, "full_name": user.full_name }),
        )
        .await?;

    tracing::info!("User created: {} ({})", user.email, role.as_str());

    Ok(Json(UserWithRole {
        user,
        role: Some(assigned.role),
    }))
}

/// Replace a user's role assignment
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<UserRole>> {
    let role = Role::parse(&req.role)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid role: {}", req.role)))?;

    // An unknown user surfaces as the role table's foreign key failing
    let assigned = state
        .privileged
        .upsert_role(user_id, role.as_str())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::UserNotFound
            } else {
                AppError::Database(e)
            }
        })?;
    tracing::info!("Role updated for {}: {}", user_id, assigned.role);

    Ok(Json(assigned))
}

/// Recent activity entries with the acting user's email
pub async fn activity_log(State(state): State<AppState>) -> Result<Json<Vec<ActivityResponse>>> {
    let entries = state.privileged.list_activity(LOG_LISTING_LIMIT).await?;

    let rows = entries
        .into_iter()
        .map(|entry| ActivityResponse {
            id: entry.id,
            action: entry.action,
            details: entry.details,
            user_email: entry.user_email.unwrap_or_else(|| "Unknown".to_string()),
            created_at: entry.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(rows))
}
