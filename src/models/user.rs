use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Portal user from the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role assignment from the `user_roles` table (one row per user)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
}

/// User joined with their current role for listings
#[derive(Debug, Clone, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<String>,
}

/// Activity row joined with the acting user's email
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityWithEmail {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    pub user_email: Option<String>,
}

/// Roles assignable through the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    /// Parse a role name, rejecting anything outside the known set
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "instructor" => Some(Role::Instructor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl User {
    /// Minimal email shape check before hitting the database
    pub fn validate_email(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && email.len() <= 254
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("instructor"), Some(Role::Instructor));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));

        // Unknown or wrongly cased names are rejected
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Student, Role::Instructor, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(User::validate_email("admin@icta.edu"));
        assert!(User::validate_email("a.b@sub.example.org"));

        assert!(!User::validate_email("no-at-sign"));
        assert!(!User::validate_email("@example.com"));
        assert!(!User::validate_email("user@nodot"));
        assert!(!User::validate_email("user@.com"));
    }
}
