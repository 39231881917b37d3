use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    ActivityWithEmail, AnalysisRecord, AuthLog, NetworkMetric, NetworkSample, NewAnalysisRecord,
    SecurityEvent, User, UserRole,
};

/// Credential tier a store handle was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    /// Anon key, for dashboard reads and uploads
    Public,
    /// Service role key, for user management writes
    Privileged,
}

impl StoreRole {
    fn application_name(self) -> &'static str {
        match self {
            StoreRole::Public => "portal-public",
            StoreRole::Privileged => "portal-privileged",
        }
    }
}

/// Thin adapter over the hosted Postgres tables
///
/// Two handles exist at runtime, one per credential tier. The schema
/// itself is managed by the hosting platform; this adapter only reads
/// and writes the agreed tables.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

/// Listing queries for the two security surfaces: the auth log pages
/// at the caller's cap, the events feed returns the full audit trail
const AUTH_LOGS_LISTING: &str = "SELECT * FROM auth_logs ORDER BY created_at DESC LIMIT $1";
const SECURITY_EVENTS_LISTING: &str = "SELECT * FROM security_events ORDER BY created_at DESC";

impl Store {
    /// Open a pooled connection using the given credential
    pub async fn connect(database_url: &str, role: StoreRole, key: &str) -> Result<Self, sqlx::Error> {
        let options = database_url
            .parse::<PgConnectOptions>()?
            .password(key)
            .application_name(role.application_name());

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(options)
            .await?;
        tracing::info!("Store connected ({})", role.application_name());

        Ok(Store { pool })
    }

    /// Wrap an existing pool (used by tests)
    pub fn from_pool(pool: PgPool) -> Self {
        Store { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cheap liveness probe for the health endpoint
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // analysis_results
    // =========================================================================

    /// Persist a processed upload and return the stored row
    pub async fn insert_analysis(&self, rec: &NewAnalysisRecord) -> Result<AnalysisRecord, sqlx::Error> {
        sqlx::query_as::<_, AnalysisRecord>(
            r#"
            INSERT INTO analysis_results
                (file_name, data, record_count, present_students, total_students,
                 attendance_rate, completed_assignments, total_assignments, completion_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&rec.file_name)
        .bind(&rec.data)
        .bind(rec.record_count)
        .bind(rec.present_students)
        .bind(rec.total_students)
        .bind(rec.attendance_rate)
        .bind(rec.completed_assignments)
        .bind(rec.total_assignments)
        .bind(rec.completion_rate)
        .fetch_one(&self.pool)
        .await
    }

    /// All stored analyses, newest first
    pub async fn list_analysis(&self) -> Result<Vec<AnalysisRecord>, sqlx::Error> {
        sqlx::query_as::<_, AnalysisRecord>(
            "SELECT * FROM analysis_results ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Most recent analysis, if any uploads exist
    pub async fn latest_analysis(&self) -> Result<Option<AnalysisRecord>, sqlx::Error> {
        sqlx::query_as::<_, AnalysisRecord>(
            "SELECT * FROM analysis_results ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    // =========================================================================
    // users / user_roles / activity_log
    // =========================================================================

    pub async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn insert_user(
        &self,
        email: &str,
        full_name: Option<&str>,
        is_active: bool,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, is_active)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(full_name)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_roles(&self) -> Result<Vec<UserRole>, sqlx::Error> {
        sqlx::query_as::<_, UserRole>("SELECT * FROM user_roles")
            .fetch_all(&self.pool)
            .await
    }

    /// Set a user's role, replacing any previous assignment
    pub async fn upsert_role(&self, user_id: Uuid, role: &str) -> Result<UserRole, sqlx::Error> {
        sqlx::query_as::<_, UserRole>(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET role = EXCLUDED.role, assigned_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn insert_activity(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        details: &Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO activity_log (user_id, action, details) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(action)
            .bind(details)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Recent activity joined with the acting user's email
    pub async fn list_activity(&self, limit: i64) -> Result<Vec<ActivityWithEmail>, sqlx::Error> {
        sqlx::query_as::<_, ActivityWithEmail>(
            r#"
            SELECT a.id, a.user_id, a.action, a.details, a.created_at, u.email AS user_email
            FROM activity_log a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    // =========================================================================
    // auth_logs / security_events
    // =========================================================================

    pub async fn insert_auth_log(
        &self,
        user_id: Option<Uuid>,
        event_type: &str,
        ip_address: &str,
        user_agent: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO auth_logs (user_id, event_type, ip_address, user_agent)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(event_type)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_auth_logs(&self, limit: i64) -> Result<Vec<AuthLog>, sqlx::Error> {
        sqlx::query_as::<_, AuthLog>(AUTH_LOGS_LISTING)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    /// Every recorded security event, newest first
    ///
    /// The audit view shows the full trail; only the auth log pages.
    pub async fn list_security_events(&self) -> Result<Vec<SecurityEvent>, sqlx::Error> {
        sqlx::query_as::<_, SecurityEvent>(SECURITY_EVENTS_LISTING)
            .fetch_all(&self.pool)
            .await
    }

    // =========================================================================
    // network_metrics
    // =========================================================================

    pub async fn insert_network_metric(&self, sample: &NetworkSample) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO network_metrics (latency, throughput, packet_loss, uptime)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(sample.latency)
        .bind(sample.throughput)
        .bind(sample.packet_loss)
        .bind(sample.uptime)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_network_metrics(&self, limit: i64) -> Result<Vec<NetworkMetric>, sqlx::Error> {
        sqlx::query_as::<_, NetworkMetric>(
            "SELECT * FROM network_metrics ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Drop samples older than the retention window, returning how many went
    pub async fn prune_network_metrics(&self, retention_hours: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM network_metrics WHERE created_at < now() - make_interval(hours => $1)",
        )
        .bind(retention_hours)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// True when the error is a Postgres unique constraint violation
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().map(|db| db.kind()),
        Some(sqlx::error::ErrorKind::UniqueViolation)
    )
}

/// True when the error is a Postgres foreign key violation
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().map(|db| db.kind()),
        Some(sqlx::error::ErrorKind::ForeignKeyViolation)
    )
}
