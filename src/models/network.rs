use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored sample from the `network_metrics` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NetworkMetric {
    pub id: i64,
    /// Milliseconds
    pub latency: f64,
    /// Mbps
    pub throughput: f64,
    /// Percent
    pub packet_loss: f64,
    /// Percent
    pub uptime: f64,
    pub created_at: DateTime<Utc>,
}

/// A sample before it is written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSample {
    pub latency: f64,
    pub throughput: f64,
    pub packet_loss: f64,
    pub uptime: f64,
}
