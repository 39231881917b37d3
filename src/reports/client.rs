use std::time::Duration;

use axum::body::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::{
    ERR_NO_EXPORT_DATA, ERR_REPORT_BAD_PAYLOAD, ERR_REPORT_TIMEOUT, ERR_REPORT_UNAVAILABLE,
    REPORT_ATTEMPT_TIMEOUT_MS, REPORT_MAX_RETRIES, REPORT_RETRY_DELAY_MS,
};
use crate::models::{ReportData, ReportTemplate};

use super::ExportFormat;

/// Total deadline for generate and export proxy calls
const PROXY_TIMEOUT_MS: u64 = 30_000;

/// Failures talking to or interpreting the reporting backend
#[derive(Error, Debug)]
pub enum ReportsError {
    #[error("{}", ERR_REPORT_TIMEOUT)]
    Timeout,

    #[error("{}: HTTP {0}", ERR_REPORT_UNAVAILABLE)]
    Status(reqwest::StatusCode),

    #[error("{}: {0}", ERR_REPORT_UNAVAILABLE)]
    Connect(#[source] reqwest::Error),

    #[error("Report request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{}", ERR_REPORT_BAD_PAYLOAD)]
    InvalidFormat,

    #[error("{}", ERR_NO_EXPORT_DATA)]
    NoExportData,

    #[error("Invalid export format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),
}

/// Retry behavior for the template listing
///
/// Retries apply only there: templates load on every dashboard visit
/// and a hiccup should heal itself, while generate and export are
/// user-triggered one-shots that surface their failure immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt fails
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: REPORT_MAX_RETRIES,
            retry_delay: Duration::from_millis(REPORT_RETRY_DELAY_MS),
            attempt_timeout: Duration::from_millis(REPORT_ATTEMPT_TIMEOUT_MS),
        }
    }
}

/// HTTP client for the reporting backend
#[derive(Debug, Clone)]
pub struct ReportsClient {
    base_url: String,
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl ReportsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(PROXY_TIMEOUT_MS))
            .build()?;
        Ok(ReportsClient {
            base_url: base_url.into(),
            http,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// List report templates, retrying failed attempts on a fixed delay
    ///
    /// Every failure mode is retried the same way; what differs is the
    /// final error, so a dead backend reads as a timeout and a refusing
    /// one as unreachable.
    pub async fn fetch_templates(&self) -> Result<Vec<ReportTemplate>, ReportsError> {
        let url = self.endpoint("/api/reports/templates");
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut last_err: Option<ReportsError> = None;

        for attempt in 1..=max_attempts {
            match self.try_fetch_templates(&url).await {
                Ok(templates) => {
                    if attempt > 1 {
                        info!(attempt, "template fetch recovered");
                    }
                    return Ok(templates);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "template fetch attempt failed");
                    last_err = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or(ReportsError::Timeout))
    }

    async fn try_fetch_templates(&self, url: &str) -> Result<Vec<ReportTemplate>, ReportsError> {
        let resp = self
            .http
            .get(url)
            .timeout(self.policy.attempt_timeout)
            .send()
            .await
            .map_err(classify)?;

        if !resp.status().is_success() {
            return Err(ReportsError::Status(resp.status()));
        }

        resp.json::<Vec<ReportTemplate>>().await.map_err(classify)
    }

    /// Run one template against the backend and return the typed payload
    pub async fn generate(&self, template_id: &str) -> Result<ReportData, ReportsError> {
        let url = self.endpoint(&format!("/api/reports/generate/{template_id}"));
        debug!(template_id, "generating report");

        let resp = self.http.post(&url).send().await.map_err(classify)?;
        if !resp.status().is_success() {
            return Err(ReportsError::Status(resp.status()));
        }

        resp.json::<ReportData>().await.map_err(classify)
    }

    /// Fetch a rendered CSV or Excel export from the backend
    pub async fn export_remote(
        &self,
        format: ExportFormat,
        template_id: &str,
        file_id: Option<&str>,
    ) -> Result<Bytes, ReportsError> {
        let url = self.endpoint(&format!("/api/reports/export/{}", format.as_str()));
        let mut query: Vec<(&str, &str)> = vec![("template_id", template_id)];
        if let Some(id) = file_id {
            query.push(("file_id", id));
        }

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(classify)?;
        if !resp.status().is_success() {
            return Err(ReportsError::Status(resp.status()));
        }

        resp.bytes().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> ReportsError {
    if e.is_timeout() {
        ReportsError::Timeout
    } else if e.is_connect() {
        ReportsError::Connect(e)
    } else if e.is_decode() {
        ReportsError::InvalidFormat
    } else {
        ReportsError::Network(e)
    }
}
