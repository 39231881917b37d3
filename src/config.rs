use std::env;

use crate::constants::DEFAULT_MAX_UPLOAD_MB;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub anon_key: String,
    pub service_role_key: Option<String>,
    pub report_api_url: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_mb: u64,
    pub network_sampler_enabled: bool,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set (missing database configuration)")?;

        let anon_key = env::var("DB_ANON_KEY")
            .map_err(|_| "DB_ANON_KEY must be set (missing database configuration)")?;

        // Privileged operations fall back to the anon credential when absent
        let service_role_key = env::var("DB_SERVICE_ROLE_KEY").ok();

        let report_api_url =
            env::var("REPORT_API_URL").unwrap_or_else(|_| "http://localhost:8001".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse()
            .map_err(|_| "Invalid MAX_UPLOAD_MB")?;

        let network_sampler_enabled = env::var("NETWORK_SAMPLER_ENABLED")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            database_url,
            anon_key,
            service_role_key,
            report_api_url,
            allowed_origins,
            max_upload_mb,
            network_sampler_enabled,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Upload ceiling in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    /// Credential for privileged table access, falling back to the anon key
    pub fn service_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }
}
