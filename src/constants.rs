/// Default upload ceiling in megabytes
/// Real attendance sheets run well under 1MB; 10MB leaves headroom
/// for multi-term workbooks without letting bulk junk through
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

/// Extra multipart framing allowance on top of the upload ceiling
pub const UPLOAD_BODY_SLACK_BYTES: usize = 1_048_576;

/// Ingestion progress milestones (percent)
pub const PROGRESS_FILE_READ: u8 = 30;
pub const PROGRESS_SHEET_DECODED: u8 = 60;
pub const PROGRESS_ROWS_DERIVED: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

/// Retries after the initial reporting-backend request fails
pub const REPORT_MAX_RETRIES: u32 = 3;

/// Fixed delay between reporting-backend attempts
pub const REPORT_RETRY_DELAY_MS: u64 = 1_000;

/// Per-attempt deadline for reporting-backend requests
pub const REPORT_ATTEMPT_TIMEOUT_MS: u64 = 5_000;

/// Notification channel the database triggers publish row changes on
pub const REALTIME_CHANNEL: &str = "portal_changes";

/// Buffered changes per subscriber before slow consumers start lagging
pub const REALTIME_BUFFER: usize = 256;

/// Listener reconnect backoff bounds (doubles from base up to cap)
pub const REALTIME_RECONNECT_BASE_MS: u64 = 1_000;
pub const REALTIME_RECONNECT_CAP_MS: u64 = 30_000;

/// Seconds between synthetic network samples
pub const NETWORK_SAMPLE_INTERVAL_SECS: u64 = 5;

/// Hours of network metrics kept before pruning
pub const NETWORK_RETENTION_HOURS: i32 = 24;

/// Default row limit for the network metrics endpoint
pub const NETWORK_METRICS_DEFAULT_LIMIT: i64 = 24;

/// Row limit for activity and auth log listings
pub const LOG_LISTING_LIMIT: i64 = 50;

/// Status chart dimensions in pixels
pub const CHART_WIDTH: u32 = 500;
pub const CHART_HEIGHT: u32 = 220;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for spreadsheets that fail to decode
pub const ERR_DECODE_FAILED: &str = "Failed to process file";

/// Error message for uploads with an unrecognized extension
pub const ERR_UNSUPPORTED_FORMAT: &str =
    "Unsupported file format - expected .xlsx, .xls, or .csv";

/// Error message when an upload arrives while another is still running
pub const ERR_UPLOAD_IN_FLIGHT: &str = "Another upload is already in progress";

/// Error message when the reporting backend exhausts its retry budget on timeouts
pub const ERR_REPORT_TIMEOUT: &str =
    "Report service is taking too long to respond. Please check if the backend is running.";

/// Error message when the reporting backend is unreachable or misbehaving
pub const ERR_REPORT_UNAVAILABLE: &str = "Failed to connect to report service";

/// Error message for report payloads missing their required shape
pub const ERR_REPORT_BAD_PAYLOAD: &str = "Invalid report data format received from backend";

/// Error message when an export subset matches no rows
pub const ERR_NO_EXPORT_DATA: &str = "No data available for the selected file to export.";
