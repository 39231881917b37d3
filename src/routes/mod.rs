pub mod analysis;
pub mod health;
pub mod network;
pub mod realtime;
pub mod reports;
pub mod security;
pub mod users;

pub use analysis::{latest_analysis, list_analysis, upload_analysis};
pub use health::health_check;
pub use network::network_metrics;
pub use realtime::realtime_stream;
pub use reports::{export_report, generate_report, list_templates};
pub use security::{list_auth_logs, list_security_events, record_auth_event};
pub use users::{activity_log, create_user, list_users, update_user_role};
