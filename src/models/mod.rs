pub mod analysis;
pub mod network;
pub mod report;
pub mod security;
pub mod user;

pub use analysis::{AnalysisPayload, AnalysisRecord, AnalysisSummary, NewAnalysisRecord};
pub use network::{NetworkMetric, NetworkSample};
pub use report::{ReportAnalysis, ReportData, ReportTemplate};
pub use security::{AuthLog, SecurityEvent, Severity};
pub use user::{ActivityWithEmail, Role, User, UserRole, UserWithRole};
