//! Reporting pipeline: typed client for the reporting backend, export
//! helpers for the three download formats, and local PDF assembly.

pub mod chart;
pub mod client;
pub mod export;
pub mod pdf;

pub use client::{ReportsClient, ReportsError, RetryPolicy};
pub use export::{export_filename, row_subset, ExportFormat};
pub use pdf::build_summary_pdf;
