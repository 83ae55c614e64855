//! EcoVision
//!
//! Carbon-emission tracking for small factories:
//! - Emission engine turning daily operational records into kg CO2e
//! - JSON-file record store pushing snapshots to subscribers
//! - Dashboard state with date-window summaries
//! - AI pattern analysis, reduction recommendations and a chat assistant
//! - Markdown sustainability report
//! - HTTP API tying it together

pub mod config;
pub mod dashboard;
pub mod emissions;
pub mod insights;
pub mod report;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use config::AppConfig;
pub use emissions::{aggregate, compute_record_emissions, filter_by_date_range, EmissionFactors, OperationalRecord};
pub use store::{JsonRecordStore, RecordStore};
