//! Record Store
//!
//! Owns the operational records and pushes a full snapshot to every
//! subscriber after each mutation. Consumers re-run the emission engine on
//! the snapshot instead of patching shared state in place.

mod json_store;

pub use json_store::JsonRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::emissions::{FuelType, OperationalRecord, DATE_FORMAT};

/// Shared immutable view of the record collection
pub type Snapshot = Arc<Vec<OperationalRecord>>;

/// Events pushed by a store
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The full collection after a mutation
    Snapshot(Snapshot),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("record store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record store document is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Data-entry payload; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub date: String,
    pub electricity_kwh: f64,
    #[serde(default)]
    pub fuel_type: FuelType,
    #[serde(default)]
    pub fuel_amount: f64,
    pub production_units: f64,
    #[serde(default)]
    pub production_hours: f64,
}

impl NewRecord {
    /// Checks the entry and returns it with the date normalized and the fuel
    /// amount zeroed when no fuel is selected
    pub fn validated(mut self) -> Result<Self, StoreError> {
        self.date = normalize_date(&self.date);
        if NaiveDate::parse_from_str(&self.date, DATE_FORMAT).is_err() {
            return Err(StoreError::Invalid(format!("date '{}' is not YYYY-MM-DD", self.date)));
        }
        if !self.fuel_type.is_recognized() {
            return Err(StoreError::Invalid(format!("unrecognized fuel type '{}'", self.fuel_type)));
        }
        let quantities = [
            ("electricity_kwh", self.electricity_kwh),
            ("fuel_amount", self.fuel_amount),
            ("production_units", self.production_units),
            ("production_hours", self.production_hours),
        ];
        for (field, value) in quantities {
            if !value.is_finite() || value < 0.0 {
                return Err(StoreError::Invalid(format!("{} must be a finite, non-negative number", field)));
            }
        }
        if self.fuel_type == FuelType::None {
            self.fuel_amount = 0.0;
        }
        Ok(self)
    }

    pub fn into_record(self, id: String) -> OperationalRecord {
        OperationalRecord {
            id,
            date: self.date,
            electricity_kwh: self.electricity_kwh,
            fuel_type: self.fuel_type,
            fuel_amount: self.fuel_amount,
            production_units: self.production_units,
            production_hours: self.production_hours,
            thermal_image_description: None,
            acoustic_analysis_summary: None,
        }
    }
}

/// Free-text diagnostics; the only in-place update a record accepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticNotes {
    #[serde(default)]
    pub thermal_image_description: Option<String>,
    #[serde(default)]
    pub acoustic_analysis_summary: Option<String>,
}

impl DiagnosticNotes {
    pub(crate) fn apply_to(self, record: &mut OperationalRecord) {
        record.thermal_image_description = self.thermal_image_description.filter(|s| !s.trim().is_empty());
        record.acoustic_analysis_summary = self.acoustic_analysis_summary.filter(|s| !s.trim().is_empty());
    }
}

/// Rewrites RFC 3339 timestamps and unpadded dates (`2024-1-5`) as
/// zero-padded `YYYY-MM-DD`; other strings pass through
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return ts.date_naive().format(DATE_FORMAT).to_string();
    }
    match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        Ok(date) => date.format(DATE_FORMAT).to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Storage collaborator
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current collection
    async fn snapshot(&self) -> Snapshot;

    /// Validate, assign an id and persist a new record
    async fn add(&self, entry: NewRecord) -> Result<OperationalRecord, StoreError>;

    /// Remove a record; `false` if the id was unknown
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Replace the diagnostic notes of a record
    async fn annotate(&self, id: &str, notes: DiagnosticNotes) -> Result<Option<OperationalRecord>, StoreError>;

    /// Receive a snapshot after every mutation
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
