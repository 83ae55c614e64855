//! Emission Engine
//!
//! Pure functions turning operational records into emission values, totals,
//! intensities and per-source breakdowns. Nothing here performs I/O or keeps
//! state between calls.

mod engine;
mod error;
mod range;
mod types;

pub use engine::{aggregate, compute_record_emissions, daily_series, round2};
pub use error::EmissionError;
pub use range::{filter_by_date_range, DateRange};
pub use types::{
    AggregateEmissionResult, DailyEmission, EmissionFactors, EmissionResult, EmissionSource,
    FuelType, OperationalRecord, SourceEmission, DATE_FORMAT,
};
