//! Dashboard State
//!
//! Explicit application state driven by a reducer, kept in sync with the
//! record store by pushing every snapshot through `dispatch`. The summary
//! re-runs the emission engine on each call; nothing is memoized.

mod state;

pub use state::{Action, AppState, DashboardEvent, LoadingFlags, SharedState};

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::emissions::{
    aggregate, daily_series, round2, AggregateEmissionResult, DailyEmission, DateRange, EmissionError,
    EmissionFactors, OperationalRecord,
};
use crate::store::{RecordStore, StoreEvent};

/// Window the dashboard shows when the caller picks none
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Everything the dashboard renders for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub range: DateRange,
    pub aggregate: AggregateEmissionResult,
    pub daily: Vec<DailyEmission>,
    /// Any records at all, regardless of window
    pub has_data: bool,
    pub has_filtered_data: bool,
}

impl DashboardSummary {
    /// Copy with every figure rounded for display
    pub fn rounded(&self) -> Self {
        let mut out = self.clone();
        let agg = &mut out.aggregate;
        agg.total_emissions = round2(agg.total_emissions);
        agg.total_production_units = round2(agg.total_production_units);
        agg.emission_intensity = round2(agg.emission_intensity);
        agg.average_daily_emissions = round2(agg.average_daily_emissions);
        for entry in agg.breakdown.iter_mut() {
            entry.emissions_kg = round2(entry.emissions_kg);
            entry.percentage_of_total = round2(entry.percentage_of_total);
        }
        for day in out.daily.iter_mut() {
            day.total_emissions = round2(day.total_emissions);
        }
        out
    }
}

/// Filters `records` to `range`, then aggregates and builds the chart series
pub fn summarize(
    records: &[OperationalRecord],
    range: DateRange,
    factors: &EmissionFactors,
) -> Result<DashboardSummary, EmissionError> {
    let mut filtered = range.filter(records);
    // Chart runs oldest to newest
    filtered.sort_by(|a, b| a.cmp_by_date(b));

    let aggregate = aggregate(filtered.iter().copied(), factors)?;
    let daily = daily_series(filtered.iter().copied(), factors)?;

    Ok(DashboardSummary {
        range,
        has_data: !records.is_empty(),
        has_filtered_data: !filtered.is_empty(),
        aggregate,
        daily,
    })
}

/// The default window ending at `today`
pub fn default_range(today: NaiveDate) -> DateRange {
    DateRange::last_days(today, DEFAULT_WINDOW_DAYS)
}

/// Window from optional query bounds; no bounds selects the default window
pub fn resolve_range(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<DateRange, EmissionError> {
    match (from, to) {
        (Some(from), to) => DateRange::parse(from, to),
        (None, None) => Ok(default_range(today)),
        (None, Some(to)) => Err(EmissionError::MissingStart(to.to_string())),
    }
}

/// Mirrors every store snapshot into `state`
///
/// Subscribes before reading the first snapshot so no mutation falls between
/// the two. The task ends when the store's channel closes.
pub fn spawn_store_sync(store: Arc<dyn RecordStore>, state: Arc<SharedState>) -> JoinHandle<()> {
    let mut rx = store.subscribe();

    tokio::spawn(async move {
        state.dispatch(Action::SetDataLoading(true)).await;
        let initial = store.snapshot().await;
        info!("Dashboard loaded {} records", initial.len());
        state.dispatch(Action::SetOperationalData(initial)).await;
        state.dispatch(Action::SetDataLoading(false)).await;

        loop {
            match rx.recv().await {
                Ok(StoreEvent::Snapshot(records)) => {
                    debug!("Dashboard received snapshot of {} records", records.len());
                    state.dispatch(Action::SetOperationalData(records)).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Dashboard sync lagged by {} snapshots, reloading", skipped);
                    let records = store.snapshot().await;
                    state.dispatch(Action::SetOperationalData(records)).await;
                }
                Err(RecvError::Closed) => {
                    info!("Record store closed, stopping dashboard sync");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::FuelType;

    fn record(id: &str, date: &str, kwh: f64) -> OperationalRecord {
        OperationalRecord {
            id: id.to_string(),
            date: date.to_string(),
            electricity_kwh: kwh,
            fuel_type: FuelType::None,
            fuel_amount: 0.0,
            production_units: 10.0,
            production_hours: 8.0,
            thermal_image_description: None,
            acoustic_analysis_summary: None,
        }
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_summary_sorts_and_filters() {
        let records = vec![
            record("b", "2024-01-03", 200.0),
            record("a", "2024-01-01", 100.0),
            record("x", "2023-12-01", 999.0),
        ];
        let range = DateRange::new(day("2024-01-01"), Some(day("2024-01-31")));
        let summary = summarize(&records, range, &EmissionFactors::default()).unwrap();

        assert!(summary.has_data);
        assert!(summary.has_filtered_data);
        assert_eq!(summary.aggregate.record_count, 2);
        let dates: Vec<_> = summary.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-03"]);
    }

    #[test]
    fn test_daily_series_orders_by_calendar_date() {
        let records = vec![record("feb", "2024-02-01", 10.0), record("jan", "2024-1-5", 10.0)];
        let range = DateRange::new(day("2024-01-01"), Some(day("2024-02-29")));
        let summary = summarize(&records, range, &EmissionFactors::default()).unwrap();
        let dates: Vec<_> = summary.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-1-5", "2024-02-01"]);
    }

    #[test]
    fn test_resolve_range_bounds() {
        let today = day("2024-03-31");
        assert_eq!(resolve_range(None, None, today).unwrap(), default_range(today));
        assert_eq!(
            resolve_range(Some("2024-01-01"), None, today).unwrap(),
            DateRange::single_day(day("2024-01-01"))
        );
        assert!(matches!(
            resolve_range(None, Some("2024-01-31"), today),
            Err(EmissionError::MissingStart(_))
        ));
    }

    #[test]
    fn test_empty_window_flags() {
        let records = vec![record("a", "2024-01-01", 100.0)];
        let summary = summarize(&records, DateRange::single_day(day("2024-02-01")), &EmissionFactors::default()).unwrap();
        assert!(summary.has_data);
        assert!(!summary.has_filtered_data);
        assert_eq!(summary.aggregate, AggregateEmissionResult::default());
    }

    #[test]
    fn test_default_range_spans_thirty_days() {
        let range = default_range(day("2024-01-30"));
        assert_eq!(range.start, day("2024-01-01"));
        assert_eq!(range.end(), day("2024-01-30"));
    }

    #[test]
    fn test_rounded_summary() {
        let records = vec![record("a", "2024-01-01", 1.0 / 3.0)];
        let summary = summarize(&records, DateRange::single_day(day("2024-01-01")), &EmissionFactors::default())
            .unwrap()
            .rounded();
        assert_eq!(summary.aggregate.total_emissions, 0.27);
        assert_eq!(summary.daily[0].total_emissions, 0.27);
    }
}
