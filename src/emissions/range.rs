use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use super::error::EmissionError;
use super::types::{OperationalRecord, DATE_FORMAT};

/// Inclusive calendar window; a missing `end` selects the single day `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: None }
    }

    /// The `days` calendar days ending at `today`, both ends included
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: today - TimeDelta::days(span),
            end: Some(today),
        }
    }

    /// Parses `YYYY-MM-DD` bounds
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self, EmissionError> {
        let start = parse_date(start)?;
        let end = end.map(parse_date).transpose()?;
        Ok(Self { start, end })
    }

    pub fn end(&self) -> NaiveDate {
        self.end.unwrap_or(self.start)
    }

    /// Inclusive on both ends; empty when `start > end`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }

    pub fn filter<'a, I>(&self, records: I) -> Vec<&'a OperationalRecord>
    where
        I: IntoIterator<Item = &'a OperationalRecord>,
    {
        filter_by_date_range(records, self.start, self.end)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, EmissionError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| EmissionError::InvalidDate(raw.to_string()))
}

/// Records whose date lies in `[start, end]`, input order preserved
///
/// Records with an unparseable date are skipped rather than reported, so a
/// single bad document cannot block the rest of a report.
pub fn filter_by_date_range<'a, I>(
    records: I,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Vec<&'a OperationalRecord>
where
    I: IntoIterator<Item = &'a OperationalRecord>,
{
    let range = DateRange::new(start, end);
    records
        .into_iter()
        .filter(|record| match record.parsed_date() {
            Some(date) => range.contains(date),
            None => {
                tracing::debug!("Skipping record '{}' with malformed date '{}'", record.id, record.date);
                false
            }
        })
        .collect()
}
