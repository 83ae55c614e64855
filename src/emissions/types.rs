use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Date format used by records and range bounds
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fuel channel of a record
///
/// `Unrecognized` keeps whatever string the storage layer handed over so the
/// engine can reject it instead of the document failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FuelType {
    Diesel,
    Coal,
    NaturalGas,
    Propane,
    None,
    Unrecognized(String),
}

impl FuelType {
    /// Wire name as stored in documents
    pub fn as_str(&self) -> &str {
        match self {
            FuelType::Diesel => "diesel",
            FuelType::Coal => "coal",
            FuelType::NaturalGas => "natural_gas",
            FuelType::Propane => "propane",
            FuelType::None => "none",
            FuelType::Unrecognized(raw) => raw,
        }
    }

    /// The emission source this fuel burns into, if any
    pub fn source(&self) -> Option<EmissionSource> {
        match self {
            FuelType::Diesel => Some(EmissionSource::Diesel),
            FuelType::Coal => Some(EmissionSource::Coal),
            FuelType::NaturalGas => Some(EmissionSource::NaturalGas),
            FuelType::Propane => Some(EmissionSource::Propane),
            FuelType::None | FuelType::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, FuelType::Unrecognized(_))
    }
}

impl From<String> for FuelType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "diesel" => FuelType::Diesel,
            "coal" => FuelType::Coal,
            "natural_gas" | "naturalGas" => FuelType::NaturalGas,
            "propane" => FuelType::Propane,
            "none" => FuelType::None,
            _ => FuelType::Unrecognized(raw),
        }
    }
}

impl From<FuelType> for String {
    fn from(fuel: FuelType) -> Self {
        match fuel {
            FuelType::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for FuelType {
    type Err = String;

    /// Strict parse, unlike `From<String>` which never fails
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match FuelType::from(s.to_string()) {
            FuelType::Unrecognized(raw) => Err(format!("unrecognized fuel type '{}'", raw)),
            fuel => Ok(fuel),
        }
    }
}

impl Default for FuelType {
    fn default() -> Self {
        FuelType::None
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Energy sources carrying an emission factor, in breakdown order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionSource {
    Electricity,
    Diesel,
    Coal,
    NaturalGas,
    Propane,
}

impl EmissionSource {
    /// Fixed order used for breakdowns
    pub const ALL: [EmissionSource; 5] = [
        EmissionSource::Electricity,
        EmissionSource::Diesel,
        EmissionSource::Coal,
        EmissionSource::NaturalGas,
        EmissionSource::Propane,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EmissionSource::Electricity => "Electricity",
            EmissionSource::Diesel => "Diesel",
            EmissionSource::Coal => "Coal",
            EmissionSource::NaturalGas => "Natural Gas",
            EmissionSource::Propane => "Propane",
        }
    }

    /// Physical unit the factor is expressed per
    pub fn unit(&self) -> &'static str {
        match self {
            EmissionSource::Electricity => "kWh",
            EmissionSource::Diesel => "L",
            EmissionSource::Coal => "kg",
            EmissionSource::NaturalGas => "m³",
            EmissionSource::Propane => "L",
        }
    }

    fn index(&self) -> usize {
        match self {
            EmissionSource::Electricity => 0,
            EmissionSource::Diesel => 1,
            EmissionSource::Coal => 2,
            EmissionSource::NaturalGas => 3,
            EmissionSource::Propane => 4,
        }
    }
}

impl fmt::Display for EmissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// kg CO2-equivalent per physical unit of each source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionFactors {
    /// kg CO2e per kWh
    pub electricity: f64,
    /// kg CO2e per litre
    pub diesel: f64,
    /// kg CO2e per kg
    pub coal: f64,
    /// kg CO2e per m³
    pub natural_gas: f64,
    /// kg CO2e per litre
    pub propane: f64,
}

impl EmissionFactors {
    pub fn factor_for(&self, source: EmissionSource) -> f64 {
        match source {
            EmissionSource::Electricity => self.electricity,
            EmissionSource::Diesel => self.diesel,
            EmissionSource::Coal => self.coal,
            EmissionSource::NaturalGas => self.natural_gas,
            EmissionSource::Propane => self.propane,
        }
    }
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            electricity: 0.82,
            diesel: 2.68,
            coal: 2.42,
            natural_gas: 2.0,
            propane: 1.53,
        }
    }
}

/// One factory-day observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalRecord {
    pub id: String,
    /// `YYYY-MM-DD`; kept as text because stored documents may be malformed
    pub date: String,
    pub electricity_kwh: f64,
    #[serde(default)]
    pub fuel_type: FuelType,
    #[serde(default)]
    pub fuel_amount: f64,
    pub production_units: f64,
    #[serde(default)]
    pub production_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_image_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acoustic_analysis_summary: Option<String>,
}

impl OperationalRecord {
    /// Strict `YYYY-MM-DD` parse; `None` for anything else
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }

    /// Chronological order; unparseable dates sort first, then by raw text
    pub fn cmp_by_date(&self, other: &Self) -> Ordering {
        self.parsed_date()
            .cmp(&other.parsed_date())
            .then_with(|| self.date.cmp(&other.date))
    }

    /// Fuel amount with its unit, e.g. `50 L`; `None` when no fuel was burnt
    pub fn fuel_display(&self) -> Option<String> {
        let source = self.fuel_type.source()?;
        if self.fuel_amount > 0.0 {
            Some(format!("{} {}", self.fuel_amount, source.unit()))
        } else {
            None
        }
    }
}

/// Emissions of a single record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmissionResult {
    pub electricity_emissions: f64,
    pub fuel_emissions: f64,
    pub total_emissions: f64,
}

/// One entry of a per-source breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceEmission {
    pub source: EmissionSource,
    pub emissions_kg: f64,
    pub percentage_of_total: f64,
}

/// Totals over a collection of records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateEmissionResult {
    pub total_emissions: f64,
    pub total_production_units: f64,
    pub emission_intensity: f64,
    pub average_daily_emissions: f64,
    pub record_count: usize,
    pub breakdown: Vec<SourceEmission>,
}

/// Per-source running sums, indexed in `EmissionSource::ALL` order
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SourceTotals([f64; 5]);

impl SourceTotals {
    pub(crate) fn add(&mut self, source: EmissionSource, kg: f64) {
        self.0[source.index()] += kg;
    }

    pub(crate) fn get(&self, source: EmissionSource) -> f64 {
        self.0[source.index()]
    }
}

/// Total emissions of one day, for chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEmission {
    pub date: String,
    pub total_emissions: f64,
}
