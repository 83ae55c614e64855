use super::error::EmissionError;
use super::types::{
    AggregateEmissionResult, DailyEmission, EmissionFactors, EmissionResult, EmissionSource,
    OperationalRecord, SourceEmission, SourceTotals,
};

/// Rounds to the 2-decimal convention used for kg CO2 display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn require_non_negative(record_id: &str, field: &str, value: f64) -> Result<(), EmissionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EmissionError::negative(record_id, field, value))
    }
}

/// Electricity and fuel emissions of one record
pub fn compute_record_emissions(
    record: &OperationalRecord,
    factors: &EmissionFactors,
) -> Result<EmissionResult, EmissionError> {
    require_non_negative(&record.id, "electricity_kwh", record.electricity_kwh)?;
    require_non_negative(&record.id, "fuel_amount", record.fuel_amount)?;
    if !record.fuel_type.is_recognized() {
        return Err(EmissionError::unrecognized_fuel(&record.id, record.fuel_type.as_str()));
    }

    let electricity_emissions = record.electricity_kwh * factors.electricity;
    let fuel_emissions = record
        .fuel_type
        .source()
        .map_or(0.0, |source| record.fuel_amount * factors.factor_for(source));

    let total_emissions = electricity_emissions + fuel_emissions;
    if !total_emissions.is_finite() {
        return Err(EmissionError::overflow(&record.id, "emissions"));
    }

    Ok(EmissionResult {
        electricity_emissions,
        fuel_emissions,
        total_emissions,
    })
}

/// Totals, intensity, daily average and per-source breakdown
///
/// Zero denominators resolve to `0` rather than `NaN`/`inf`; an empty input
/// yields an all-zero result.
pub fn aggregate<'a, I>(
    records: I,
    factors: &EmissionFactors,
) -> Result<AggregateEmissionResult, EmissionError>
where
    I: IntoIterator<Item = &'a OperationalRecord>,
{
    let mut totals = SourceTotals::default();
    let mut total_emissions = 0.0;
    let mut total_production_units = 0.0;
    let mut record_count = 0usize;

    for record in records {
        let result = compute_record_emissions(record, factors)?;
        require_non_negative(&record.id, "production_units", record.production_units)?;

        totals.add(EmissionSource::Electricity, result.electricity_emissions);
        if let Some(source) = record.fuel_type.source() {
            totals.add(source, result.fuel_emissions);
        }

        total_emissions += result.total_emissions;
        total_production_units += record.production_units;
        record_count += 1;
        if !total_emissions.is_finite() || !total_production_units.is_finite() {
            return Err(EmissionError::overflow(&record.id, "running total"));
        }
    }

    let emission_intensity = if total_production_units > 0.0 {
        total_emissions / total_production_units
    } else {
        0.0
    };
    let average_daily_emissions = if record_count > 0 {
        total_emissions / record_count as f64
    } else {
        0.0
    };

    let breakdown = EmissionSource::ALL
        .iter()
        .filter_map(|&source| {
            let emissions_kg = totals.get(source);
            (emissions_kg > 0.0).then(|| SourceEmission {
                source,
                emissions_kg,
                percentage_of_total: emissions_kg / total_emissions * 100.0,
            })
        })
        .collect();

    Ok(AggregateEmissionResult {
        total_emissions,
        total_production_units,
        emission_intensity,
        average_daily_emissions,
        record_count,
        breakdown,
    })
}

/// Total emissions per record, for the daily line chart
pub fn daily_series<'a, I>(
    records: I,
    factors: &EmissionFactors,
) -> Result<Vec<DailyEmission>, EmissionError>
where
    I: IntoIterator<Item = &'a OperationalRecord>,
{
    records
        .into_iter()
        .map(|record| {
            compute_record_emissions(record, factors).map(|result| DailyEmission {
                date: record.date.clone(),
                total_emissions: result.total_emissions,
            })
        })
        .collect()
}
