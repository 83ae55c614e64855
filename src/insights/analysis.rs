use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::provider::{ChatMessage, CompletionRequest, LLMProvider};
use super::{parse_json_response, InsightError, InsightSettings};
use crate::emissions::{aggregate, round2, AggregateEmissionResult, EmissionFactors, OperationalRecord};

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a carbon emission analyst for small industrial factories. Study the daily operational data and the computed emission figures supplied by the user and identify patterns and inefficiencies. When thermal or acoustic diagnostics are attached to a day, take them into account.

Relate electricity and fuel consumption to production units and hours. Each value must be a single concise paragraph.

Respond ONLY with a JSON object of this exact shape:
{
  "overallEmissionSummary": "string",
  "peakUsageInsights": "string",
  "idleTimeInsights": "string",
  "inefficiencyInsights": "string",
  "abnormalEnergySpikes": "string",
  "potentialSavingsOverview": "string"
}"#;

/// Pattern analysis returned by the text-generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionAnalysis {
    pub overall_emission_summary: String,
    pub peak_usage_insights: String,
    pub idle_time_insights: String,
    pub inefficiency_insights: String,
    pub abnormal_energy_spikes: String,
    pub potential_savings_overview: String,
}

/// One prompt line per record
pub(crate) fn describe_record(record: &OperationalRecord) -> String {
    let mut entry = format!(
        "Date: {}, Electricity: {} kWh, Production: {} units, Hours: {}h",
        record.date, record.electricity_kwh, record.production_units, record.production_hours
    );
    if let Some(fuel) = record.fuel_display() {
        entry.push_str(&format!(", Fuel: {} ({})", fuel, record.fuel_type));
    }
    if let Some(ref thermal) = record.thermal_image_description {
        entry.push_str(&format!(", Thermal Anomaly: \"{}\"", thermal));
    }
    if let Some(ref acoustic) = record.acoustic_analysis_summary {
        entry.push_str(&format!(", Acoustic Anomaly: \"{}\"", acoustic));
    }
    entry
}

/// Engine totals restated for prompt context
pub(crate) fn describe_aggregate(summary: &AggregateEmissionResult) -> String {
    let mut lines = vec![
        format!("Total emissions: {} kg CO2", round2(summary.total_emissions)),
        format!("Average daily emissions: {} kg CO2", round2(summary.average_daily_emissions)),
        format!("Emission intensity: {} kg CO2 per unit", round2(summary.emission_intensity)),
    ];
    for entry in &summary.breakdown {
        lines.push(format!(
            "- {}: {} kg CO2 ({}% of total)",
            entry.source.label(),
            round2(entry.emissions_kg),
            round2(entry.percentage_of_total)
        ));
    }
    lines.join("\n")
}

pub(crate) fn build_analysis_prompt(
    settings: &InsightSettings,
    records: &[OperationalRecord],
    summary: &AggregateEmissionResult,
) -> String {
    let data = records.iter().map(describe_record).collect::<Vec<_>>().join("\n");

    format!(
        "Factory: {} ({})\nHere is the operational data for the last {} days:\n{}\n\nComputed emission figures:\n{}",
        settings.factory_name,
        settings.industry_type,
        records.len(),
        data,
        describe_aggregate(summary)
    )
}

/// Asks the provider for a pattern analysis of `records`
pub async fn analyze_emission_patterns(
    provider: &dyn LLMProvider,
    settings: &InsightSettings,
    records: &[OperationalRecord],
    factors: &EmissionFactors,
) -> Result<EmissionAnalysis, InsightError> {
    if records.is_empty() {
        return Err(InsightError::NoData);
    }

    let summary = aggregate(records, factors)?;
    let prompt = build_analysis_prompt(settings, records, &summary);

    info!("Requesting emission pattern analysis for {} records", records.len());
    let raw = provider
        .complete(CompletionRequest {
            model: settings.model.clone(),
            system: Some(ANALYSIS_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(prompt)],
            json_response: true,
        })
        .await?;

    parse_json_response(&raw).map_err(|e| {
        warn!("Analysis response could not be parsed: {}", e);
        e
    })
}
