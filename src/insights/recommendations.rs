use serde::{Deserialize, Serialize};
use tracing::info;

use super::analysis::{describe_aggregate, EmissionAnalysis};
use super::provider::{ChatMessage, CompletionRequest, LLMProvider};
use super::{parse_json_response, InsightError, InsightSettings};
use crate::emissions::{round2, AggregateEmissionResult};

const RECOMMENDATIONS_SYSTEM_PROMPT: &str = r#"You are a sustainability consultant for small industrial factories. From the emission analysis and figures supplied by the user, write smart, actionable recommendations to reduce the factory's carbon footprint. Where the analysis mentions thermal or acoustic diagnostics, reflect them.

Each recommendation is one complete paragraph covering what to do, why, and the estimated impact. Give 3 to 4 distinct recommendations.

Respond ONLY with a JSON object of the form {"recommendations": ["...", "..."]}."#;

/// Reduction recommendations returned by the text-generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<String>,
}

pub(crate) fn build_recommendations_prompt(analysis: &EmissionAnalysis, summary: &AggregateEmissionResult) -> String {
    // Serializing a plain struct of strings cannot fail
    let analysis_json = serde_json::to_string_pretty(analysis).unwrap_or_default();
    format!(
        "Current total emissions: {} kg CO2 per day\n{}\n\nHere is the analysis of the factory's emissions:\n{}",
        round2(summary.average_daily_emissions),
        describe_aggregate(summary),
        analysis_json
    )
}

/// Asks the provider for recommendations derived from `analysis`
pub async fn generate_recommendations(
    provider: &dyn LLMProvider,
    settings: &InsightSettings,
    analysis: Option<&EmissionAnalysis>,
    summary: &AggregateEmissionResult,
) -> Result<Recommendations, InsightError> {
    let analysis = analysis.ok_or(InsightError::AnalysisRequired)?;

    info!("Requesting reduction recommendations");
    let raw = provider
        .complete(CompletionRequest {
            model: settings.model.clone(),
            system: Some(RECOMMENDATIONS_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(build_recommendations_prompt(analysis, summary))],
            json_response: true,
        })
        .await?;

    let recommendations: Recommendations = parse_json_response(&raw)?;
    info!("Received {} recommendations", recommendations.recommendations.len());
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn analysis() -> EmissionAnalysis {
        EmissionAnalysis {
            overall_emission_summary: "Stable".to_string(),
            peak_usage_insights: String::new(),
            idle_time_insights: String::new(),
            inefficiency_insights: String::new(),
            abnormal_energy_spikes: String::new(),
            potential_savings_overview: String::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_array_is_accepted() {
        let provider = FixedProvider(r#"{"recommendations": []}"#);
        let result = generate_recommendations(
            &provider,
            &InsightSettings::default(),
            Some(&analysis()),
            &AggregateEmissionResult::default(),
        )
        .await
        .unwrap();
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_requires_analysis() {
        let provider = FixedProvider(r#"{"recommendations": ["x"]}"#);
        let err = generate_recommendations(&provider, &InsightSettings::default(), None, &AggregateEmissionResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::AnalysisRequired));
    }

    #[test]
    fn test_missing_array_is_malformed() {
        let err = parse_json_response::<Recommendations>(r#"{"recommendations": "switch off lights"}"#).unwrap_err();
        assert!(matches!(err, InsightError::MalformedResponse(_)));
    }

    #[test]
    fn test_prompt_states_daily_total() {
        let analysis = analysis();
        let summary = AggregateEmissionResult {
            total_emissions: 300.0,
            average_daily_emissions: 150.0,
            record_count: 2,
            ..Default::default()
        };
        let prompt = build_recommendations_prompt(&analysis, &summary);
        assert!(prompt.contains("Current total emissions: 150 kg CO2 per day"));
        assert!(prompt.contains("\"overallEmissionSummary\": \"Stable\""));
    }
}
