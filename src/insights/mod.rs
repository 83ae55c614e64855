//! Insights Module
//!
//! Boundary to the third-party text-generation service: prompt construction
//! for pattern analysis, reduction recommendations and the chat assistant,
//! plus the diagnostics stub. Engine values are embedded into prompts as
//! computed; nothing here re-derives them.

mod analysis;
mod assistant;
mod diagnostics;
mod provider;
mod rate_limiter;
mod recommendations;

pub use analysis::{analyze_emission_patterns, EmissionAnalysis};
pub use assistant::{Assistant, ASSISTANT_NAME};
pub use diagnostics::{DiagnosticAnalyzer, DiagnosticKind, UnconfiguredDiagnostics};
pub use provider::{ChatMessage, ChatRole, CompletionRequest, LLMProvider, OpenAICompatibleProvider};
pub use rate_limiter::{InsightKind, RateLimiter};
pub use recommendations::{generate_recommendations, Recommendations};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emissions::EmissionError;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("No operational data provided for analysis")]
    NoData,
    #[error("Analysis results are required to generate recommendations")]
    AnalysisRequired,
    #[error("Rate limit exceeded for {0}")]
    RateLimited(InsightKind),
    #[error("Provider response was not in the expected format: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Emission(#[from] EmissionError),
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Which model to ask and who is asking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSettings {
    pub model: String,
    pub factory_name: String,
    pub industry_type: String,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            factory_name: "My Factory".to_string(),
            industry_type: "manufacturing".to_string(),
        }
    }
}

/// Parses a JSON object out of a model reply, tolerating Markdown fences
pub(crate) fn parse_json_response<T: DeserializeOwned>(raw: &str) -> Result<T, InsightError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| InsightError::MalformedResponse(e.to_string()))
}
