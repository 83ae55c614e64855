use std::sync::Arc;
use tracing::{info, warn};

use super::provider::{ChatMessage, ChatRole, CompletionRequest, LLMProvider};
use crate::emissions::{aggregate, round2, EmissionFactors, EmissionSource, OperationalRecord};

pub const ASSISTANT_NAME: &str = "Eco";

const GREETING: &str = "Hello! How can I help you with your factory's data today?";
const FLOW_ERROR: &str = "I'm sorry, I'm having trouble understanding the conversation flow.";
const CONNECTION_ERROR: &str = "Sorry, I'm having trouble connecting right now. Please try again later.";

/// Chat assistant answering questions about the factory's records
pub struct Assistant {
    provider: Arc<dyn LLMProvider>,
    model: String,
    factors: EmissionFactors,
}

impl Assistant {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, factors: EmissionFactors) -> Self {
        Self { provider, model: model.into(), factors }
    }

    pub(crate) fn system_prompt(&self) -> String {
        let factor_lines = EmissionSource::ALL
            .iter()
            .map(|source| {
                format!(
                    "- {}: {} kg CO2 per {}",
                    source.label(),
                    self.factors.factor_for(*source),
                    source.unit()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are {name}, an AI assistant for the EcoVision platform. You help factory managers with direct answers about their carbon emissions data.\n\n\
             Keep answers extremely concise. No filler, only the essential information.\n\n\
             Emission factors:\n{factors}\n\n\
             Guidelines:\n\
             - Answer from the operational data supplied with the last message. Totals, averages, highs and lows are fine.\n\
             - State calculated results directly, e.g. \"Total emissions were 1234 kg CO2.\"\n\
             - If the data is empty, say \"No data available. Please add records.\"\n\
             - If the requested data is not available, say so.",
            name = ASSISTANT_NAME,
            factors = factor_lines
        )
    }

    /// Data context appended to the user's last turn
    pub(crate) fn data_context(&self, records: &[OperationalRecord]) -> String {
        if records.is_empty() {
            return "Context: The user has not provided any operational data yet.".to_string();
        }

        let json = serde_json::to_string_pretty(records).unwrap_or_default();
        let totals = match aggregate(records, &self.factors) {
            Ok(summary) => format!(
                "Computed totals: {} kg CO2 over {} days, intensity {} kg CO2 per unit.",
                round2(summary.total_emissions),
                summary.record_count,
                round2(summary.emission_intensity)
            ),
            Err(e) => format!("Computed totals unavailable: {}", e),
        };
        format!("Here is the user's operational data for context:\n{}\n{}", json, totals)
    }

    /// Replies to the conversation; failures become a fixed apology
    pub async fn respond(&self, history: &[ChatMessage], records: &[OperationalRecord]) -> String {
        let Some((last, earlier)) = history.split_last() else {
            return GREETING.to_string();
        };
        if last.role != ChatRole::User {
            return FLOW_ERROR.to_string();
        }

        let mut messages: Vec<ChatMessage> = earlier
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned()
            .collect();
        messages.push(ChatMessage::user(format!(
            "{}\n\n[CONTEXT FOR AI]\n{}\n[/CONTEXT FOR AI]",
            last.content,
            self.data_context(records)
        )));

        let request = CompletionRequest {
            model: self.model.clone(),
            system: Some(self.system_prompt()),
            messages,
            json_response: false,
        };

        match self.provider.complete(request).await {
            Ok(reply) => {
                info!("Assistant reply generated ({} chars)", reply.len());
                reply
            }
            Err(e) => {
                warn!("Assistant provider call failed: {}", e);
                CONNECTION_ERROR.to_string()
            }
        }
    }
}
