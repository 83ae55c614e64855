use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// One chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a JSON object response
    pub json_response: bool,
}

/// Third-party text generation
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Any `/chat/completions` endpoint (Groq, OpenAI, vLLM)
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url, api_key })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(sys) = request.system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        for message in request.messages {
            messages.push(json!({ "role": message.role, "content": message.content }));
        }

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": 0.7,
        });
        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let mut http = self.client.post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .json(&body);

        if let Some(ref key) = self.api_key {
            http = http.bearer_auth(key);
        }

        debug!("Sending chat completion to {} ({})", self.base_url, request.model);
        let res = http.send().await?.error_for_status()?;
        let json: serde_json::Value = res.json().await?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("Failed to parse content from chat completion response")?;

        if content.trim().is_empty() {
            anyhow::bail!("Provider returned an empty response");
        }

        Ok(content.to_string())
    }
}
