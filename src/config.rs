use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::emissions::EmissionFactors;
use crate::insights::InsightSettings;

pub const DEFAULT_CONFIG_FILE: &str = "ecovision.yaml";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".to_string(), port: 8002 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_file: PathBuf::from("operational_data.json") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Usually supplied through `GROQ_API_KEY` rather than the file
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            api_key: None,
            model: InsightSettings::default().model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub name: String,
    pub industry_type: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        let settings = InsightSettings::default();
        Self { name: settings.factory_name, industry_type: settings.industry_type }
    }
}

/// Application configuration: YAML file first, then environment overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub factory: FactoryConfig,
    pub emission_factors: EmissionFactors,
}

impl AppConfig {
    /// Loads `path` when it exists and applies environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            let config = Self::from_yaml(&raw)
                .with_context(|| format!("Failed to parse config file {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Loads the file named by `ECOVISION_CONFIG`, or the default file
    pub fn from_env() -> Result<Self> {
        let path = env::var("ECOVISION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(path)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup("ECOVISION_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("ECOVISION_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("ECOVISION_PORT is not a valid port: {}", port))?;
        }
        if let Some(file) = lookup("ECOVISION_DATA_FILE") {
            self.storage.data_file = PathBuf::from(file);
        }
        if let Some(url) = lookup("ECOVISION_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("ECOVISION_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    pub fn insight_settings(&self) -> InsightSettings {
        InsightSettings {
            model: self.llm.model.clone(),
            factory_name: self.factory.name.clone(),
            industry_type: self.factory.industry_type.clone(),
        }
    }
}
