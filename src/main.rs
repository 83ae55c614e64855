//! EcoVision API server
//!
//! Loads configuration, opens the record store, wires the text-generation
//! provider and serves the HTTP API.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ecovision::dashboard::{spawn_store_sync, SharedState};
use ecovision::insights::{LLMProvider, OpenAICompatibleProvider};
use ecovision::server::{run_server, ServerState};
use ecovision::{AppConfig, JsonRecordStore, RecordStore};

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecovision=info,tower_http=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = AppConfig::from_env()?;
    info!("Starting EcoVision for {} ({})", config.factory.name, config.factory.industry_type);

    // Record store and dashboard mirror
    let store: Arc<dyn RecordStore> = Arc::new(
        JsonRecordStore::open(&config.storage.data_file)
            .await
            .with_context(|| format!("Failed to open record store {:?}", config.storage.data_file))?,
    );
    let dashboard = Arc::new(SharedState::new());
    let _sync = spawn_store_sync(store.clone(), dashboard.clone());

    // Text generation
    if config.llm.api_key.is_none() {
        warn!("GROQ_API_KEY is not set; AI insights will fail until it is configured");
    }
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAICompatibleProvider::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
    )?);

    let state = ServerState::new(
        store,
        dashboard,
        provider,
        config.insight_settings(),
        config.emission_factors,
    );
    run_server(state, &config.bind_addr()).await
}
