mod progress;
mod render;
mod repl;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use query_engine::EngineConfig;
use rag_api_client::{HealthService, RagApiService, RagClientConfig};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file; running without one is fine.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", Level::WARN))
        .with(telemetry::layer())
        .init();

    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, ".env could not be loaded");
        }
    }

    let client_cfg = RagClientConfig::from_env().context("invalid RAG client configuration")?;
    let engine_cfg = EngineConfig::from_env().context("invalid query engine configuration")?;
    info!(base_url = %client_cfg.base(), poll = ?engine_cfg.poll, "starting");

    let health = HealthService::new(&client_cfg)?.check().await;
    if !health.ok {
        println!(
            "{}",
            format!("Backend not reachable at {}: {}", health.endpoint, health.message).yellow()
        );
    }

    let transport = Arc::new(RagApiService::new(client_cfg)?);
    repl::run(transport, engine_cfg.poll).await
}
