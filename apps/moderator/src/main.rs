mod config;
mod detection;
mod errors;
mod events;
mod github;
mod llm_client;
mod moderation;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, RunMode};
use crate::events::TriggerEvent;
use crate::github::GitHubClient;
use crate::llm_client::OpenAiClient;
use crate::moderation::{ModerationOutcome, ModerationSettings, Moderator};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting moderator v{}", env!("CARGO_PKG_VERSION"));

    let oracle = OpenAiClient::new(config.openai_base_url.clone(), config.openai_api_key.clone())?;
    info!(
        "LLM client initialized (endpoint: {}, default model: {})",
        config.openai_base_url, config.default_model
    );

    let github = GitHubClient::new(config.github_api_url.clone(), config.github_token.clone())?;

    let settings = ModerationSettings::from_config(&config);
    info!("Prompts directory: {}", settings.prompts_dir.display());

    let moderator = Arc::new(Moderator::new(Arc::new(oracle), Arc::new(github), settings));

    match config.mode {
        RunMode::Action => run_action(&config, &moderator).await,
        RunMode::Server => serve(&config, moderator).await,
    }
}

/// Processes the single event GitHub Actions hands to the job, then exits.
async fn run_action(config: &Config, moderator: &Moderator) -> Result<()> {
    let event_name = config
        .event_name
        .as_deref()
        .context("GITHUB_EVENT_NAME must be set in action mode")?;
    let event_path = config
        .event_path
        .as_ref()
        .context("GITHUB_EVENT_PATH must be set in action mode")?;

    let raw = tokio::fs::read_to_string(event_path)
        .await
        .with_context(|| format!("Failed to read event payload {}", event_path.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&raw).context("Event payload is not valid JSON")?;

    let event = TriggerEvent::from_webhook(event_name, &payload);
    let outcome = moderator.moderate(&event).await?;

    match &outcome {
        ModerationOutcome::Flagged { flags, .. } => {
            info!("Moderation complete: spam={}, ai={}", flags.spam, flags.ai)
        }
        other => info!("Moderation complete: {other:?}"),
    }
    Ok(())
}

async fn serve(config: &Config, moderator: Arc<Moderator>) -> Result<()> {
    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set; deliveries will not be verified");
    }

    let state = AppState {
        moderator,
        webhook_secret: config.webhook_secret.clone(),
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
