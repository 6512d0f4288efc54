use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// How the process receives its trigger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One event read from `GITHUB_EVENT_PATH`, then exit (GitHub Actions).
    Action,
    /// Long-running webhook receiver.
    Server,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: RunMode,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub default_model: String,
    pub github_token: String,
    pub github_api_url: String,
    pub github_repository: Option<String>,
    pub event_name: Option<String>,
    pub event_path: Option<PathBuf>,
    pub prompts_dir: PathBuf,
    pub spam_label: String,
    pub ai_label: String,
    pub max_concurrency: usize,
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// Action inputs (`with:` in a workflow) arrive as `INPUT_<NAME>` variables
    /// and are honored when the plain variable is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or_input = |key: &str, input: &str| get(key).or_else(|| get(input));

        let event_path = get("GITHUB_EVENT_PATH").map(PathBuf::from);

        let mode = match get("MODERATOR_MODE").as_deref() {
            Some("action") => RunMode::Action,
            Some("server") => RunMode::Server,
            Some(other) => bail!("MODERATOR_MODE must be 'action' or 'server', got '{other}'"),
            None if event_path.is_some() => RunMode::Action,
            None => RunMode::Server,
        };

        Ok(Config {
            mode,
            openai_api_key: get("OPENAI_API_KEY").with_context(|| missing("OPENAI_API_KEY"))?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            default_model: get("DEFAULT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            github_token: get_or_input("GITHUB_TOKEN", "INPUT_TOKEN")
                .with_context(|| missing("GITHUB_TOKEN"))?,
            github_api_url: get("GITHUB_API_URL")
                .unwrap_or_else(|| "https://api.github.com".to_string()),
            github_repository: get("GITHUB_REPOSITORY"),
            event_name: get("GITHUB_EVENT_NAME"),
            event_path,
            prompts_dir: get("PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts"))),
            spam_label: get_or_input("SPAM_LABEL", "INPUT_SPAM-LABEL")
                .unwrap_or_else(|| "spam".to_string()),
            ai_label: get_or_input("AI_LABEL", "INPUT_AI-LABEL")
                .unwrap_or_else(|| "ai-generated".to_string()),
            max_concurrency: get("MAX_CONCURRENCY")
                .unwrap_or_else(|| "4".to_string())
                .parse::<usize>()
                .context("MAX_CONCURRENCY must be a non-negative integer")?,
            webhook_secret: get("WEBHOOK_SECRET"),
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn missing(key: &str) -> String {
    format!("Required environment variable '{key}' is not set")
}
