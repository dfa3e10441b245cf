use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Analyzer configuration loaded from environment variables.
/// Only the API key is required; every tunable has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Max tokens for the full analysis call.
    pub max_tokens: u32,
    /// Max tokens for the quick extraction call.
    pub quick_max_tokens: u32,
    /// Request-level bound on the model call, retries included.
    pub llm_timeout: Duration,
    pub llm_max_attempts: u32,
    pub llm_retry_delay: Duration,
    /// TTL for the criteria snapshot and historical corpus caches.
    pub cache_ttl: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            max_tokens: env_or("LLM_MAX_TOKENS", 4096)?,
            quick_max_tokens: env_or("LLM_QUICK_MAX_TOKENS", 512)?,
            llm_timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 120)?),
            llm_max_attempts: env_or("LLM_MAX_ATTEMPTS", 3)?,
            llm_retry_delay: Duration::from_millis(env_or("LLM_RETRY_DELAY_MS", 2000)?),
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", 300)?),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}
