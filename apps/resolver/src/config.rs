use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::resolution::{DEFAULT_MAX_RETRIES, DEFAULT_SERVICE_NAME, MAX_RETRIES_LIMIT};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// JSON document holding the user's profile (ground truth for every answer).
    pub profile_path: PathBuf,
    pub port: u16,
    pub rust_log: String,
    /// Label the engine acquires the conversation session under.
    pub service_name: String,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// History cap for the API-backed conversation; overflowing it counts as a backend reset.
    pub max_history_messages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_retries = env_or("RESOLVER_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        check_max_retries(max_retries)?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            profile_path: PathBuf::from(require_env("PROFILE_PATH")?),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            service_name: std::env::var("RESOLVER_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
            max_retries,
            retry_backoff: Duration::from_millis(env_or("RESOLVER_RETRY_BACKOFF_MS", 1000)?),
            max_history_messages: env_or("LLM_MAX_HISTORY_MESSAGES", 40)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn check_max_retries(max_retries: u32) -> Result<()> {
    if max_retries > MAX_RETRIES_LIMIT {
        bail!("RESOLVER_MAX_RETRIES must be at most {MAX_RETRIES_LIMIT}, got {max_retries}");
    }
    Ok(())
}

/// Parses an optional variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
