use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::models::ModelCandidates;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_ALLOW_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LLM_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_LLM_BASE_DELAY_MS: u64 = 1000;

/// Where interview sessions live.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBackend {
    Memory,
    Redis { url: String },
}

/// Application configuration loaded from environment variables.
/// Only malformed values fail startup; a missing API key degrades the AI endpoints instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub models: ModelCandidates,
    pub port: u16,
    pub allow_origin: String,
    pub rust_log: String,
    pub session_backend: SessionBackend,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub llm_timeout: Duration,
    pub llm_max_attempts: u32,
    pub llm_base_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let model_override = get("GEMINI_MODEL_ID");
        let models = ModelCandidates::new(
            model_override.as_deref(),
            get("GEMINI_FAST_MODELS").as_deref(),
            get("GEMINI_MODELS").as_deref(),
        );

        let session_backend = match get("SESSION_STORE").as_deref() {
            None | Some("memory") => SessionBackend::Memory,
            Some("redis") => SessionBackend::Redis {
                url: get("REDIS_URL")
                    .context("REDIS_URL must be set when SESSION_STORE=redis")?,
            },
            Some(other) => bail!("SESSION_STORE must be 'memory' or 'redis', got '{other}'"),
        };

        let llm_max_attempts = parse_or(&get, "LLM_MAX_ATTEMPTS", DEFAULT_LLM_MAX_ATTEMPTS)?;
        if llm_max_attempts == 0 {
            bail!("LLM_MAX_ATTEMPTS must be at least 1");
        }

        let allow_origin = get("ALLOW_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOW_ORIGIN.to_string());
        if allow_origin == "*" {
            bail!("ALLOW_ORIGIN cannot be '*' because credentialed CORS needs an explicit origin");
        }

        Ok(Config {
            gemini_api_key: get("GEMINI_API_KEY"),
            models,
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            allow_origin,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            session_backend,
            session_ttl: Duration::from_secs(parse_or(
                &get,
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            llm_timeout: Duration::from_secs(parse_or(
                &get,
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            llm_max_attempts,
            llm_base_delay: Duration::from_millis(parse_or(
                &get,
                "LLM_BASE_DELAY_MS",
                DEFAULT_LLM_BASE_DELAY_MS,
            )?),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
