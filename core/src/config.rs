use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1024;

/// Model parameters shared by every request. The credential is not here:
/// it arrives with each chat call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySettings {
    pub max_conversations: usize,
    /// `None` means conversations never expire on their own.
    pub idle_ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub llm: LlmSettings,
    pub memory: MemorySettings,
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let temperature = get("LLM_TEMPERATURE", &DEFAULT_TEMPERATURE.to_string())
            .parse::<f32>()
            .context("LLM_TEMPERATURE must be a number")?;

        let max_conversations = get("MEMORY_MAX_CONVERSATIONS", &DEFAULT_MAX_CONVERSATIONS.to_string())
            .parse::<usize>()
            .context("MEMORY_MAX_CONVERSATIONS must be a positive integer")?
            .max(1);

        let ttl_secs = get("MEMORY_TTL_SECS", "0")
            .parse::<u64>()
            .context("MEMORY_TTL_SECS must be a whole number of seconds")?;

        Ok(Self {
            bind_addr: get("TABCHAT_BIND", DEFAULT_BIND),
            llm: LlmSettings {
                api_base: get("LLM_API_BASE", DEFAULT_API_BASE),
                model: get("LLM_MODEL", DEFAULT_MODEL),
                temperature,
            },
            memory: MemorySettings {
                max_conversations,
                idle_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            },
        })
    }
}
