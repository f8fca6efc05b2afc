// src/config.rs
use std::time::Duration;

use crate::services::{models::DEFAULT_MODEL_ID, personas::DEFAULT_PERSONA};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Sits under the hosting platform's 30s hard ceiling.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// `None` makes every chat request fail with `Unconfigured`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub upstream_timeout: Duration,
    pub port: u16,
    pub default_model: String,
    pub default_persona: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            port: 3000,
            default_model: DEFAULT_MODEL_ID.to_string(),
            default_persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

impl RelayConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_empty("OPENROUTER_API_KEY"),
            base_url: non_empty("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            upstream_timeout: non_empty("UPSTREAM_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.upstream_timeout),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            default_model: non_empty("DEFAULT_MODEL_ID").unwrap_or(defaults.default_model),
            default_persona: non_empty("DEFAULT_PERSONALITY").unwrap_or(defaults.default_persona),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
