//! Gateway configuration loaded from the environment

use crate::gateway::ProviderKind;
use crate::LlmError;
use std::env;
use std::time::Duration;

/// Provider credentials, models and endpoints
///
/// Missing credentials are not an error here: an unconfigured provider is a
/// valid state that makes analysis fall back to keyword matching.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,
    /// `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,
    /// `OPENAI_MODEL`
    pub openai_model: String,
    /// `GEMINI_MODEL`
    pub gemini_model: String,
    /// `OPENAI_BASE_URL`
    pub openai_base_url: String,
    /// `GEMINI_BASE_URL`
    pub gemini_base_url: String,
    /// `STORYBIBLE_PROVIDER`
    pub provider: ProviderKind,
    /// `LLM_TIMEOUT_SECS`; `None` keeps the HTTP client default
    pub timeout_secs: Option<u64>,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// Reads a `.env` file first when one exists.
    pub fn from_env() -> Result<Self, LlmError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let provider = match env::var("STORYBIBLE_PROVIDER") {
            Ok(name) => name.parse()?,
            Err(_) => ProviderKind::default(),
        };

        let timeout_secs = match env::var("LLM_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                LlmError::InvalidConfig(format!("LLM_TIMEOUT_SECS must be an integer, got '{}'", raw))
            })?),
            Err(_) => None,
        };

        let defaults = Self::default();
        Ok(Self {
            openai_api_key: non_blank("OPENAI_API_KEY"),
            gemini_api_key: non_blank("GEMINI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            provider,
            timeout_secs,
        })
    }

    /// Timeout as a Duration, if one is set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            openai_model: crate::openai::DEFAULT_MODEL.to_string(),
            gemini_model: crate::gemini::DEFAULT_MODEL.to_string(),
            openai_base_url: crate::openai::DEFAULT_BASE_URL.to_string(),
            gemini_base_url: crate::gemini::DEFAULT_BASE_URL.to_string(),
            provider: ProviderKind::default(),
            timeout_secs: None,
        }
    }
}

fn non_blank(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}
