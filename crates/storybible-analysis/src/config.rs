//! Configuration for the analyzer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`StoryAnalyzer`](crate::StoryAnalyzer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Candidates below this confidence are dropped (inclusive boundary)
    pub confidence_threshold: f64,

    /// Optional cap on input length (characters); manuscripts of any length by default
    pub max_text_length: Option<usize>,

    /// Mentions located per candidate
    pub max_mentions: usize,

    /// Characters of context kept on each side of a mention
    pub mention_context_chars: usize,

    /// Sampling temperature for the extraction call
    pub temperature: f32,

    /// Output token cap for the extraction call
    pub max_tokens: u32,

    /// Pipeline-level timeout for the extraction call (seconds); none by default
    pub call_timeout_secs: Option<u64>,

    /// Run the heuristic extractor when the LLM path yields nothing usable
    pub fallback_enabled: bool,
}

impl AnalyzerConfig {
    /// Get the call timeout as a Duration
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.max_text_length == Some(0) {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.max_mentions == 0 {
            return Err("max_mentions must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.call_timeout_secs == Some(0) {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.2,
            max_text_length: None,
            max_mentions: 3,
            mention_context_chars: 50,
            temperature: 0.3,
            max_tokens: 4_000,
            call_timeout_secs: None,
            fallback_enabled: true,
        }
    }
}

impl AnalyzerConfig {
    /// Strict preset: only confident candidates, bounded call time
    pub fn strict() -> Self {
        Self {
            confidence_threshold: 0.5,
            temperature: 0.1,
            call_timeout_secs: Some(60),
            ..Self::default()
        }
    }

    /// Permissive preset: keep nearly everything, wider mention context
    pub fn permissive() -> Self {
        Self {
            confidence_threshold: 0.05,
            max_mentions: 5,
            mention_context_chars: 100,
            ..Self::default()
        }
    }

    /// Load and validate configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
