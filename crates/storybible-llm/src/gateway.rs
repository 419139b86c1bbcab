//! Provider gateway
//!
//! [`LlmGateway`] owns one instance of each HTTP provider plus the currently
//! selected [`ProviderKind`]. It is itself a [`TextCompletionProvider`], so the
//! analysis pipeline can take a gateway or any single provider interchangeably.

use crate::config::GatewayConfig;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storybible_domain::traits::{CompletionRequest, TextCompletionProvider};
use tracing::info;

/// The text-completion services the gateway can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini
    #[default]
    Gemini,
}

impl ProviderKind {
    /// Every provider, in listing order
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Gemini];

    /// Short identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Name shown to users
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI GPT-4o mini",
            ProviderKind::Gemini => "Google Gemini 2.5 Flash",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(LlmError::InvalidConfig(format!(
                "Invalid provider: {}. Available providers: openai, gemini",
                other
            ))),
        }
    }
}

/// One entry in the provider listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Provider
    pub kind: ProviderKind,
    /// Name shown to users
    pub display_name: &'static str,
    /// Whether a credential is present
    pub configured: bool,
    /// Whether this is the current selection
    pub selected: bool,
}

/// Gateway over all HTTP providers with a session-scoped selection
#[derive(Debug, Clone)]
pub struct LlmGateway {
    openai: OpenAiProvider,
    gemini: GeminiProvider,
    selected: ProviderKind,
}

impl LlmGateway {
    /// Create a gateway from explicit providers, selecting Gemini
    pub fn new(openai: OpenAiProvider, gemini: GeminiProvider) -> Self {
        Self {
            openai,
            gemini,
            selected: ProviderKind::default(),
        }
    }

    /// Build providers and selection from configuration
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut openai = OpenAiProvider::new(config.openai_api_key.clone())
            .with_model(config.openai_model.clone())
            .with_base_url(config.openai_base_url.clone());
        let mut gemini = GeminiProvider::new(config.gemini_api_key.clone())
            .with_model(config.gemini_model.clone())
            .with_base_url(config.gemini_base_url.clone());
        if let Some(timeout) = config.timeout() {
            openai = openai.with_timeout(timeout);
            gemini = gemini.with_timeout(timeout);
        }
        Self::new(openai, gemini).with_selected(config.provider)
    }

    /// Set the initial selection
    pub fn with_selected(mut self, kind: ProviderKind) -> Self {
        self.selected = kind;
        self
    }

    /// Switch the selected provider
    pub fn select(&mut self, kind: ProviderKind) {
        if kind != self.selected {
            info!(from = %self.selected, to = %kind, "Switching LLM provider");
        }
        self.selected = kind;
    }

    /// Switch by name; unknown names are rejected and leave the selection as is
    pub fn select_by_name(&mut self, name: &str) -> Result<(), LlmError> {
        let kind = name.parse()?;
        self.select(kind);
        Ok(())
    }

    /// Current selection
    pub fn selected(&self) -> ProviderKind {
        self.selected
    }

    /// Whether a specific provider has a credential
    pub fn is_provider_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai.is_configured(),
            ProviderKind::Gemini => self.gemini.is_configured(),
        }
    }

    /// List all providers with their configuration state
    pub fn available_providers(&self) -> Vec<ProviderInfo> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| ProviderInfo {
                kind,
                display_name: kind.display_name(),
                configured: self.is_provider_configured(kind),
                selected: kind == self.selected,
            })
            .collect()
    }
}

#[async_trait]
impl TextCompletionProvider for LlmGateway {
    type Error = LlmError;

    fn name(&self) -> &str {
        self.selected.as_str()
    }

    fn is_configured(&self) -> bool {
        self.is_provider_configured(self.selected)
    }

    async fn call(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        match self.selected {
            ProviderKind::OpenAi => self.openai.call(request).await,
            ProviderKind::Gemini => self.gemini.call(request).await,
        }
    }
}
