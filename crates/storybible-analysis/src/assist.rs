//! Writing assistant actions on selected manuscript text

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use storybible_domain::traits::{CompletionRequest, TextCompletionProvider};
use tracing::{debug, warn};

const ASSIST_TEMPERATURE: f32 = 0.7;
const ASSIST_MAX_TOKENS: u32 = 500;

/// An action applied to a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistAction {
    /// Add detail while keeping meaning and tone
    Expand,
    /// Improve clarity and flow without changing length much
    Rewrite,
    /// Write a short descriptive passage about the selection
    Describe,
}

impl AssistAction {
    fn system(&self) -> &'static str {
        match self {
            AssistAction::Expand => {
                "You are a helpful writing assistant. Your task is to expand the given text by adding \
                 more detail, context, and explanation while maintaining the original meaning and tone. \
                 Make the text more comprehensive and informative."
            }
            AssistAction::Rewrite => {
                "You are a helpful writing assistant. Your task is to rewrite the given text so it reads \
                 more clearly and flows better, keeping the original meaning, voice and roughly the same length."
            }
            AssistAction::Describe => {
                "You are a helpful writing assistant. Your task is to write a short, vivid descriptive \
                 passage about the given story element, consistent with the details it contains."
            }
        }
    }

    fn prompt(&self, text: &str) -> String {
        match self {
            AssistAction::Expand => format!("Please expand this text: \"{text}\""),
            AssistAction::Rewrite => format!("Please rewrite this text: \"{text}\""),
            AssistAction::Describe => format!("Please describe this: \"{text}\""),
        }
    }
}

impl fmt::Display for AssistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssistAction::Expand => "expand",
            AssistAction::Rewrite => "rewrite",
            AssistAction::Describe => "describe",
        };
        f.write_str(name)
    }
}

/// Sends selection-level writing requests through a provider
pub struct WritingAssistant<P>
where
    P: TextCompletionProvider,
{
    provider: P,
}

impl<P> WritingAssistant<P>
where
    P: TextCompletionProvider,
{
    /// Create an assistant over a provider
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Expand the selection
    pub async fn expand(&self, text: &str) -> Result<String, AnalysisError> {
        self.run(AssistAction::Expand, text).await
    }

    /// Rewrite the selection
    pub async fn rewrite(&self, text: &str) -> Result<String, AnalysisError> {
        self.run(AssistAction::Rewrite, text).await
    }

    /// Describe the selection
    pub async fn describe(&self, text: &str) -> Result<String, AnalysisError> {
        self.run(AssistAction::Describe, text).await
    }

    /// Run any action; the reply is returned trimmed
    pub async fn run(&self, action: AssistAction, text: &str) -> Result<String, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyText);
        }
        let provider = self.provider.name();
        if !self.provider.is_configured() {
            return Err(AnalysisError::ProviderUnconfigured {
                provider: provider.to_string(),
            });
        }

        let request = CompletionRequest::new(action.system(), action.prompt(text))
            .with_temperature(ASSIST_TEMPERATURE)
            .with_max_tokens(ASSIST_MAX_TOKENS);
        debug!(action = %action, provider = provider, chars = text.len(), "Running writing assistant");

        let reply = self.provider.call(&request).await.map_err(|e| {
            warn!(action = %action, provider = provider, error = %e, "Writing assistant call failed");
            AnalysisError::Provider {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(reply.trim().to_string())
    }
}
