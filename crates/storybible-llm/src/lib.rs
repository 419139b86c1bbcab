//! Story Bible LLM Provider Layer
//!
//! Text-completion providers behind the `TextCompletionProvider` trait from
//! `storybible-domain`.
//!
//! # Architecture
//!
//! Every provider exposes the same `is_configured()` / `call(request)`
//! contract, so the analysis pipeline never knows which service it talks to.
//! Provider choice is an enum lookup inside [`LlmGateway`], which also holds
//! the current selection for one session.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OpenAiProvider`: OpenAI chat completions
//! - `GeminiProvider`: Google Gemini `generateContent`
//!
//! # Examples
//!
//! ```
//! use storybible_llm::MockProvider;
//! use storybible_domain::traits::{CompletionRequest, TextCompletionProvider};
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.call(&CompletionRequest::new("system", "test prompt")).await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod gateway;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use storybible_domain::traits::{CompletionRequest, TextCompletionProvider};
use thiserror::Error;

pub use config::GatewayConfig;
pub use gateway::{LlmGateway, ProviderInfo, ProviderKind};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// No credential available; raised before any network attempt
    #[error("Provider not configured: {provider}")]
    Unconfigured {
        /// Provider name
        provider: String,
    },

    /// Network or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// Provider answered with a non-success status
    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// Request timed out in the HTTP client
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Response envelope did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad provider configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LlmError {
    /// Map a transport-level reqwest error
    pub(crate) fn from_transport(provider: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(format!("{}: {}", provider, e))
        } else {
            LlmError::Communication(format!("{}: {}", provider, e))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Clones share responses, call count and recorded requests.
///
/// # Examples
///
/// ```
/// use storybible_llm::MockProvider;
/// use storybible_domain::traits::TextCompletionProvider;
///
/// let provider = MockProvider::new("Fixed response");
/// assert!(provider.is_configured());
///
/// let offline = MockProvider::unconfigured();
/// assert!(!offline.is_configured());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    configured: bool,
    default_response: String,
    delay: Option<Duration>,
    responses: Arc<Mutex<HashMap<String, Result<String, String>>>>,
    call_count: Arc<Mutex<usize>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            configured: true,
            default_response: response.into(),
            delay: None,
            responses: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a provider that reports no credential
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::default()
        }
    }

    /// Override the provider name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Suspend for `delay` before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), Ok(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>, message: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), Err(message.into()));
    }

    /// Make every call without a specific response fail
    pub fn failing(message: impl Into<String>) -> Self {
        let provider = Self::default();
        lock(&provider.responses).insert(String::new(), Err(message.into()));
        provider
    }

    /// Get the number of times call was invoked
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl TextCompletionProvider for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn call(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        if !self.configured {
            return Err(LlmError::Unconfigured {
                provider: self.name.clone(),
            });
        }

        *lock(&self.call_count) += 1;
        lock(&self.requests).push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let responses = lock(&self.responses);
        // The empty key is the catch-all installed by `failing`
        let entry = responses
            .get(&request.prompt)
            .or_else(|| responses.get(""));
        match entry {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(LlmError::Communication(message.clone())),
            None => Ok(self.default_response.clone()),
        }
    }
}
