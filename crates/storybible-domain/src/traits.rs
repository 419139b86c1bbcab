//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use async_trait::async_trait;

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction framing the task
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,
    /// Output token cap, provider default when `None`
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request with the given system instruction and prompt
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for text-completion services
///
/// Implemented by the infrastructure layer (storybible-llm)
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    /// Error type for provider operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short provider name used in logs and reports
    fn name(&self) -> &str;

    /// True iff a credential is available
    fn is_configured(&self) -> bool;

    /// Send one request and return the raw text of the reply
    async fn call(&self, request: &CompletionRequest) -> Result<String, Self::Error>;
}

/// Trait for key-value blob storage
///
/// Each key holds one JSON document serialized as a string.
/// Implemented by the infrastructure layer (storybible-store)
pub trait KeyValueStorage {
    /// Error type for storage operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value for `key`
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<(), Self::Error>;

    /// Remove every key
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// List stored keys
    fn keys(&self) -> Result<Vec<String>, Self::Error>;
}
