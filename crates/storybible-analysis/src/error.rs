//! Error types for text analysis

use storybible_store::StoreError;
use thiserror::Error;

/// Errors that can occur during analysis and merging
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Nothing to analyze
    #[error("Text is empty")]
    EmptyText,

    /// Text exceeds maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// No credential for the selected provider
    #[error("Provider '{provider}' is not configured")]
    ProviderUnconfigured {
        /// Provider name
        provider: String,
    },

    /// The provider call failed
    #[error("Provider '{provider}' failed: {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Underlying error text
        message: String,
    },

    /// Neither strict nor recovered parsing produced a JSON object
    #[error("Malformed LLM response ({} chars)", raw.len())]
    MalformedResponse {
        /// The reply as received
        raw: String,
    },

    /// Another analysis is already running in this session
    #[error("An analysis is already in progress")]
    Busy,

    /// Selection key did not resolve to a candidate
    #[error("Unknown selection: {0}")]
    UnknownSelection(String),

    /// Invalid configuration or lexicon
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store error while merging
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
