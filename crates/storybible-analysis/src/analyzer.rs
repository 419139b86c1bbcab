//! Core StoryAnalyzer implementation

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::fallback::HeuristicExtractor;
use crate::normalizer::{AnalysisStats, EntityNormalizer, ExtractedEntities};
use crate::parser::{parse_llm_response, ParseStrategy, ParsedResponse};
use crate::prompt::PromptBuilder;
use serde::Serialize;
use std::time::Instant;
use storybible_domain::traits::TextCompletionProvider;
use storybible_domain::Source;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Which path produced a report's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOrigin {
    /// The model reply
    Llm,
    /// The heuristic extractor
    Fallback,
}

/// Why the heuristic extractor ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "message")]
pub enum FallbackReason {
    /// No credential for the provider
    Unconfigured,
    /// The call failed or timed out
    ProviderFailed(String),
    /// The reply held no JSON object
    MalformedResponse,
    /// The reply parsed but no candidate survived normalization
    NoEntities,
}

impl FallbackReason {
    fn from_error(error: &AnalysisError) -> Self {
        match error {
            AnalysisError::ProviderUnconfigured { .. } => FallbackReason::Unconfigured,
            AnalysisError::Provider { message, .. } => FallbackReason::ProviderFailed(message.clone()),
            AnalysisError::MalformedResponse { .. } => FallbackReason::MalformedResponse,
            other => FallbackReason::ProviderFailed(other.to_string()),
        }
    }
}

/// Result of one analysis run
///
/// Every category is present in `entities`, possibly empty. An empty
/// result is a valid "nothing found" outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Candidates per category
    pub entities: ExtractedEntities,
    /// Counts and mean confidence
    pub stats: AnalysisStats,
    /// Which path produced the candidates
    pub origin: AnalysisOrigin,
    /// Set when the heuristic extractor ran
    pub fallback_reason: Option<FallbackReason>,
    /// How the model reply parsed, when it did
    pub parse_strategy: Option<ParseStrategy>,
    /// Provider name
    pub provider: String,
    /// Wall-clock duration of the run
    pub processing_time_ms: u64,
}

impl AnalysisReport {
    /// Provenance carried by every candidate in this report
    pub fn source(&self) -> Source {
        match self.origin {
            AnalysisOrigin::Llm => Source::LlmAnalysis,
            AnalysisOrigin::Fallback => Source::PatternAnalysis,
        }
    }
}

/// Runs prompt, provider, parser, optional fallback and normalizer in order
pub struct StoryAnalyzer<P>
where
    P: TextCompletionProvider,
{
    provider: P,
    config: AnalyzerConfig,
    normalizer: EntityNormalizer,
    heuristics: HeuristicExtractor,
}

impl<P> StoryAnalyzer<P>
where
    P: TextCompletionProvider,
{
    /// Create a new analyzer over the built-in lexicon
    pub fn new(provider: P, config: AnalyzerConfig) -> Self {
        Self {
            normalizer: EntityNormalizer::from_config(&config),
            heuristics: HeuristicExtractor::default(),
            provider,
            config,
        }
    }

    /// Use a custom heuristic extractor
    pub fn with_heuristics(mut self, heuristics: HeuristicExtractor) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// The provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the provider (e.g. to change a gateway's selection)
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze manuscript text
    ///
    /// Only blank text is rejected, plus text over `max_text_length` when a
    /// cap is configured. Provider and parse failures
    /// fall back to the heuristic extractor unless the fallback is disabled,
    /// in which case they are returned.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyText);
        }
        let length = text.chars().count();
        if let Some(max) = self.config.max_text_length.filter(|&max| length > max) {
            return Err(AnalysisError::TextTooLong(length, max));
        }

        let started = Instant::now();
        let provider = self.provider.name().to_string();
        info!(provider = %provider, chars = length, "Starting story analysis");

        let reason = match self.llm_pass(text).await {
            Ok(parsed) => {
                let entities = self.normalizer.normalize(&parsed.value, text, Source::LlmAnalysis);
                if !entities.is_empty() || !self.config.fallback_enabled {
                    return Ok(self.report(
                        entities,
                        AnalysisOrigin::Llm,
                        None,
                        Some(parsed.strategy),
                        provider,
                        started,
                    ));
                }
                FallbackReason::NoEntities
            }
            Err(e) if self.config.fallback_enabled => FallbackReason::from_error(&e),
            Err(e) => return Err(e),
        };

        warn!(provider = %provider, reason = ?reason, "Falling back to heuristic extraction");
        let raw = self.heuristics.extract(text);
        let entities = self.normalizer.normalize(&raw, text, Source::PatternAnalysis);
        Ok(self.report(entities, AnalysisOrigin::Fallback, Some(reason), None, provider, started))
    }

    async fn llm_pass(&self, text: &str) -> Result<ParsedResponse, AnalysisError> {
        let provider = self.provider.name();
        if !self.provider.is_configured() {
            return Err(AnalysisError::ProviderUnconfigured {
                provider: provider.to_string(),
            });
        }

        let request = PromptBuilder::new(text).request(self.config.temperature, self.config.max_tokens);
        debug!(prompt_chars = request.prompt.len(), "Sending extraction prompt");

        let call = self.provider.call(&request);
        let reply = match self.config.call_timeout() {
            Some(limit) => timeout(limit, call).await.map_err(|_| AnalysisError::Provider {
                provider: provider.to_string(),
                message: format!("timed out after {}s", limit.as_secs()),
            })?,
            None => call.await,
        }
        .map_err(|e| AnalysisError::Provider {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

        debug!(reply_chars = reply.len(), "Received extraction reply");
        parse_llm_response(&reply)
    }

    fn report(
        &self,
        entities: ExtractedEntities,
        origin: AnalysisOrigin,
        fallback_reason: Option<FallbackReason>,
        parse_strategy: Option<ParseStrategy>,
        provider: String,
        started: Instant,
    ) -> AnalysisReport {
        let stats = AnalysisStats::of(&entities);
        info!(
            origin = ?origin,
            total = stats.total,
            mean_confidence = stats.mean_confidence,
            "Story analysis complete"
        );
        AnalysisReport {
            entities,
            stats,
            origin,
            fallback_reason,
            parse_strategy,
            provider,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}
