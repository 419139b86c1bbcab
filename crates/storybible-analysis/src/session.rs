//! Session-scoped analysis state
//!
//! Holds the "is analyzing" flag and the last report for one authoring
//! session. The provider selection lives in the session's gateway rather
//! than in process-wide state.

use crate::analyzer::{AnalysisReport, StoryAnalyzer};
use crate::error::AnalysisError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use storybible_domain::traits::TextCompletionProvider;
use storybible_llm::{LlmGateway, ProviderInfo};
use tracing::{debug, info};

/// One authoring session's analyzer with a single-flight guard
pub struct AnalysisSession<P>
where
    P: TextCompletionProvider,
{
    analyzer: StoryAnalyzer<P>,
    busy: AtomicBool,
    last_report: Mutex<Option<AnalysisReport>>,
}

/// Clears the busy flag when dropped, including on error or cancellation
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P> AnalysisSession<P>
where
    P: TextCompletionProvider,
{
    /// Start a session around an analyzer
    pub fn new(analyzer: StoryAnalyzer<P>) -> Self {
        Self {
            analyzer,
            busy: AtomicBool::new(false),
            last_report: Mutex::new(None),
        }
    }

    /// Whether an analysis is in flight
    pub fn is_analyzing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Analyze text; fails with [`AnalysisError::Busy`] while another run is in flight
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Rejected overlapping analysis request");
            return Err(AnalysisError::Busy);
        };
        let report = self.analyzer.analyze(text).await?;
        *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        Ok(report)
    }

    /// The most recent successful report
    pub fn last_report(&self) -> Option<AnalysisReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The underlying analyzer
    pub fn analyzer(&self) -> &StoryAnalyzer<P> {
        &self.analyzer
    }
}

impl AnalysisSession<LlmGateway> {
    /// Switch this session's provider by name (`"openai"` or `"gemini"`)
    ///
    /// Unknown names are rejected and leave the selection unchanged.
    pub fn select_provider(&mut self, name: &str) -> Result<(), AnalysisError> {
        self.analyzer
            .provider_mut()
            .select_by_name(name)
            .map_err(|e| AnalysisError::Config(e.to_string()))?;
        info!(provider = name, "Session provider selected");
        Ok(())
    }

    /// All providers with configuration and selection state
    pub fn available_providers(&self) -> Vec<ProviderInfo> {
        self.analyzer.provider().available_providers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use std::time::Duration;
    use storybible_llm::{GeminiProvider, MockProvider, OpenAiProvider, ProviderKind};

    const TEXT: &str = "Mara crossed the bridge at dawn.";

    #[tokio::test]
    async fn test_overlapping_call_is_busy() {
        let provider = MockProvider::new("{}").with_delay(Duration::from_millis(100));
        let session = AnalysisSession::new(StoryAnalyzer::new(provider.clone(), AnalyzerConfig::default()));

        let (first, second) = tokio::join!(session.analyze(TEXT), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(session.is_analyzing());
            session.analyze(TEXT).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(AnalysisError::Busy)));
        assert_eq!(provider.call_count(), 1);
        assert!(!session.is_analyzing());
    }

    #[tokio::test]
    async fn test_flag_cleared_after_error() {
        let session = AnalysisSession::new(StoryAnalyzer::new(MockProvider::default(), AnalyzerConfig::default()));
        assert!(session.analyze("").await.is_err());
        assert!(!session.is_analyzing());
        assert!(session.analyze(TEXT).await.is_ok());
        assert!(session.last_report().is_some());
    }

    #[test]
    fn test_gateway_selection_is_per_session() {
        let gateway = LlmGateway::new(OpenAiProvider::new(Some("sk-test".into())), GeminiProvider::new(None));
        let mut a = AnalysisSession::new(StoryAnalyzer::new(gateway.clone(), AnalyzerConfig::default()));
        let b = AnalysisSession::new(StoryAnalyzer::new(gateway, AnalyzerConfig::default()));

        a.select_provider("openai").unwrap();
        assert!(matches!(a.select_provider("claude"), Err(AnalysisError::Config(_))));

        assert_eq!(a.analyzer().provider().selected(), ProviderKind::OpenAi);
        assert_eq!(b.analyzer().provider().selected(), ProviderKind::Gemini);

        let listing = a.available_providers();
        let openai = listing.iter().find(|p| p.kind == ProviderKind::OpenAi).unwrap();
        assert!(openai.configured && openai.selected);
    }
}
