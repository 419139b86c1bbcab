//! Story Bible Analysis
//!
//! Extracts story entities from manuscript text and merges the ones the
//! author confirms into the Story Bible.
//!
//! # Architecture
//!
//! ```text
//! Text → PromptBuilder → Provider → Parser ─┬─→ Normalizer → Report → BibleSync → BibleStore
//!                                           └─→ HeuristicExtractor ─┘
//! ```
//!
//! The heuristic extractor runs when the provider is unconfigured, the call
//! fails, the reply holds no JSON object, or no candidate survives
//! normalization. Both paths share one normalizer, so every report has all
//! twelve categories.
//!
//! # Example Usage
//!
//! ```no_run
//! use storybible_analysis::{AnalyzerConfig, BibleSync, SelectionKey, StoryAnalyzer};
//! use storybible_llm::MockProvider;
//! use storybible_store::{BibleStore, MemoryStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = StoryAnalyzer::new(MockProvider::unconfigured(), AnalyzerConfig::default());
//! let report = analyzer
//!     .analyze("Alice walked into the old house and found a letter.")
//!     .await?;
//!
//! println!("Found {} candidates", report.stats.total);
//!
//! let mut store = BibleStore::open(MemoryStorage::new())?;
//! let keys: Vec<SelectionKey> = vec!["character-0".parse()?];
//! let merged = BibleSync::new(&mut store).apply(&report.entities, &keys);
//! println!("Added {} entities", merged.added.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod config;
mod schema;
mod prompt;
mod parser;
mod lexicon;
mod mentions;
mod fallback;
mod normalizer;
mod analyzer;
mod session;
mod merge;
mod assist;


pub use error::AnalysisError;
pub use config::AnalyzerConfig;
pub use schema::{schema_for, CategorySchema, FieldShape, FieldSpec, CATEGORIES};
pub use prompt::{response_example, PromptBuilder};
pub use parser::{parse_llm_response, ParseStrategy, ParsedResponse};
pub use lexicon::{AtmosphereCue, CharacterRules, KeywordCategory, Lexicon, ThemeGroup, ThemeRules};
pub use mentions::find_mentions;
pub use fallback::HeuristicExtractor;
pub use normalizer::{AnalysisStats, Candidate, EntityNormalizer, ExtractedEntities, DEFAULT_RELATIONSHIP_TYPE};
pub use analyzer::{AnalysisOrigin, AnalysisReport, FallbackReason, StoryAnalyzer};
pub use session::AnalysisSession;
pub use merge::{BibleSync, MergeFailure, MergeReport, SelectionKey};
pub use assist::{AssistAction, WritingAssistant};
