//! Provenance - where an entity came from and where it appears

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an entity entered the Story Bible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Authored by hand
    #[default]
    Manual,
    /// Extracted by an LLM
    LlmAnalysis,
    /// Matched by the keyword fallback
    PatternAnalysis,
}

impl Source {
    /// Wire name of the source
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::LlmAnalysis => "llm_analysis",
            Source::PatternAnalysis => "pattern_analysis",
        }
    }

    /// Confidence assigned when none is supplied
    pub fn default_confidence(&self) -> f64 {
        match self {
            Source::Manual => 1.0,
            Source::LlmAnalysis | Source::PatternAnalysis => 0.0,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located occurrence of an entity's name in manuscript text
///
/// `position` is a character offset (not a byte offset) into the text the
/// mention was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Character offset of the match
    pub position: usize,
    /// Surrounding text snippet
    pub context: String,
    /// Sentence-level snippet; currently the same window as `context`
    pub sentence: String,
}
