//! Keyword tables driving the heuristic extractor
//!
//! The built-in tables live in `data/lexicon.toml` and are embedded at
//! compile time. Custom tables load from any TOML string of the same shape.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

const BUILTIN_LEXICON: &str = include_str!("../data/lexicon.toml");

static BUILTIN: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::from_toml(BUILTIN_LEXICON).expect("embedded lexicon is valid TOML")
});

/// All keyword tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    /// Capitalized-name detection
    pub characters: CharacterRules,
    /// Place keywords
    pub locations: KeywordCategory,
    /// Object keywords
    pub objects: KeywordCategory,
    /// Theme keyword groups
    pub themes: ThemeRules,
}

/// Character detection rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRules {
    /// Confidence assigned to every candidate
    pub confidence: f64,
    /// Candidates kept, in order of first appearance
    pub max_candidates: usize,
    /// Shortest accepted name, in characters
    pub min_length: usize,
    /// Capitalized words never treated as names
    pub stoplist: Vec<String>,
    /// Cues for the description sentence
    pub description_keywords: Vec<String>,
    /// Cues for the personality sentence
    pub personality_keywords: Vec<String>,
    /// Cues for the background sentence
    pub background_keywords: Vec<String>,
    /// Cues for the age sentence
    pub age_keywords: Vec<String>,
    /// Cues for locating a pronoun sentence
    pub pronoun_keywords: Vec<String>,
    /// Trait words collected into tags
    pub trait_keywords: Vec<String>,
    /// Trait words kept per character
    pub max_traits: usize,
    /// Fraction of the text within which a first mention marks a protagonist
    pub protagonist_cutoff: f64,
    /// Verbs following a name that mark a supporting character
    pub speech_verbs: Vec<String>,
}

/// A keyword dictionary for places or objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCategory {
    /// Confidence assigned to every candidate
    pub confidence: f64,
    /// Nouns that qualify when present anywhere in the text
    pub keywords: Vec<String>,
    /// Cues for the description sentence
    pub description_keywords: Vec<String>,
    /// Cues for the significance sentence
    pub significance_keywords: Vec<String>,
    /// Keyword to `type` value
    #[serde(default)]
    pub types: BTreeMap<String, String>,
    /// `type` for keywords missing from `types`
    pub default_type: String,
    /// Ordered mood cues (locations only)
    #[serde(default)]
    pub atmosphere: Vec<AtmosphereCue>,
}

impl KeywordCategory {
    /// The `type` value for a keyword
    pub fn type_of(&self, keyword: &str) -> &str {
        self.types
            .get(&keyword.to_lowercase())
            .map(String::as_str)
            .unwrap_or(&self.default_type)
    }
}

/// A word that, near a place name, sets its atmosphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereCue {
    /// Word to look for
    pub cue: String,
    /// Atmosphere it implies
    pub mood: String,
}

/// Theme detection rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRules {
    /// Confidence assigned to every candidate
    pub confidence: f64,
    /// Named keyword groups, in report order
    pub groups: Vec<ThemeGroup>,
}

/// One theme and the words that signal it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeGroup {
    /// Theme name
    pub name: String,
    /// Signal words
    pub keywords: Vec<String>,
}

impl Lexicon {
    /// The embedded tables
    pub fn builtin() -> &'static Lexicon {
        &BUILTIN
    }

    /// Parse and validate tables from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, AnalysisError> {
        let lexicon: Lexicon = toml::from_str(toml_str)
            .map_err(|e| AnalysisError::Config(format!("Failed to parse lexicon: {}", e)))?;
        lexicon.validate().map_err(AnalysisError::Config)?;
        Ok(lexicon)
    }

    /// Validate the tables
    pub fn validate(&self) -> Result<(), String> {
        let confidences = [
            ("characters", self.characters.confidence),
            ("locations", self.locations.confidence),
            ("objects", self.objects.confidence),
            ("themes", self.themes.confidence),
        ];
        for (name, confidence) in confidences {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(format!("{name}.confidence must be between 0.0 and 1.0"));
            }
        }
        if !(0.0..=1.0).contains(&self.characters.protagonist_cutoff) {
            return Err("characters.protagonist_cutoff must be between 0.0 and 1.0".to_string());
        }
        if self.themes.groups.iter().any(|g| g.keywords.is_empty()) {
            return Err("every theme group needs at least one keyword".to_string());
        }
        Ok(())
    }
}
