//! Heuristic fallback extractor
//!
//! A low-precision safety net used when the LLM path is unavailable or
//! unparseable. Produces the same category-keyed JSON shape the model is
//! asked for, so both paths share one normalizer.

use crate::lexicon::{CharacterRules, KeywordCategory, Lexicon};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use storybible_domain::EntityKind;
use tracing::debug;

static CAPITALIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex"));
static SENTENCE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

/// Keyword and capitalization based extractor
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    lexicon: Lexicon,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new(Lexicon::builtin().clone())
    }
}

impl HeuristicExtractor {
    /// Create an extractor over custom tables
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// The tables in use
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Extract characters, locations, objects and themes
    ///
    /// Categories the heuristics do not cover are left out; the normalizer
    /// treats them as empty.
    pub fn extract(&self, text: &str) -> Map<String, Value> {
        let sentences = split_sentences(text);
        let mut out = Map::new();

        let characters = self.characters(text, &sentences);
        let locations = keyword_candidates(text, &sentences, &self.lexicon.locations, true);
        let objects = keyword_candidates(text, &sentences, &self.lexicon.objects, false);
        let themes = self.themes(text);

        debug!(
            characters = characters.len(),
            locations = locations.len(),
            objects = objects.len(),
            themes = themes.len(),
            "Heuristic extraction complete"
        );

        out.insert(EntityKind::Character.collection_key().into(), Value::Array(characters));
        out.insert(EntityKind::Location.collection_key().into(), Value::Array(locations));
        out.insert(EntityKind::Object.collection_key().into(), Value::Array(objects));
        out.insert(EntityKind::Theme.collection_key().into(), Value::Array(themes));
        out
    }

    fn characters(&self, text: &str, sentences: &[&str]) -> Vec<Value> {
        let rules = &self.lexicon.characters;
        let mut seen = HashSet::new();

        CAPITALIZED_RE
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|name| seen.insert(*name))
            .filter(|name| name.chars().count() >= rules.min_length)
            .filter(|name| !rules.stoplist.iter().any(|w| w == name))
            .take(rules.max_candidates)
            .map(|name| {
                json!({
                    "name": name,
                    "description": sentence_with(sentences, name, &rules.description_keywords),
                    "personality": sentence_with(sentences, name, &rules.personality_keywords),
                    "background": sentence_with(sentences, name, &rules.background_keywords),
                    "age": sentence_with(sentences, name, &rules.age_keywords),
                    "role": infer_role(text, name, rules),
                    "pronouns": infer_pronouns(sentences, name, rules),
                    "traits": infer_traits(sentences, name, rules),
                    "confidence": rules.confidence,
                })
            })
            .collect()
    }

    fn themes(&self, text: &str) -> Vec<Value> {
        let lower = text.to_lowercase();
        self.lexicon
            .themes
            .groups
            .iter()
            .filter_map(|group| {
                let matched: Vec<&str> = group
                    .keywords
                    .iter()
                    .map(String::as_str)
                    .filter(|k| lower.contains(&k.to_lowercase()))
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                Some(json!({
                    "name": group.name,
                    "description": format!("Signalled by: {}", matched.join(", ")),
                    "confidence": self.lexicon.themes.confidence,
                }))
            })
            .collect()
    }
}

fn keyword_candidates(
    text: &str,
    sentences: &[&str],
    category: &KeywordCategory,
    with_atmosphere: bool,
) -> Vec<Value> {
    let lower = text.to_lowercase();
    category
        .keywords
        .iter()
        .filter(|word| lower.contains(&word.to_lowercase()))
        .map(|word| {
            let mut item = json!({
                "name": word,
                "type": category.type_of(word),
                "description": sentence_with(sentences, word, &category.description_keywords),
                "significance": sentence_with(sentences, word, &category.significance_keywords),
                "confidence": category.confidence,
            });
            if with_atmosphere {
                item["atmosphere"] = Value::String(infer_atmosphere(sentences, word, category));
            }
            item
        })
        .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_SPLIT_RE.split(text).collect()
}

/// First sentence naming `name` that also contains one of `keywords`, trimmed
fn sentence_with(sentences: &[&str], name: &str, keywords: &[String]) -> String {
    let name = name.to_lowercase();
    sentences
        .iter()
        .map(|s| (s, s.to_lowercase()))
        .find(|(_, lower)| lower.contains(&name) && keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
        .map(|(s, _)| s.trim().to_string())
        .unwrap_or_default()
}

fn infer_role(text: &str, name: &str, rules: &CharacterRules) -> &'static str {
    let total = text.chars().count() as f64;
    if let Some(byte) = text.find(name) {
        let first = text[..byte].chars().count() as f64;
        if first < total * rules.protagonist_cutoff {
            return "protagonist";
        }
    }
    let lower = text.to_lowercase();
    let name = name.to_lowercase();
    if rules
        .speech_verbs
        .iter()
        .any(|verb| lower.contains(&format!("{name} {verb}")))
    {
        return "supporting";
    }
    "minor"
}

fn infer_pronouns(sentences: &[&str], name: &str, rules: &CharacterRules) -> &'static str {
    let context = sentence_with(sentences, name, &rules.pronoun_keywords);
    let padded = format!(" {} ", context.to_lowercase());
    let has = |word: &str| padded.contains(&format!(" {word} "));
    if has("he") || has("him") || has("his") {
        "he/him"
    } else if has("she") || has("her") {
        "she/her"
    } else {
        "they/them"
    }
}

fn infer_traits(sentences: &[&str], name: &str, rules: &CharacterRules) -> Vec<String> {
    let name = name.to_lowercase();
    let mut traits: Vec<String> = Vec::new();
    for sentence in sentences.iter().map(|s| s.to_lowercase()).filter(|s| s.contains(&name)) {
        for word in &rules.trait_keywords {
            if sentence.contains(word.as_str()) && !traits.contains(word) {
                traits.push(word.clone());
            }
        }
    }
    traits.truncate(rules.max_traits);
    traits
}

fn infer_atmosphere(sentences: &[&str], place: &str, category: &KeywordCategory) -> String {
    let place = place.to_lowercase();
    sentences
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| s.contains(&place))
        .find_map(|s| {
            category
                .atmosphere
                .iter()
                .find(|cue| s.contains(&cue.cue))
                .map(|cue| cue.mood.clone())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(out: &Map<String, Value>, key: &str) -> Vec<String> {
        out[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_alice_house_letter() {
        let out = HeuristicExtractor::default()
            .extract("Alice walked into the old house and found a letter.");
        assert_eq!(names(&out, "characters"), vec!["Alice"]);
        assert!(names(&out, "locations").contains(&"house".to_string()));
        assert!(names(&out, "objects").contains(&"letter".to_string()));

        let alice = &out["characters"][0];
        assert_eq!(alice["confidence"], json!(0.7));
        assert_eq!(alice["role"], json!("protagonist"));
        assert_eq!(alice["description"], json!("Alice walked into the old house and found a letter"));

        let house = out["locations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|l| l["name"] == json!("house"))
            .unwrap();
        assert_eq!(house["type"], json!("building"));
        assert_eq!(house["confidence"], json!(0.6));
    }

    #[test]
    fn test_stoplist_and_length() {
        let out = HeuristicExtractor::default()
            .extract("The door opened. However, Bo and Marguerite stayed. Then Marguerite left.");
        assert_eq!(names(&out, "characters"), vec!["Marguerite"]);
    }

    #[test]
    fn test_candidate_cap() {
        let words = [
            "Aaron", "Bella", "Cyrus", "Delia", "Ethan", "Fiona", "Gavin", "Hazel", "Isaac", "Julia",
            "Kevin", "Laura", "Mason", "Nadia", "Oscar", "Petra", "Quinn", "Rhoda",
        ];
        let out = HeuristicExtractor::default().extract(&words.join(" met "));
        let found = names(&out, "characters");
        assert_eq!(found.len(), 15);
        assert_eq!(found[0], "Aaron");
        assert_eq!(found[14], "Oscar");
    }

    #[test]
    fn test_pronouns_and_traits() {
        let text = "Once upon a time there was a long preamble with nothing much in it at all. \
                    Marcus was brave and kind when he spoke. Marcus said nothing else.";
        let out = HeuristicExtractor::default().extract(text);
        let marcus = &out["characters"][0];
        assert_eq!(marcus["pronouns"], json!("he/him"));
        assert_eq!(marcus["traits"], json!(["brave", "kind"]));
        assert_eq!(marcus["role"], json!("supporting"));
    }

    #[test]
    fn test_atmosphere_priority() {
        let out = HeuristicExtractor::default().extract("The attic was dark and quiet.");
        let attic = out["locations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|l| l["name"] == json!("attic"))
            .unwrap();
        assert_eq!(attic["atmosphere"], json!("quiet"));
        assert_eq!(attic["type"], json!("room"));
    }

    #[test]
    fn test_themes() {
        let out = HeuristicExtractor::default().extract("Their journey was a quest for a hidden secret.");
        let themes = names(&out, "themes");
        assert!(themes.contains(&"adventure".to_string()));
        assert!(themes.contains(&"mystery".to_string()));
    }
}
