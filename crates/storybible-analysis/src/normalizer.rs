//! Entity normalizer and validator
//!
//! Turns a raw category-keyed record (from the model or the heuristic
//! extractor) into validated, deduplicated candidates with provenance and
//! mentions attached.

use crate::config::AnalyzerConfig;
use crate::mentions::find_mentions;
use crate::schema::CATEGORIES;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use storybible_domain::{descriptor, EntityKind, Mention, Source};
use tracing::debug;

/// Fields managed by the normalizer rather than copied from the raw item
const MANAGED_FIELDS: [&str; 3] = ["confidence", "source", "mentions"];

/// Relationship type given to candidates the model left untyped
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "other";

/// A validated analysis result awaiting user selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Category
    pub kind: EntityKind,
    /// Name or title; relationships use `"<from> <type> <to>"`
    pub label: String,
    /// Certainty in [0, 1]
    pub confidence: f64,
    /// Which path produced it
    pub source: Source,
    /// Located occurrences in the analyzed text
    pub mentions: Vec<Mention>,
    /// Remaining raw fields as returned
    pub fields: Map<String, Value>,
}

impl Candidate {
    /// Read a scalar field as text, or `""`
    ///
    /// Numbers and booleans are rendered, so `"age": 30` reads as `"30"`.
    pub fn text(&self, key: &str) -> Cow<'_, str> {
        self.fields.get(key).and_then(scalar_text).unwrap_or_default()
    }

    /// Read a list field; a single scalar becomes one element
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.is_empty())
                .map(Cow::into_owned)
                .collect(),
            Some(value) => scalar_text(value)
                .filter(|s| !s.is_empty())
                .map(|s| vec![s.into_owned()])
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.trim())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// Candidates for all twelve analysis categories
///
/// Every category is always present, possibly empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntities {
    categories: BTreeMap<EntityKind, Vec<Candidate>>,
}

impl Default for ExtractedEntities {
    fn default() -> Self {
        Self {
            categories: EntityKind::ANALYZABLE.into_iter().map(|k| (k, Vec::new())).collect(),
        }
    }
}

impl ExtractedEntities {
    /// Candidates of one category, highest confidence first
    pub fn get(&self, kind: EntityKind) -> &[Candidate] {
        self.categories.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories in report order
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &[Candidate])> {
        EntityKind::ANALYZABLE.into_iter().map(move |k| (k, self.get(k)))
    }

    /// Total candidates across all categories
    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Whether no category has a candidate
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Serialize for ExtractedEntities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EntityKind::ANALYZABLE.len()))?;
        for (kind, candidates) in self.iter() {
            map.serialize_entry(kind.collection_key(), candidates)?;
        }
        map.end()
    }
}

/// Summary of a normalized result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    /// Candidates per category
    pub counts: BTreeMap<EntityKind, usize>,
    /// Candidates overall
    pub total: usize,
    /// Mean confidence across all candidates; 0 when there are none
    pub mean_confidence: f64,
}

impl AnalysisStats {
    /// Compute stats for a result
    pub fn of(entities: &ExtractedEntities) -> Self {
        let counts: BTreeMap<EntityKind, usize> =
            entities.iter().map(|(k, c)| (k, c.len())).collect();
        let total = entities.total();
        let sum: f64 = entities
            .iter()
            .flat_map(|(_, c)| c.iter())
            .map(|c| c.confidence)
            .sum();
        Self {
            counts,
            total,
            mean_confidence: if total == 0 { 0.0 } else { sum / total as f64 },
        }
    }
}

/// Normalizes raw category-keyed records into [`ExtractedEntities`]
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    threshold: f64,
    max_mentions: usize,
    context_chars: usize,
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

impl EntityNormalizer {
    /// Create a normalizer from analyzer settings
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            max_mentions: config.max_mentions,
            context_chars: config.mention_context_chars,
        }
    }

    /// Override the confidence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Normalize `raw`, attaching `source` and mentions found in `text`
    ///
    /// Missing or non-array categories count as empty. Items that are not
    /// objects, lack a label, or fall below the threshold are dropped, as
    /// are later items whose trimmed, lowercased label repeats an earlier one.
    pub fn normalize(&self, raw: &Map<String, Value>, text: &str, source: Source) -> ExtractedEntities {
        let mut result = ExtractedEntities::default();

        for schema in CATEGORIES.iter() {
            let kind = schema.kind;
            let items = raw.get(schema.key()).and_then(Value::as_array);
            let Some(items) = items else { continue };

            let mut seen = HashSet::new();
            let mut kept: Vec<Candidate> = Vec::new();
            for item in items {
                let Some(obj) = item.as_object() else { continue };
                let obj = &with_relationship_default(kind, obj);
                let label = label_of(kind, obj);
                let confidence = confidence_of(obj);

                if label.is_empty() || confidence < self.threshold {
                    debug!(kind = %kind, label = %label, confidence, "Filtered candidate");
                    continue;
                }
                if !seen.insert(label.to_lowercase()) {
                    debug!(kind = %kind, label = %label, "Dropped duplicate candidate");
                    continue;
                }

                let needle = mention_needle(kind, obj, &label);
                let mut fields = obj.clone();
                for key in MANAGED_FIELDS {
                    fields.remove(key);
                }
                kept.push(Candidate {
                    kind,
                    mentions: find_mentions(text, &needle, self.max_mentions, self.context_chars),
                    label,
                    confidence,
                    source,
                    fields,
                });
            }

            kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            result.categories.insert(kind, kept);
        }
        result
    }
}

/// Untyped relationships get [`DEFAULT_RELATIONSHIP_TYPE`] so they can be merged
fn with_relationship_default(kind: EntityKind, obj: &Map<String, Value>) -> Map<String, Value> {
    let mut obj = obj.clone();
    if kind == EntityKind::Relationship && str_field(&obj, "relationshipType").is_empty() {
        obj.insert("relationshipType".into(), Value::String(DEFAULT_RELATIONSHIP_TYPE.into()));
    }
    obj
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().trim()
}

fn label_of(kind: EntityKind, obj: &Map<String, Value>) -> String {
    if kind == EntityKind::Relationship {
        let from = str_field(obj, "fromEntity");
        let to = str_field(obj, "toEntity");
        if from.is_empty() || to.is_empty() {
            return String::new();
        }
        let ty = str_field(obj, "relationshipType");
        return format!("{from} {ty} {to}");
    }
    [descriptor(kind).label_key, "name", "title"]
        .into_iter()
        .map(|key| str_field(obj, key))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Missing or unreadable confidence counts as 0; values are clamped to [0, 1]
fn confidence_of(obj: &Map<String, Value>) -> f64 {
    let raw = match obj.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    raw.clamp(0.0, 1.0)
}

fn mention_needle(kind: EntityKind, obj: &Map<String, Value>, label: &str) -> String {
    if kind == EntityKind::Relationship {
        format!("{} {}", str_field(obj, "fromEntity"), str_field(obj, "toEntity"))
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_every_category_defined() {
        let out = EntityNormalizer::default().normalize(&Map::new(), "", Source::LlmAnalysis);
        assert_eq!(out.iter().count(), 12);
        assert!(out.is_empty());
        let wire = serde_json::to_value(&out).unwrap();
        assert_eq!(wire["magicSystems"], json!([]));
        assert_eq!(wire["relationships"], json!([]));
    }

    #[test]
    fn test_case_and_whitespace_duplicates_collapse() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"characters": [
                {"name": "Alice", "confidence": 0.9},
                {"name": "alice ", "confidence": 0.95}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let chars = out.get(EntityKind::Character);
        assert_eq!(chars.len(), 1);
        assert_eq!(chars[0].label, "Alice");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"objects": [
                {"name": "pebble", "confidence": 0.1},
                {"name": "key", "confidence": 0.2}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let labels: Vec<&str> = out.get(EntityKind::Object).iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["key"]);
    }

    #[test]
    fn test_missing_confidence_or_label_is_dropped() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"locations": [
                {"name": "attic"},
                {"name": "  ", "confidence": 0.9},
                "not an object",
                {"name": "garden", "confidence": "0.7"}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let labels: Vec<&str> = out.get(EntityKind::Location).iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["garden"]);
    }

    #[test]
    fn test_sorted_by_confidence_descending() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"themes": [
                {"name": "loss", "confidence": 0.4},
                {"name": "hope", "confidence": 0.9},
                {"name": "grief", "confidence": 0.6}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let labels: Vec<&str> = out.get(EntityKind::Theme).iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["hope", "grief", "loss"]);
    }

    #[test]
    fn test_lore_and_scene_use_title() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({
                "lore": [{"title": "The Moon Rite", "confidence": 0.8}],
                "scenes": [{"name": "Arrival", "confidence": 0.8}]
            })),
            "",
            Source::LlmAnalysis,
        );
        assert_eq!(out.get(EntityKind::Lore)[0].label, "The Moon Rite");
        assert_eq!(out.get(EntityKind::Scene)[0].label, "Arrival");
    }

    #[test]
    fn test_relationship_label_and_mentions() {
        let text = "They said Alice Bob was one word. Alice and Bob are siblings.";
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"relationships": [
                {"fromEntity": "Alice", "toEntity": "Bob", "relationshipType": "sibling", "confidence": 0.8},
                {"fromEntity": "Alice", "confidence": 0.8}
            ]})),
            text,
            Source::LlmAnalysis,
        );
        let rels = out.get(EntityKind::Relationship);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].label, "Alice sibling Bob");
        assert_eq!(rels[0].mentions.len(), 1);
    }

    #[test]
    fn test_untyped_relationship_gets_default_type() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"relationships": [
                {"fromEntity": "Alice", "toEntity": "Bob", "confidence": 0.8},
                {"fromEntity": "Carol", "toEntity": "Dan", "relationshipType": "  ", "confidence": 0.7}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let rels = out.get(EntityKind::Relationship);
        assert_eq!(rels[0].label, "Alice other Bob");
        assert_eq!(rels[0].text("relationshipType"), DEFAULT_RELATIONSHIP_TYPE);
        assert_eq!(rels[1].label, "Carol other Dan");
    }

    #[test]
    fn test_candidate_renders_scalar_fields() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"characters": [
                {"name": "Alice", "age": 30, "alive": false, "traits": "brave", "misc": {"a": 1}, "confidence": 0.9}
            ]})),
            "",
            Source::LlmAnalysis,
        );
        let alice = &out.get(EntityKind::Character)[0];
        assert_eq!(alice.text("age"), "30");
        assert_eq!(alice.text("alive"), "false");
        assert_eq!(alice.text("misc"), "");
        assert_eq!(alice.list("traits"), vec!["brave"]);
    }

    #[test]
    fn test_source_and_mentions_attached() {
        let text = "Alice ran. Alice hid. Alice slept. Alice woke.";
        let out = EntityNormalizer::default().normalize(
            &raw(json!({"characters": [{"name": "Alice", "confidence": 0.7, "source": "manual"}]})),
            text,
            Source::PatternAnalysis,
        );
        let alice = &out.get(EntityKind::Character)[0];
        assert_eq!(alice.source, Source::PatternAnalysis);
        assert_eq!(alice.mentions.len(), 3);
        assert!(!alice.fields.contains_key("source"));
    }

    #[test]
    fn test_stats() {
        let out = EntityNormalizer::default().normalize(
            &raw(json!({
                "characters": [{"name": "Alice", "confidence": 0.9}],
                "objects": [{"name": "key", "confidence": 0.5}]
            })),
            "",
            Source::LlmAnalysis,
        );
        let stats = AnalysisStats::of(&out);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.counts[&EntityKind::Character], 1);
        assert_eq!(stats.counts[&EntityKind::Scene], 0);
        assert!((stats.mean_confidence - 0.7).abs() < 1e-9);
        assert_eq!(AnalysisStats::of(&ExtractedEntities::default()).mean_confidence, 0.0);
    }

    proptest! {
        #[test]
        fn prop_case_variants_keep_one(name in "[a-z]{1,12}", upper in proptest::bool::ANY, pad in 0usize..3) {
            let variant = if upper { name.to_uppercase() } else { name.clone() };
            let padded = format!("{}{}{}", " ".repeat(pad), variant, " ".repeat(pad));
            let out = EntityNormalizer::default().normalize(
                &raw(json!({"characters": [
                    {"name": name, "confidence": 0.5},
                    {"name": padded, "confidence": 0.5}
                ]})),
                "",
                Source::LlmAnalysis,
            );
            prop_assert_eq!(out.get(EntityKind::Character).len(), 1);
        }

        #[test]
        fn prop_survivors_meet_threshold(confs in proptest::collection::vec(0.0f64..1.0, 0..20)) {
            let items: Vec<Value> = confs
                .iter()
                .enumerate()
                .map(|(i, c)| json!({"name": format!("n{i}"), "confidence": c}))
                .collect();
            let out = EntityNormalizer::default().normalize(
                &raw(json!({"events": items})),
                "",
                Source::LlmAnalysis,
            );
            let kept = out.get(EntityKind::Event);
            prop_assert!(kept.iter().all(|c| c.confidence >= 0.2));
            prop_assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        }
    }
}
