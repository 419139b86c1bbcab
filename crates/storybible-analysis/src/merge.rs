//! Merge user-selected candidates into the Story Bible
//!
//! Candidates are selected by a stable key `"<prefix>-<index>"` (for
//! example `character-0` or `magicSystem-2`) that refers to a position in
//! an [`ExtractedEntities`] result. The collection key is accepted as a
//! prefix too.
//!
//! Each selected candidate is mapped onto its kind's persisted shape and
//! added through [`BibleStore::add`], one entity at a time. A failure
//! affects only that entity; earlier adds stay persisted.

use crate::error::AnalysisError;
use crate::normalizer::{Candidate, ExtractedEntities};
use crate::schema::{schema_for, FieldShape};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use storybible_domain::traits::KeyValueStorage;
use storybible_domain::{descriptor, Entity, EntityKind, ALLOWED_PRONOUNS};
use storybible_store::{BibleStore, StoreError};
use tracing::{info, warn};

/// Identifies one candidate in an analysis result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionKey {
    /// Category
    pub kind: EntityKind,
    /// Position within the category
    pub index: usize,
}

impl SelectionKey {
    /// Create a key
    pub fn new(kind: EntityKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.tag(), self.index)
    }
}

impl FromStr for SelectionKey {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AnalysisError::UnknownSelection(s.to_string());
        let (prefix, index) = s.trim().rsplit_once('-').ok_or_else(unknown)?;
        let kind: EntityKind = prefix.parse().map_err(|_| unknown())?;
        if !EntityKind::ANALYZABLE.contains(&kind) {
            return Err(unknown());
        }
        let index = index.parse().map_err(|_| unknown())?;
        Ok(Self { kind, index })
    }
}

/// A selected candidate that could not be added
#[derive(Debug)]
pub struct MergeFailure {
    /// Which selection failed
    pub key: SelectionKey,
    /// Candidate label, empty when the key did not resolve
    pub label: String,
    /// What went wrong
    pub error: AnalysisError,
}

/// Per-entity outcome of a merge
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Entities persisted, in processing order
    pub added: Vec<Entity>,
    /// Selections that were not persisted
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    /// True when every selection was added
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes candidates into a [`BibleStore`]
pub struct BibleSync<'a, S>
where
    S: KeyValueStorage,
{
    store: &'a mut BibleStore<S>,
}

impl<'a, S> BibleSync<'a, S>
where
    S: KeyValueStorage,
    StoreError: From<S::Error>,
{
    /// Wrap a store
    pub fn new(store: &'a mut BibleStore<S>) -> Self {
        Self { store }
    }

    /// The persisted-shape partial record for a candidate
    ///
    /// Candidate fields land at their schema targets; empty values are left
    /// out so kind defaults apply. Relationship endpoints are resolved by
    /// label against the store; an unresolved endpoint keeps its name as
    /// the id and is typed `unknown`.
    pub fn record_for(&self, candidate: &Candidate) -> Map<String, Value> {
        let kind = candidate.kind;
        let mut record = Map::new();

        if let Some(schema) = schema_for(kind) {
            for field in schema.fields {
                let Some(target) = field.target else { continue };
                let value = match field.shape {
                    FieldShape::Text => {
                        let text = candidate.text(field.name);
                        (!text.is_empty()).then(|| Value::String(text.to_string()))
                    }
                    FieldShape::List => {
                        let items = candidate.list(field.name);
                        (!items.is_empty()).then(|| json!(items))
                    }
                };
                if let Some(value) = value {
                    set_path(&mut record, target, value);
                }
            }
        }

        match kind {
            EntityKind::Relationship => {
                for (end, name_field) in [("from", "fromEntity"), ("to", "toEntity")] {
                    let name = candidate.text(name_field);
                    let (id, ty) = match self.store.find_by_label(None, &name) {
                        Some(entity) => (entity.id.to_string(), entity.kind.tag()),
                        None => (name.to_string(), "unknown"),
                    };
                    record.insert(format!("{end}EntityId"), Value::String(id));
                    record.insert(format!("{end}EntityType"), Value::String(ty.to_string()));
                }
            }
            _ => {
                record.insert(
                    descriptor(kind).label_key.to_string(),
                    Value::String(candidate.label.clone()),
                );
            }
        }

        if kind == EntityKind::Character {
            let pronouns = normalize_pronouns(&candidate.text("pronouns"));
            record.insert("pronouns".into(), Value::String(pronouns.to_string()));
        }

        record.insert(
            "notes".into(),
            Value::String(format!("Auto-detected ({:.2} confidence)", candidate.confidence)),
        );
        record.insert("source".into(), Value::String(candidate.source.as_str().to_string()));
        record.insert("confidence".into(), json!(candidate.confidence));
        record.insert("mentions".into(), json!(candidate.mentions));
        record
    }

    /// Add one candidate
    pub fn add(&mut self, candidate: &Candidate) -> Result<Entity, AnalysisError> {
        let record = self.record_for(candidate);
        Ok(self.store.add(candidate.kind, &record)?)
    }

    /// Add the selected candidates
    ///
    /// Relationships are processed after every other kind so their endpoints
    /// can resolve against entities added in the same batch.
    pub fn apply(&mut self, entities: &ExtractedEntities, keys: &[SelectionKey]) -> MergeReport {
        let mut ordered: Vec<SelectionKey> = keys.to_vec();
        ordered.sort_by_key(|k| k.kind == EntityKind::Relationship);

        let mut report = MergeReport::default();
        for key in ordered {
            let Some(candidate) = entities.get(key.kind).get(key.index) else {
                warn!(key = %key, "Selection does not match a candidate");
                report.failures.push(MergeFailure {
                    key,
                    label: String::new(),
                    error: AnalysisError::UnknownSelection(key.to_string()),
                });
                continue;
            };
            match self.add(candidate) {
                Ok(entity) => report.added.push(entity),
                Err(error) => {
                    warn!(key = %key, label = %candidate.label, error = %error, "Failed to add candidate");
                    report.failures.push(MergeFailure {
                        key,
                        label: candidate.label.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            added = report.added.len(),
            failed = report.failures.len(),
            "Merged candidates into Story Bible"
        );
        report
    }

    /// Add every candidate in the result
    pub fn apply_all(&mut self, entities: &ExtractedEntities) -> MergeReport {
        let keys: Vec<SelectionKey> = entities
            .iter()
            .flat_map(|(kind, candidates)| (0..candidates.len()).map(move |i| SelectionKey::new(kind, i)))
            .collect();
        self.apply(entities, &keys)
    }
}

/// Map free-form pronoun text onto an allowed value
fn normalize_pronouns(raw: &str) -> &'static str {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return "they/them";
    }
    if let Some(exact) = ALLOWED_PRONOUNS.iter().find(|p| **p == lower) {
        return exact;
    }
    let first = lower
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or_default();
    match first {
        "he" | "him" | "his" => "he/him",
        "she" | "her" | "hers" => "she/her",
        "they" | "them" | "their" => "they/them",
        _ => "other",
    }
}

/// Insert `value` at a dotted path, creating intermediate objects
fn set_path(record: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            record.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = record
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                set_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::EntityNormalizer;
    use pretty_assertions::assert_eq;
    use storybible_domain::Source;
    use storybible_store::MemoryStorage;

    fn store() -> BibleStore<MemoryStorage> {
        BibleStore::open(MemoryStorage::new()).unwrap()
    }

    fn extracted(raw: Value, text: &str) -> ExtractedEntities {
        EntityNormalizer::default().normalize(raw.as_object().unwrap(), text, Source::LlmAnalysis)
    }

    #[test]
    fn test_selection_key_round_trip() {
        let key: SelectionKey = "magicSystems-2".parse().unwrap();
        assert_eq!(key, SelectionKey::new(EntityKind::MagicSystem, 2));
        assert_eq!(key.to_string(), "magicSystem-2");
        assert_eq!("character-0".parse::<SelectionKey>().unwrap().kind, EntityKind::Character);
        assert_eq!(SelectionKey::new(EntityKind::Lore, 4).to_string().parse::<SelectionKey>().unwrap().index, 4);
    }

    #[test]
    fn test_selection_key_rejects_garbage() {
        for bad in ["characters", "dragons-1", "characters-x", "projectOverview-0"] {
            assert!(matches!(bad.parse::<SelectionKey>(), Err(AnalysisError::UnknownSelection(_))), "{bad}");
        }
    }

    #[test]
    fn test_pronoun_normalization() {
        assert_eq!(normalize_pronouns("She/Her"), "she/her");
        assert_eq!(normalize_pronouns("he"), "he/him");
        assert_eq!(normalize_pronouns("their"), "they/them");
        assert_eq!(normalize_pronouns(""), "they/them");
        assert_eq!(normalize_pronouns("xe/xem"), "other");
    }

    #[test]
    fn test_character_record_mapping() {
        let entities = extracted(
            json!({"characters": [{
                "name": "Alice",
                "pronouns": "she",
                "background": "Raised by her aunt",
                "traits": ["brave", "curious"],
                "confidence": 0.85
            }]}),
            "Alice smiled.",
        );
        let mut store = store();
        let sync = BibleSync::new(&mut store);
        let record = sync.record_for(&entities.get(EntityKind::Character)[0]);

        assert_eq!(record["name"], json!("Alice"));
        assert_eq!(record["pronouns"], json!("she/her"));
        assert_eq!(record["background"]["backstory"], json!("Raised by her aunt"));
        assert_eq!(record["tags"], json!(["brave", "curious"]));
        assert_eq!(record["notes"], json!("Auto-detected (0.85 confidence)"));
        assert_eq!(record["source"], json!("llm_analysis"));
        assert_eq!(record["mentions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_apply_adds_selected_only() {
        let entities = extracted(
            json!({
                "characters": [{"name": "Alice", "confidence": 0.9}, {"name": "Bob", "confidence": 0.8}],
                "objects": [{"name": "letter", "confidence": 0.7}]
            }),
            "",
        );
        let mut store = store();
        let report = BibleSync::new(&mut store).apply(
            &entities,
            &[SelectionKey::new(EntityKind::Character, 1), SelectionKey::new(EntityKind::Object, 0)],
        );

        assert!(report.is_complete());
        assert_eq!(report.added.len(), 2);
        assert_eq!(store.list(EntityKind::Character)[0].label, "Bob");
        assert_eq!(store.list(EntityKind::Object)[0].confidence, 0.7);
    }

    #[test]
    fn test_relationship_resolves_after_endpoints() {
        let entities = extracted(
            json!({
                "characters": [{"name": "Alice", "confidence": 0.9}],
                "relationships": [{
                    "fromEntity": "alice", "toEntity": "The Oracle",
                    "relationshipType": "mentor", "confidence": 0.6
                }]
            }),
            "",
        );
        let mut store = store();
        let keys = [SelectionKey::new(EntityKind::Relationship, 0), SelectionKey::new(EntityKind::Character, 0)];
        let report = BibleSync::new(&mut store).apply(&entities, &keys);
        assert!(report.is_complete());

        let alice = store.list(EntityKind::Character)[0].clone();
        let rel = &store.list(EntityKind::Relationship)[0];
        assert_eq!(rel.label, "mentor");
        assert_eq!(rel.text("fromEntityId"), alice.id.as_str());
        assert_eq!(rel.text("fromEntityType"), "character");
        assert_eq!(rel.text("toEntityId"), "The Oracle");
        assert_eq!(rel.text("toEntityType"), "unknown");
        assert_eq!(store.relationships_of(&alice.id).len(), 1);
    }

    #[test]
    fn test_failures_are_per_entity() {
        let entities = extracted(
            json!({
                "characters": [{"name": "Alice", "confidence": 0.9}],
                "relationships": [{"fromEntity": "Alice", "toEntity": "Bob", "confidence": 0.9}]
            }),
            "",
        );
        let mut store = store();
        let keys = [
            SelectionKey::new(EntityKind::Character, 0),
            SelectionKey::new(EntityKind::Character, 7),
            SelectionKey::new(EntityKind::Relationship, 0),
        ];
        let report = BibleSync::new(&mut store).apply(&entities, &keys);

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, AnalysisError::UnknownSelection(_)));
        assert_eq!(store.list(EntityKind::Character).len(), 1);
        assert_eq!(store.list(EntityKind::Relationship)[0].label, "other");
    }

    #[test]
    fn test_scalar_details_survive_merge() {
        let entities = extracted(
            json!({
                "characters": [{"name": "Alice", "age": 30, "traits": ["brave", 7, true], "confidence": 0.9}],
                "events": [{"name": "The Siege", "date": 1402, "confidence": 0.8}]
            }),
            "",
        );
        let mut store = store();
        let sync = BibleSync::new(&mut store);

        let alice = sync.record_for(&entities.get(EntityKind::Character)[0]);
        assert_eq!(alice["age"], json!("30"));
        assert_eq!(alice["tags"], json!(["brave", "7", "true"]));

        let siege = sync.record_for(&entities.get(EntityKind::Event)[0]);
        assert_eq!(siege["date"], json!("1402"));
    }

    #[test]
    fn test_set_path_nests() {
        let mut record = Map::new();
        set_path(&mut record, "background.backstory", json!("x"));
        set_path(&mut record, "background.family", json!([]));
        assert_eq!(Value::Object(record), json!({"background": {"backstory": "x", "family": []}}));
    }
}
