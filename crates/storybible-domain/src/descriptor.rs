//! Per-kind descriptor table
//!
//! One table row per [`EntityKind`] replaces a hand-written factory and
//! validator for each kind. A row names the field that labels the entity,
//! the fields that must be present, and the default sub-structure a new
//! record starts from. [`build_record`] and [`validate`] are the only
//! creation/validation routines; both are driven entirely by the table.

use crate::kind::EntityKind;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Descriptor for one entity kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindDescriptor {
    /// The kind described
    pub kind: EntityKind,
    /// Field holding the human-readable label (`name`, `title`, ...)
    pub label_key: &'static str,
    /// Fields that must be non-blank strings
    pub required: &'static [&'static str],
    /// Value of the `type` field for new records, when the kind has one
    pub default_type: Option<&'static str>,
}

const DESCRIPTORS: [KindDescriptor; 14] = [
    KindDescriptor { kind: EntityKind::Character, label_key: "name", required: &["name"], default_type: None },
    KindDescriptor { kind: EntityKind::Location, label_key: "name", required: &["name"], default_type: Some("other") },
    KindDescriptor { kind: EntityKind::Object, label_key: "name", required: &["name"], default_type: Some("other") },
    KindDescriptor { kind: EntityKind::Organization, label_key: "name", required: &["name"], default_type: Some("other") },
    KindDescriptor { kind: EntityKind::Event, label_key: "name", required: &["name"], default_type: Some("other") },
    KindDescriptor { kind: EntityKind::MagicSystem, label_key: "name", required: &["name"], default_type: Some("hard") },
    KindDescriptor { kind: EntityKind::Timeline, label_key: "name", required: &["name"], default_type: Some("story") },
    KindDescriptor { kind: EntityKind::Theme, label_key: "name", required: &["name"], default_type: Some("major") },
    KindDescriptor { kind: EntityKind::Conflict, label_key: "name", required: &["name"], default_type: Some("internal") },
    KindDescriptor { kind: EntityKind::Lore, label_key: "title", required: &["title"], default_type: Some("tradition") },
    KindDescriptor { kind: EntityKind::Scene, label_key: "title", required: &["title"], default_type: None },
    KindDescriptor {
        kind: EntityKind::Relationship,
        label_key: "relationshipType",
        required: &["fromEntityId", "toEntityId", "relationshipType"],
        default_type: None,
    },
    KindDescriptor { kind: EntityKind::ProjectOverview, label_key: "title", required: &["title"], default_type: None },
    KindDescriptor { kind: EntityKind::BrainstormEntry, label_key: "title", required: &["title"], default_type: Some("idea") },
];

/// Pronoun values a character may carry
pub const ALLOWED_PRONOUNS: [&str; 4] = ["he/him", "she/her", "they/them", "other"];

/// Look up the descriptor row for a kind
pub fn descriptor(kind: EntityKind) -> &'static KindDescriptor {
    // ALL and DESCRIPTORS share one order
    &DESCRIPTORS[kind as usize]
}

/// Error raised when a record fails validation
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Kind of the rejected record
    pub kind: EntityKind,
    /// Human-readable problems, e.g. `"name is required"`
    pub errors: Vec<String>,
}

impl ValidationError {
    /// True when `message` is one of the listed problems
    pub fn contains(&self, message: &str) -> bool {
        self.errors.iter().any(|e| e == message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.kind, self.errors.join("; "))
    }
}

/// Validate a persisted-shape record against its kind's descriptor
///
/// Required fields must be strings that are non-empty after trimming.
/// A numeric `confidence` must lie in `[0, 1]`. Characters additionally
/// restrict `pronouns` to [`ALLOWED_PRONOUNS`].
///
/// # Examples
///
/// ```
/// use storybible_domain::{validate, EntityKind};
/// use serde_json::json;
///
/// let record = json!({"name": ""});
/// let err = validate(EntityKind::Character, record.as_object().unwrap()).unwrap_err();
/// assert!(err.contains("name is required"));
/// ```
pub fn validate(kind: EntityKind, record: &Map<String, Value>) -> Result<(), ValidationError> {
    let desc = descriptor(kind);
    let mut errors: Vec<String> = desc
        .required
        .iter()
        .filter(|field| !is_present(record.get(**field)))
        .map(|field| format!("{} is required", field))
        .collect();

    if let Some(confidence) = record.get("confidence").and_then(Value::as_f64) {
        if !(0.0..=1.0).contains(&confidence) {
            errors.push("confidence must be between 0 and 1".to_string());
        }
    }

    if kind == EntityKind::Character {
        if let Some(pronouns) = record.get("pronouns").and_then(Value::as_str) {
            if !pronouns.is_empty() && !ALLOWED_PRONOUNS.contains(&pronouns) {
                errors.push(format!(
                    "pronouns must be one of {}",
                    ALLOWED_PRONOUNS.join(", ")
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { kind, errors })
    }
}

fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

/// Build a full record for `kind` by deep-merging `partial` over the defaults
///
/// Common bookkeeping fields (`id`, timestamps, provenance) are not set here;
/// see [`crate::Entity`].
pub fn build_record(kind: EntityKind, partial: &Map<String, Value>) -> Map<String, Value> {
    let mut base = Value::Object(default_details(kind));
    deep_merge(&mut base, &Value::Object(partial.clone()));
    match base {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Recursively merge `overlay` into `base`
///
/// Objects merge key by key; any other overlay value replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Default sub-structure for a new record of `kind`
///
/// Includes the label field (as an empty string) and the kind-specific
/// nested sections, but none of the shared bookkeeping fields.
pub fn default_details(kind: EntityKind) -> Map<String, Value> {
    let desc = descriptor(kind);
    let mut value = match kind {
        EntityKind::Character => json!({
            "otherNames": [], "pronouns": "they/them", "age": "", "occupation": "",
            "role": "supporting", "description": "", "personality": "",
            "physical": {
                "height": "", "build": "", "hairColor": "", "eyeColor": "", "skinTone": "",
                "distinguishingFeatures": [], "clothingStyle": "", "appearance": ""
            },
            "psychology": {
                "personality": "", "motivations": [], "fears": [], "desires": [], "goals": [],
                "flaws": [], "strengths": [], "secrets": [], "coreBeliefs": [], "worldview": ""
            },
            "voice": {
                "speechPatterns": [], "vocabulary": "", "catchPhrases": [], "accent": "",
                "dialogueStyle": "", "voiceNotes": ""
            },
            "background": {
                "backstory": "", "family": [], "education": "", "significantEvents": [],
                "upbringing": "", "formativeExperiences": []
            },
            "relationships": [],
            "story": {
                "characterArc": "", "growthPoints": [], "keyMoments": [], "scenePresence": [],
                "plotSignificance": "", "firstAppearance": "", "characterFunction": ""
            },
            "groups": [],
            "media": { "images": [], "voiceReference": "", "inspirationNotes": "", "faceClaim": "" }
        }),
        EntityKind::Location => json!({
            "significance": "", "description": "", "atmosphere": "",
            "physical": {
                "description": "", "size": "", "layout": "", "architecture": "", "climate": "",
                "geography": "", "inhabitants": "", "population": ""
            },
            "sensory": {
                "atmosphere": "", "sounds": [], "smells": [], "lighting": "", "temperature": "",
                "textures": [], "overallMood": ""
            },
            "history": {
                "founded": "", "significantEvents": [], "previousNames": [],
                "culturalImportance": "", "legends": []
            },
            "story": {
                "scenesHere": [], "plotSignificance": "", "firstAppearance": "", "storyRole": "",
                "symbolism": "", "stateChanges": []
            },
            "connections": {
                "parentLocation": "", "childLocations": [], "connectedLocations": [], "travelTimes": {}
            },
            "media": { "maps": [], "images": [], "floorPlans": [], "inspirationNotes": "" }
        }),
        EntityKind::Object => json!({
            "owner": "", "location": "", "description": "", "significance": "",
            "physical": {
                "description": "", "size": "", "weight": "", "material": "", "condition": "",
                "appearance": "", "uniqueFeatures": []
            },
            "function": {
                "purpose": "", "howUsed": "", "abilities": [], "limitations": [], "specialProperties": []
            },
            "history": {
                "origin": "", "creator": "", "previousOwners": [], "significantEvents": [],
                "ageEstimate": "", "culturalContext": ""
            },
            "story": {
                "plotImportance": "", "symbolism": "", "keyScenes": [], "stateChanges": [],
                "firstAppearance": ""
            },
            "value": { "monetary": "", "sentimental": "", "magical": "", "rarity": "", "significance": "" },
            "relationships": { "relatedCharacters": [], "relatedLocations": [], "relatedObjects": [] },
            "media": { "images": [], "sketches": [], "inspirationNotes": "" }
        }),
        EntityKind::Organization => json!({
            "status": "active", "description": "",
            "structure": {
                "leadershipType": "", "hierarchy": [], "size": "", "members": [], "leaders": [],
                "departments": []
            },
            "purpose": {
                "goals": [], "methods": [], "resources": [], "territories": [], "activities": [],
                "influence": ""
            },
            "culture": {
                "values": [], "traditions": [], "symbols": [], "colors": [], "mottos": [], "ceremonies": []
            },
            "history": {
                "founded": "", "founders": [], "significantEvents": [], "conflicts": [],
                "alliances": [], "achievements": []
            },
            "relationships": {
                "allies": [], "enemies": [], "neutral": [], "parentOrganization": "",
                "childOrganizations": []
            },
            "story": { "plotRole": "", "conflictsWith": [], "keyScenes": [], "storyArc": "" }
        }),
        EntityKind::Event => json!({
            "date": "", "duration": "", "description": "",
            "context": {
                "location": "", "participants": [], "witnesses": [], "organizations": [], "description": ""
            },
            "causality": {
                "causes": [], "triggers": [], "consequences": [], "beforeState": "", "afterState": "",
                "significance": ""
            },
            "story": {
                "plotImportance": "", "storyFunction": "", "relatedScenes": [], "foreshadowing": [],
                "callbacks": []
            }
        }),
        EntityKind::MagicSystem => json!({
            "magicSource": "", "description": "",
            "mechanics": {
                "howItWorks": "", "energy": "", "limitations": [], "costs": [], "rules": [], "exceptions": []
            },
            "usage": {
                "whoCanUse": [], "learningProcess": "", "skill": "", "commonUses": [], "rareUses": [],
                "forbiddenUses": []
            },
            "world": {
                "culturalImpact": "", "economicImpact": "", "politicalImpact": "",
                "socialAcceptance": "", "history": "", "practitioners": []
            },
            "story": { "plotRole": "", "conflicts": [], "advantages": [], "disadvantages": [] }
        }),
        EntityKind::Timeline => json!({
            "timeframe": "", "description": "", "events": []
        }),
        EntityKind::Theme => json!({
            "description": "",
            "expression": {
                "symbols": [], "motifs": [], "characters": [], "locations": [], "objects": [],
                "events": [], "scenes": []
            },
            "development": { "introduction": "", "progression": "", "resolution": "", "techniques": [] }
        }),
        EntityKind::Conflict => json!({
            "category": "character", "description": "",
            "participants": { "protagonist": "", "antagonist": "", "allies": [], "affected": [] },
            "structure": { "setup": "", "escalation": [], "climax": "", "resolution": "", "aftermath": "" },
            "stakes": {
                "whatIsAtRisk": [], "consequences": [], "rewards": [], "personalStakes": [], "worldStakes": []
            },
            "story": {
                "plotFunction": "", "characterDevelopment": "", "themeConnection": "",
                "relatedScenes": [], "resolution": ""
            }
        }),
        EntityKind::Lore => json!({
            "category": "", "description": "",
            "content": {
                "description": "", "rules": [], "exceptions": [], "variations": [], "origins": "", "purpose": ""
            },
            "world": { "cultures": [], "regions": [], "practitioners": [], "influence": "", "enforcement": "" },
            "relationships": {
                "relatedCharacters": [], "relatedLocations": [], "relatedEvents": [], "conflictsWith": [],
                "supportsBy": []
            },
            "story": { "plotRelevance": "", "conflicts": [], "advantages": [], "complications": [] }
        }),
        EntityKind::Scene => json!({
            "description": "", "purpose": "",
            "context": { "location": "", "timeOfDay": "", "weather": "", "season": "", "duration": "", "pov": "" },
            "participants": { "characters": [], "mainCharacters": [], "backgroundCharacters": [] },
            "structure": {
                "objectives": [], "conflicts": [], "obstacles": [], "stakes": [], "outcome": "", "mood": "", "tone": ""
            },
            "story": {
                "plotFunction": "", "characterDevelopment": [], "worldBuilding": [], "themeExploration": [],
                "foreshadowing": [], "callbacks": []
            },
            "technical": { "order": 0, "chapter": "", "wordCount": 0, "pacing": "", "tension": "" },
            "elements": { "importantObjects": [], "events": [], "themes": [], "conflicts": [] }
        }),
        EntityKind::Relationship => json!({
            "fromEntityId": "", "fromEntityType": "", "toEntityId": "", "toEntityType": "",
            "description": "", "strength": "medium", "status": "current"
        }),
        EntityKind::ProjectOverview => json!({
            "subtitle": "", "genre": "", "subgenres": [], "style": "", "targetAudience": "",
            "content": { "braindump": "", "synopsis": "", "logline": "", "theme": "", "premise": "", "hooks": [] },
            "structure": {
                "format": "", "plannedLength": "", "currentWordCount": 0, "chapterCount": 0,
                "actStructure": [], "plotPoints": []
            },
            "development": {
                "status": "planning", "currentPhase": "", "completionPercentage": 0, "deadlines": [],
                "milestones": []
            },
            "world": {
                "setting": "", "timeperiod": "", "worldType": "", "worldComplexity": "", "magicSystem": "",
                "technology": ""
            },
            "characters": { "protagonistCount": 1, "mainCharacters": [], "supportingCharacters": [], "antagonists": [] },
            "themes": [], "conflicts": [],
            "media": { "coverArt": "", "moodBoard": [], "inspirationNotes": "", "references": [] }
        }),
        EntityKind::BrainstormEntry => json!({
            "content": "", "category": "",
            "classification": {
                "priority": "medium", "urgency": "normal", "complexity": "simple", "feasibility": "possible"
            },
            "development": {
                "expanded": false, "implemented": false, "transferredToBible": false,
                "relatedEntries": [], "childIdeas": [], "parentIdea": ""
            },
            "connections": {
                "relatedCharacters": [], "relatedLocations": [], "relatedObjects": [], "relatedThemes": [],
                "relatedConflicts": []
            }
        }),
    };

    if let Value::Object(map) = &mut value {
        map.insert(desc.label_key.to_string(), Value::String(String::new()));
        if let Some(default_type) = desc.default_type {
            map.insert("type".to_string(), Value::String(default_type.to_string()));
        }
    }
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_descriptor_rows_line_up_with_kinds() {
        for kind in EntityKind::ALL {
            assert_eq!(descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn test_label_keys() {
        assert_eq!(descriptor(EntityKind::Character).label_key, "name");
        assert_eq!(descriptor(EntityKind::Lore).label_key, "title");
        assert_eq!(descriptor(EntityKind::Scene).label_key, "title");
        assert_eq!(descriptor(EntityKind::Relationship).label_key, "relationshipType");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = validate(EntityKind::Character, &obj(json!({"name": ""}))).unwrap_err();
        assert_eq!(err.errors, vec!["name is required".to_string()]);
    }

    #[test]
    fn test_whitespace_name_is_rejected() {
        assert!(validate(EntityKind::Location, &obj(json!({"name": "   "}))).is_err());
    }

    #[test]
    fn test_non_string_name_is_rejected() {
        assert!(validate(EntityKind::Object, &obj(json!({"name": 42}))).is_err());
    }

    #[test]
    fn test_confidence_outside_unit_range_is_rejected() {
        for bad in [5.0, -3.0, 1.0001] {
            let err = validate(EntityKind::Character, &obj(json!({"name": "A", "confidence": bad}))).unwrap_err();
            assert!(err.contains("confidence must be between 0 and 1"), "{bad}");
        }
        for good in [0.0, 0.5, 1.0] {
            assert!(validate(EntityKind::Character, &obj(json!({"name": "A", "confidence": good}))).is_ok());
        }
    }

    #[test]
    fn test_lore_requires_title() {
        let err = validate(EntityKind::Lore, &obj(json!({"name": "The Old Ways"}))).unwrap_err();
        assert!(err.contains("title is required"));
        assert!(validate(EntityKind::Lore, &obj(json!({"title": "The Old Ways"}))).is_ok());
    }

    #[test]
    fn test_relationship_lists_every_missing_field() {
        let err = validate(EntityKind::Relationship, &obj(json!({"fromEntityId": "a"}))).unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                "toEntityId is required".to_string(),
                "relationshipType is required".to_string()
            ]
        );
    }

    #[test]
    fn test_character_pronouns_are_restricted() {
        let bad = obj(json!({"name": "Alice", "pronouns": "xe/xem"}));
        let err = validate(EntityKind::Character, &bad).unwrap_err();
        assert!(err.errors[0].starts_with("pronouns must be one of"));

        let good = obj(json!({"name": "Alice", "pronouns": "she/her"}));
        assert!(validate(EntityKind::Character, &good).is_ok());
    }

    #[test]
    fn test_build_record_fills_defaults() {
        let record = build_record(EntityKind::Character, &obj(json!({"name": "Alice"})));
        assert_eq!(record["name"], json!("Alice"));
        assert_eq!(record["pronouns"], json!("they/them"));
        assert_eq!(record["role"], json!("supporting"));
        assert_eq!(record["psychology"]["fears"], json!([]));
    }

    #[test]
    fn test_build_record_deep_merges_nested_sections() {
        let partial = obj(json!({
            "name": "Alice",
            "psychology": {"personality": "curious"}
        }));
        let record = build_record(EntityKind::Character, &partial);
        assert_eq!(record["psychology"]["personality"], json!("curious"));
        assert_eq!(record["psychology"]["worldview"], json!(""));
    }

    #[test]
    fn test_default_types() {
        let cases = [
            (EntityKind::Location, "other"),
            (EntityKind::MagicSystem, "hard"),
            (EntityKind::Timeline, "story"),
            (EntityKind::Theme, "major"),
            (EntityKind::Conflict, "internal"),
            (EntityKind::Lore, "tradition"),
            (EntityKind::BrainstormEntry, "idea"),
        ];
        for (kind, expected) in cases {
            assert_eq!(default_details(kind)["type"], json!(expected), "{kind}");
        }
        assert_eq!(default_details(EntityKind::Relationship)["strength"], json!("medium"));
        assert_eq!(default_details(EntityKind::Organization)["status"], json!("active"));
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base = json!({"tags": ["a"], "nested": {"x": 1, "y": 2}});
        deep_merge(&mut base, &json!({"tags": ["b"], "nested": {"y": 3}}));
        assert_eq!(base, json!({"tags": ["b"], "nested": {"x": 1, "y": 3}}));
    }
}
