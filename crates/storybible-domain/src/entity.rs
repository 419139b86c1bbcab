//! The generic entity record
//!
//! Every kind shares one [`Entity`] type. Kind-specific structure lives in
//! `details`, a free-form JSON object seeded from the descriptor table.
//! The persisted shape is a flat camelCase JSON object where the label sits
//! under the kind's label key (`name`, `title` or `relationshipType`).

use crate::descriptor::{build_record, deep_merge, descriptor, validate, ValidationError};
use crate::id::EntityId;
use crate::kind::EntityKind;
use crate::provenance::{Mention, Source};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Fields every kind carries outside of `details`
pub const COMMON_FIELDS: [&str; 8] = [
    "id",
    "tags",
    "notes",
    "source",
    "confidence",
    "mentions",
    "createdAt",
    "updatedAt",
];

/// Errors converting to or from the persisted record shape
#[derive(Error, Debug)]
pub enum EntityError {
    /// Record failed descriptor validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Record was not a JSON object
    #[error("Expected a JSON object for {0}")]
    NotAnObject(EntityKind),

    /// A common field had the wrong shape
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong
        reason: String,
    },
}

/// A Story Bible entity of any kind
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Immutable identifier
    pub id: EntityId,
    /// Kind of story element
    pub kind: EntityKind,
    /// Name or title
    pub label: String,
    /// Free-form labels
    pub tags: Vec<String>,
    /// Free-form notes
    pub notes: String,
    /// Provenance
    pub source: Source,
    /// Extraction certainty in [0, 1]
    pub confidence: f64,
    /// Located occurrences in a manuscript
    pub mentions: Vec<Mention>,
    /// Kind-specific fields
    pub details: Map<String, Value>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

/// Current time, truncated to the millisecond precision records persist
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl Entity {
    /// Create an entity from a partial record
    ///
    /// The partial is validated, then deep-merged over the kind's defaults.
    /// A non-blank `id` in the partial is kept (restore and import flows),
    /// otherwise a fresh one is assigned. Supplied timestamps are kept when
    /// they parse; missing ones are stamped with the current time.
    ///
    /// # Examples
    ///
    /// ```
    /// use storybible_domain::{Entity, EntityKind, Source};
    /// use serde_json::json;
    ///
    /// let partial = json!({"name": "Alice", "pronouns": "she/her"});
    /// let alice = Entity::create(EntityKind::Character, partial.as_object().unwrap()).unwrap();
    /// assert_eq!(alice.label, "Alice");
    /// assert_eq!(alice.source, Source::Manual);
    /// assert_eq!(alice.confidence, 1.0);
    /// ```
    pub fn create(kind: EntityKind, partial: &Map<String, Value>) -> Result<Self, EntityError> {
        let mut record = build_record(kind, partial);
        validate(kind, &record)?;

        let has_id = matches!(record.get("id"), Some(Value::String(s)) if !s.trim().is_empty());
        if !has_id {
            record.insert("id".into(), Value::String(EntityId::new().to_string()));
        }
        let stamp = Value::String(format_timestamp(&now()));
        for key in ["createdAt", "updatedAt"] {
            let parses = record
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| parse_timestamp(s).is_some());
            if !parses {
                record.insert(key.into(), stamp.clone());
            }
        }
        Self::from_record(kind, record)
    }

    /// Parse a persisted record
    ///
    /// Tolerates missing optional fields. The `id` must be present.
    /// Does not run descriptor validation; callers that need it use
    /// [`Entity::validate`].
    pub fn from_value(kind: EntityKind, value: Value) -> Result<Self, EntityError> {
        match value {
            Value::Object(map) => Self::from_record(kind, map),
            _ => Err(EntityError::NotAnObject(kind)),
        }
    }

    fn from_record(kind: EntityKind, mut map: Map<String, Value>) -> Result<Self, EntityError> {
        let id = match map.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => EntityId::from_string(s),
            _ => {
                return Err(EntityError::InvalidField {
                    field: "id",
                    reason: "missing or blank".to_string(),
                })
            }
        };

        let label_key = descriptor(kind).label_key;
        let label = map
            .get(label_key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        map.remove(label_key);

        let tags = match map.remove("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value(v).map_err(|e| EntityError::InvalidField {
                field: "tags",
                reason: e.to_string(),
            })?,
        };
        let notes = match map.remove("notes") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let source = match map.remove("source") {
            None | Some(Value::Null) => Source::Manual,
            Some(v) => serde_json::from_value(v).map_err(|e| EntityError::InvalidField {
                field: "source",
                reason: e.to_string(),
            })?,
        };
        let confidence = map
            .remove("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or_else(|| source.default_confidence())
            .clamp(0.0, 1.0);
        let mentions = match map.remove("mentions") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value(v).map_err(|e| EntityError::InvalidField {
                field: "mentions",
                reason: e.to_string(),
            })?,
        };
        let created_at = take_timestamp(&mut map, "createdAt")?;
        let updated_at = take_timestamp(&mut map, "updatedAt")?.max(created_at);

        Ok(Self {
            id,
            kind,
            label,
            tags,
            notes,
            source,
            confidence,
            mentions,
            details: map,
            created_at,
            updated_at,
        })
    }

    /// Render the persisted record shape
    pub fn to_value(&self) -> Value {
        let mut map = self.details.clone();
        map.insert(self.label_key().to_string(), Value::String(self.label.clone()));
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert(
            "tags".into(),
            Value::Array(self.tags.iter().cloned().map(Value::String).collect()),
        );
        map.insert("notes".into(), Value::String(self.notes.clone()));
        map.insert("source".into(), Value::String(self.source.as_str().to_string()));
        map.insert("confidence".into(), Value::from(self.confidence));
        map.insert(
            "mentions".into(),
            serde_json::to_value(&self.mentions).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        map.insert("createdAt".into(), Value::String(format_timestamp(&self.created_at)));
        map.insert("updatedAt".into(), Value::String(format_timestamp(&self.updated_at)));
        Value::Object(map)
    }

    /// Field holding this entity's label
    pub fn label_key(&self) -> &'static str {
        descriptor(self.kind).label_key
    }

    /// Run descriptor validation against the persisted shape
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.to_value() {
            Value::Object(map) => validate(self.kind, &map),
            _ => Ok(()),
        }
    }

    /// Read a kind-specific string field, or `""`
    pub fn text(&self, key: &str) -> &str {
        self.details.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Merge `updates` into this entity and bump `updated_at`
    ///
    /// `id` and `createdAt` in `updates` are ignored. The merged result is
    /// validated first; on error the entity is left untouched.
    pub fn apply_update(&mut self, updates: &Map<String, Value>) -> Result<(), EntityError> {
        let mut merged = self.to_value();
        let mut updates = updates.clone();
        updates.remove("id");
        updates.remove("createdAt");
        updates.remove("updatedAt");
        deep_merge(&mut merged, &Value::Object(updates));

        if let Value::Object(map) = &merged {
            validate(self.kind, map)?;
        }
        let mut next = Self::from_value(self.kind, merged)?;
        next.id = self.id.clone();
        next.created_at = self.created_at;
        next.updated_at = now().max(self.created_at);
        *self = next;
        Ok(())
    }

    /// Case-insensitive, trimmed label used for duplicate detection
    pub fn dedup_key(&self) -> String {
        self.label.trim().to_lowercase()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn take_timestamp(map: &mut Map<String, Value>, field: &'static str) -> Result<DateTime<Utc>, EntityError> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(now()),
        Some(Value::String(s)) => parse_timestamp(&s).ok_or_else(|| EntityError::InvalidField {
            field,
            reason: format!("not an RFC 3339 timestamp: {}", s),
        }),
        Some(other) => Err(EntityError::InvalidField {
            field,
            reason: format!("expected string, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_assigns_id_and_timestamps() {
        let e = Entity::create(EntityKind::Location, &obj(json!({"name": "The Old House"}))).unwrap();
        assert!(!e.id.is_empty());
        assert_eq!(e.created_at, e.updated_at);
        assert_eq!(e.text("type"), "other");
    }

    #[test]
    fn test_create_keeps_supplied_id() {
        let e = Entity::create(
            EntityKind::Character,
            &obj(json!({"id": "char-7", "name": "Bob"})),
        )
        .unwrap();
        assert_eq!(e.id.as_str(), "char-7");
    }

    #[test]
    fn test_create_rejects_missing_label() {
        let err = Entity::create(EntityKind::Character, &obj(json!({"name": ""}))).unwrap_err();
        match err {
            EntityError::Validation(v) => assert!(v.contains("name is required")),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_value_round_trip() {
        let e = Entity::create(
            EntityKind::Object,
            &obj(json!({
                "name": "letter",
                "type": "document",
                "tags": ["clue"],
                "source": "pattern_analysis",
                "confidence": 0.6,
                "mentions": [{"position": 3, "context": "a letter", "sentence": "a letter"}]
            })),
        )
        .unwrap();

        let back = Entity::from_value(EntityKind::Object, e.to_value()).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.source, Source::PatternAnalysis);
        assert_eq!(back.mentions.len(), 1);
    }

    #[test]
    fn test_label_stored_under_label_key() {
        let lore = Entity::create(EntityKind::Lore, &obj(json!({"title": "Moon Rite"}))).unwrap();
        let value = lore.to_value();
        assert_eq!(value["title"], json!("Moon Rite"));
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_apply_update_bumps_updated_at_only() {
        let mut e = Entity::create(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        let id = e.id.clone();
        let created = e.created_at;
        std::thread::sleep(std::time::Duration::from_millis(5));

        e.apply_update(&obj(json!({
            "id": "hijack",
            "createdAt": "2000-01-01T00:00:00.000Z",
            "psychology": {"personality": "brave"}
        })))
        .unwrap();

        assert_eq!(e.id, id);
        assert_eq!(e.created_at, created);
        assert!(e.updated_at > created);
        assert_eq!(e.details["psychology"]["personality"], json!("brave"));
        assert_eq!(e.details["psychology"]["worldview"], json!(""));
    }

    #[test]
    fn test_apply_update_rejects_blank_label() {
        let mut e = Entity::create(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        let before = e.clone();
        assert!(e.apply_update(&obj(json!({"name": " "}))).is_err());
        assert_eq!(e, before);
    }

    #[test]
    fn test_apply_update_rejects_out_of_range_confidence() {
        let mut e = Entity::create(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        assert!(e.apply_update(&obj(json!({"confidence": 1.5}))).is_err());
        assert!(e.apply_update(&obj(json!({"confidence": -0.1}))).is_err());
        assert_eq!(e.confidence, 1.0);
    }

    #[test]
    fn test_from_value_clamps_confidence() {
        let high = Entity::from_value(EntityKind::Object, json!({"id": "o1", "name": "key", "confidence": 5.0})).unwrap();
        let low = Entity::from_value(EntityKind::Object, json!({"id": "o2", "name": "map", "confidence": -3.0})).unwrap();
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_from_value_requires_id() {
        let result = Entity::from_value(EntityKind::Character, json!({"name": "Alice"}));
        assert!(matches!(result, Err(EntityError::InvalidField { field: "id", .. })));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(matches!(
            Entity::from_value(EntityKind::Scene, json!([1, 2])),
            Err(EntityError::NotAnObject(EntityKind::Scene))
        ));
    }

    #[test]
    fn test_dedup_key() {
        let e = Entity::create(EntityKind::Character, &obj(json!({"name": " Alice "}))).unwrap();
        assert_eq!(e.dedup_key(), "alice");
    }
}
