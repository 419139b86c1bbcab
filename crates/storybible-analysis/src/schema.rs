//! Candidate field table
//!
//! One row per analysis category: which fields the model is asked to return,
//! what an example value looks like, and where each field lands in the
//! persisted record. The prompt example, the normalizer and the merge layer
//! all read this table.

use storybible_domain::EntityKind;

/// Shape of a candidate field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A single string
    Text,
    /// An array of strings
    List,
}

/// One field of a category's candidate shape
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key in the model's JSON
    pub name: &'static str,
    /// Example value shown in the prompt
    pub example: &'static str,
    /// Text or list
    pub shape: FieldShape,
    /// Dotted path in the persisted record; `None` when not persisted
    pub target: Option<&'static str>,
}

/// Candidate shape for one analysis category
#[derive(Debug, Clone, Copy)]
pub struct CategorySchema {
    /// Entity kind the category maps to
    pub kind: EntityKind,
    /// Fields requested from the model, label first
    pub fields: &'static [FieldSpec],
}

impl CategorySchema {
    /// JSON category key (`"magicSystems"`)
    pub fn key(&self) -> &'static str {
        self.kind.collection_key()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

const fn text(name: &'static str, example: &'static str, target: &'static str) -> FieldSpec {
    FieldSpec { name, example, shape: FieldShape::Text, target: Some(target) }
}

const fn list(name: &'static str, example: &'static str, target: &'static str) -> FieldSpec {
    FieldSpec { name, example, shape: FieldShape::List, target: Some(target) }
}

const fn transient(name: &'static str, example: &'static str) -> FieldSpec {
    FieldSpec { name, example, shape: FieldShape::Text, target: None }
}

/// Every analysis category in report order
pub static CATEGORIES: [CategorySchema; 12] = [
    CategorySchema {
        kind: EntityKind::Character,
        fields: &[
            text("name", "character name", "name"),
            text("pronouns", "he/him, she/her, they/them or other", "pronouns"),
            text("age", "age or age range", "age"),
            text("role", "protagonist, antagonist, supporting or minor", "role"),
            text("description", "physical description", "description"),
            text("personality", "personality summary", "personality"),
            text("background", "background from the text", "background.backstory"),
            list("traits", "key trait", "tags"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Location,
        fields: &[
            text("name", "location name", "name"),
            text("type", "city, building, room, landmark, region or other", "type"),
            text("description", "what the place looks like", "description"),
            text("atmosphere", "mood of the place", "atmosphere"),
            text("significance", "importance to the story", "significance"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Object,
        fields: &[
            text("name", "object name", "name"),
            text("type", "document, tool, weapon, container, furniture or other", "type"),
            text("description", "what the object looks like", "description"),
            text("significance", "importance to the story", "significance"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Organization,
        fields: &[
            text("name", "organization name", "name"),
            text("type", "guild, government, religion, company or other", "type"),
            text("description", "purpose and members", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Event,
        fields: &[
            text("name", "event name", "name"),
            text("type", "battle, ceremony, discovery, disaster or other", "type"),
            text("date", "when it happens", "date"),
            text("description", "what happens", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::MagicSystem,
        fields: &[
            text("name", "magic system name", "name"),
            text("type", "hard or soft", "type"),
            text("magicSource", "where the power comes from", "magicSource"),
            text("description", "how it works", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Timeline,
        fields: &[
            text("name", "timeline name", "name"),
            text("type", "story, historical or personal", "type"),
            text("timeframe", "period covered", "timeframe"),
            text("description", "what the timeline tracks", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Theme,
        fields: &[
            text("name", "theme name", "name"),
            text("type", "major or minor", "type"),
            text("description", "how the theme shows up", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Conflict,
        fields: &[
            text("name", "conflict name", "name"),
            text("type", "internal, interpersonal, societal or environmental", "type"),
            text("description", "who is at odds and why", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Lore,
        fields: &[
            text("title", "lore title", "title"),
            text("type", "tradition, legend, law, custom or other", "type"),
            text("description", "what the lore says", "description"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Scene,
        fields: &[
            text("title", "scene title", "title"),
            text("description", "what happens in the scene", "description"),
            text("purpose", "what the scene does for the story", "purpose"),
        ],
    },
    CategorySchema {
        kind: EntityKind::Relationship,
        fields: &[
            transient("fromEntity", "name of the first entity"),
            transient("toEntity", "name of the second entity"),
            text("relationshipType", "friend, enemy, family, romantic, mentor or other", "relationshipType"),
            text("description", "how they relate", "description"),
        ],
    },
];

/// Candidate shape for `kind`, if it is an analysis category
pub fn schema_for(kind: EntityKind) -> Option<&'static CategorySchema> {
    CATEGORIES.iter().find(|c| c.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybible_domain::descriptor;

    #[test]
    fn test_categories_follow_analyzable_order() {
        let kinds: Vec<EntityKind> = CATEGORIES.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, EntityKind::ANALYZABLE.to_vec());
    }

    #[test]
    fn test_label_field_targets_descriptor_label() {
        for category in CATEGORIES.iter().filter(|c| c.kind != EntityKind::Relationship) {
            let label = descriptor(category.kind).label_key;
            let first = category.fields[0];
            assert_eq!(first.target, Some(label), "{}", category.key());
        }
    }

    #[test]
    fn test_relationship_endpoints_are_transient() {
        let schema = schema_for(EntityKind::Relationship).unwrap();
        assert!(schema.field("fromEntity").unwrap().target.is_none());
        assert!(schema.field("toEntity").unwrap().target.is_none());
    }
}
