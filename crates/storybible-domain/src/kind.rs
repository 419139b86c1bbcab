//! Entity kinds tracked by the Story Bible

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fourteen kinds of story element a Story Bible can hold
///
/// Serialized in camelCase (`magicSystem`, `projectOverview`), which is also
/// the `entityType` tag written into project exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// A person or being in the story
    Character,
    /// A place
    Location,
    /// A notable item
    Object,
    /// A faction, guild, family or other group
    Organization,
    /// Something that happens
    Event,
    /// Rules of magic or technology
    MagicSystem,
    /// A chronology
    Timeline,
    /// A recurring idea
    Theme,
    /// A source of tension
    Conflict,
    /// Myths, traditions, history
    Lore,
    /// A unit of narrative
    Scene,
    /// A typed edge between two other entities
    Relationship,
    /// The singleton project summary
    ProjectOverview,
    /// A free-form idea
    BrainstormEntry,
}

impl EntityKind {
    /// Every kind, in persistence order
    pub const ALL: [EntityKind; 14] = [
        EntityKind::Character,
        EntityKind::Location,
        EntityKind::Object,
        EntityKind::Organization,
        EntityKind::Event,
        EntityKind::MagicSystem,
        EntityKind::Timeline,
        EntityKind::Theme,
        EntityKind::Conflict,
        EntityKind::Lore,
        EntityKind::Scene,
        EntityKind::Relationship,
        EntityKind::ProjectOverview,
        EntityKind::BrainstormEntry,
    ];

    /// The twelve categories text analysis extracts, in report order
    pub const ANALYZABLE: [EntityKind; 12] = [
        EntityKind::Character,
        EntityKind::Location,
        EntityKind::Object,
        EntityKind::Organization,
        EntityKind::Event,
        EntityKind::MagicSystem,
        EntityKind::Timeline,
        EntityKind::Theme,
        EntityKind::Conflict,
        EntityKind::Lore,
        EntityKind::Scene,
        EntityKind::Relationship,
    ];

    /// Collection name, also the category key in analysis JSON
    pub fn collection_key(&self) -> &'static str {
        match self {
            EntityKind::Character => "characters",
            EntityKind::Location => "locations",
            EntityKind::Object => "objects",
            EntityKind::Organization => "organizations",
            EntityKind::Event => "events",
            EntityKind::MagicSystem => "magicSystems",
            EntityKind::Timeline => "timelines",
            EntityKind::Theme => "themes",
            EntityKind::Conflict => "conflicts",
            EntityKind::Lore => "lore",
            EntityKind::Scene => "scenes",
            EntityKind::Relationship => "relationships",
            EntityKind::ProjectOverview => "project",
            EntityKind::BrainstormEntry => "brainstorms",
        }
    }

    /// Singular camelCase tag, used in selection keys and export envelopes
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Location => "location",
            EntityKind::Object => "object",
            EntityKind::Organization => "organization",
            EntityKind::Event => "event",
            EntityKind::MagicSystem => "magicSystem",
            EntityKind::Timeline => "timeline",
            EntityKind::Theme => "theme",
            EntityKind::Conflict => "conflict",
            EntityKind::Lore => "lore",
            EntityKind::Scene => "scene",
            EntityKind::Relationship => "relationship",
            EntityKind::ProjectOverview => "projectOverview",
            EntityKind::BrainstormEntry => "brainstormEntry",
        }
    }

    /// Key-value storage key holding this kind's collection
    pub fn storage_key(&self) -> String {
        format!("storyBible_{}", self.collection_key())
    }

    /// Whether the kind is stored as a single record rather than an array
    pub fn is_singleton(&self) -> bool {
        matches!(self, EntityKind::ProjectOverview)
    }

    /// Resolve an analysis category key (`"magicSystems"`) to its kind
    pub fn from_collection_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection_key() == key)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts either the singular tag or the collection key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == s || k.collection_key() == s)
            .ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        assert_eq!(EntityKind::Character.storage_key(), "storyBible_characters");
        assert_eq!(EntityKind::MagicSystem.storage_key(), "storyBible_magicSystems");
        assert_eq!(EntityKind::ProjectOverview.storage_key(), "storyBible_project");
        assert_eq!(EntityKind::BrainstormEntry.storage_key(), "storyBible_brainstorms");
    }

    #[test]
    fn test_analyzable_excludes_project_and_brainstorm() {
        assert!(!EntityKind::ANALYZABLE.contains(&EntityKind::ProjectOverview));
        assert!(!EntityKind::ANALYZABLE.contains(&EntityKind::BrainstormEntry));
        assert_eq!(EntityKind::ANALYZABLE.len(), 12);
    }

    #[test]
    fn test_parse_tag_and_collection_key() {
        assert_eq!("magicSystem".parse::<EntityKind>().unwrap(), EntityKind::MagicSystem);
        assert_eq!("magicSystems".parse::<EntityKind>().unwrap(), EntityKind::MagicSystem);
        assert_eq!("lore".parse::<EntityKind>().unwrap(), EntityKind::Lore);
        assert!("dragon".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_serde_matches_tag() {
        for kind in EntityKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.tag()));
        }
    }

    #[test]
    fn test_collection_keys_are_unique() {
        let mut keys: Vec<_> = EntityKind::ALL.iter().map(|k| k.collection_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), EntityKind::ALL.len());
    }
}
