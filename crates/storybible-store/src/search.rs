//! Entity search filters

use chrono::{DateTime, Utc};
use storybible_domain::{Entity, EntityKind, Source};

/// Inclusive creation-time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    /// Earliest creation time
    pub start: DateTime<Utc>,
    /// Latest creation time
    pub end: DateTime<Utc>,
}

/// Search criteria; empty criteria match everything
///
/// Text matches case-insensitively against the label, `description` and
/// `notes`. All tags listed must be present on the entity.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text needle
    pub text: Option<String>,
    /// Restrict to one kind
    pub kind: Option<EntityKind>,
    /// Match the kind-specific `type` field (e.g. `"building"`)
    pub entity_type: Option<String>,
    /// Every tag must be present
    pub tags: Vec<String>,
    /// Restrict by provenance
    pub source: Option<Source>,
    /// Minimum confidence, inclusive
    pub min_confidence: Option<f64>,
    /// Creation-time window
    pub created: Option<DateRange>,
}

impl SearchQuery {
    /// Query matching a free-text needle
    pub fn text(needle: impl Into<String>) -> Self {
        Self {
            text: Some(needle.into()),
            ..Self::default()
        }
    }

    /// Restrict to one kind
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Require a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restrict by provenance
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Restrict to entities created within `range`
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.created = Some(DateRange { start, end });
        self
    }

    /// Whether `entity` satisfies every criterion
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(needle) = self.text.as_deref().map(str::to_lowercase).filter(|n| !n.is_empty()) {
            let hit = [entity.label.as_str(), entity.text("description"), entity.notes.as_str()]
                .iter()
                .any(|haystack| haystack.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.kind.is_some_and(|k| k != entity.kind) {
            return false;
        }
        if let Some(t) = &self.entity_type {
            if entity.text("type") != t {
                return false;
            }
        }
        if !self.tags.iter().all(|tag| entity.tags.contains(tag)) {
            return false;
        }
        if self.source.is_some_and(|s| s != entity.source) {
            return false;
        }
        if self.min_confidence.is_some_and(|min| entity.confidence < min) {
            return false;
        }
        if let Some(range) = &self.created {
            if entity.created_at < range.start || entity.created_at > range.end {
                return false;
            }
        }
        true
    }
}
