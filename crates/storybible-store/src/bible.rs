//! The Bible store: entity collections kept in step with key-value storage

use crate::search::SearchQuery;
use crate::StoreError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use storybible_domain::traits::KeyValueStorage;
use storybible_domain::{Entity, EntityId, EntityKind};
use tracing::{debug, info, warn};

/// Outcome of loading collections from storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records loaded per kind
    pub loaded: BTreeMap<EntityKind, usize>,
    /// Records skipped because they could not be parsed
    pub skipped: usize,
    /// Collections whose stored value was not readable JSON
    pub corrupt: Vec<EntityKind>,
}

/// Suffix of the key a corrupt collection's raw value is copied to before
/// the collection is first rewritten
pub const UNREADABLE_SUFFIX: &str = "_unreadable";

/// Story Bible collections backed by a [`KeyValueStorage`]
///
/// Each kind lives in one flat collection under its own storage key. Every
/// mutating call serializes the whole updated collection and writes it before
/// returning; the in-memory collection is only replaced after that write
/// succeeds, so a failed write (e.g. quota exceeded) leaves memory and storage
/// agreeing on the previous state.
///
/// Records that fail to parse on load are held aside and written back after
/// the readable ones on every persist, so a rewrite never drops them. A
/// collection that is not readable JSON at all is copied verbatim to
/// `<key>_unreadable` before its first rewrite.
///
/// Mutations take `&mut self`. Callers sharing a store across tasks wrap it
/// in a `Mutex`, which serializes each collection's read-modify-write cycle.
pub struct BibleStore<S: KeyValueStorage> {
    pub(crate) storage: S,
    collections: BTreeMap<EntityKind, Vec<Entity>>,
    unreadable: BTreeMap<EntityKind, Vec<Value>>,
    corrupt: BTreeMap<EntityKind, String>,
}

impl<S> BibleStore<S>
where
    S: KeyValueStorage,
    StoreError: From<S::Error>,
{
    /// Open a store over `storage`, loading every collection
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let mut store = Self {
            storage,
            collections: BTreeMap::new(),
            unreadable: BTreeMap::new(),
            corrupt: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Reload every collection from storage
    ///
    /// Unreadable collections load as empty and unparseable records are
    /// skipped; both are logged and held for the next write. Only a storage
    /// read failure is an error.
    pub fn load(&mut self) -> Result<LoadSummary, StoreError> {
        let mut summary = LoadSummary::default();
        let mut collections = BTreeMap::new();
        let mut unreadable: BTreeMap<EntityKind, Vec<Value>> = BTreeMap::new();
        let mut corrupt = BTreeMap::new();

        for kind in EntityKind::ALL {
            let key = kind.storage_key();
            let raw = match self.storage.get(&key)? {
                Some(raw) => raw,
                None => {
                    collections.insert(kind, Vec::new());
                    continue;
                }
            };

            let records = match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => items,
                Ok(Value::Null) => Vec::new(),
                Ok(obj @ Value::Object(_)) if kind.is_singleton() => vec![obj],
                Ok(_) | Err(_) => {
                    warn!(key = %key, "Collection is not valid JSON, loading as empty");
                    collections.insert(kind, Vec::new());
                    summary.corrupt.push(kind);
                    corrupt.insert(kind, raw);
                    continue;
                }
            };

            let mut entities = Vec::with_capacity(records.len());
            for (idx, record) in records.into_iter().enumerate() {
                match Entity::from_value(kind, record.clone()) {
                    Ok(entity) => entities.push(entity),
                    Err(e) => {
                        warn!(key = %key, index = idx, error = %e, "Skipping unreadable record");
                        summary.skipped += 1;
                        unreadable.entry(kind).or_default().push(record);
                    }
                }
            }
            summary.loaded.insert(kind, entities.len());
            collections.insert(kind, entities);
        }

        self.collections = collections;
        self.unreadable = unreadable;
        self.corrupt = corrupt;
        debug!(skipped = summary.skipped, "Loaded Story Bible collections");
        Ok(summary)
    }

    /// All entities of one kind, in insertion order
    pub fn list(&self, kind: EntityKind) -> &[Entity] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Raw records of `kind` that failed to parse on the last load
    pub fn unreadable(&self, kind: EntityKind) -> &[Value] {
        self.unreadable.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the held unreadable records of `kind`; the next write omits them
    pub fn discard_unreadable(&mut self, kind: EntityKind) -> usize {
        self.unreadable.remove(&kind).map_or(0, |records| records.len())
    }

    /// Look up an entity by kind and id
    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<&Entity> {
        self.list(kind).iter().find(|e| &e.id == id)
    }

    /// Look up an entity by id across every kind
    pub fn find(&self, id: &EntityId) -> Option<&Entity> {
        self.collections.values().flatten().find(|e| &e.id == id)
    }

    /// Look up an entity by case-insensitive, trimmed label
    ///
    /// With `kind = None` every kind except relationships is searched, in
    /// [`EntityKind::ALL`] order.
    pub fn find_by_label(&self, kind: Option<EntityKind>, label: &str) -> Option<&Entity> {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let kinds: Vec<EntityKind> = match kind {
            Some(k) => vec![k],
            None => EntityKind::ALL
                .into_iter()
                .filter(|k| *k != EntityKind::Relationship)
                .collect(),
        };
        kinds
            .into_iter()
            .flat_map(|k| self.list(k))
            .find(|e| e.dedup_key() == needle)
    }

    /// Create and persist an entity from a partial record
    ///
    /// Validates the label/required fields, merges over the kind's defaults,
    /// keeps a supplied `id` (rejecting one already in use) and stamps
    /// timestamps. On any error nothing is written and nothing changes.
    /// Adding a project overview replaces the existing one.
    pub fn add(&mut self, kind: EntityKind, partial: &Map<String, Value>) -> Result<Entity, StoreError> {
        let entity = Entity::create(kind, partial)?;
        self.insert(entity)
    }

    /// Persist an already-built entity
    pub fn insert(&mut self, entity: Entity) -> Result<Entity, StoreError> {
        let kind = entity.kind;
        if !kind.is_singleton() && self.find(&entity.id).is_some() {
            return Err(StoreError::DuplicateId(entity.id));
        }

        let mut next = if kind.is_singleton() {
            Vec::new()
        } else {
            self.list(kind).to_vec()
        };
        next.push(entity.clone());
        self.persist(kind, next)?;

        info!(kind = %kind, id = %entity.id, label = %entity.label, "Added entity");
        Ok(entity)
    }

    /// Merge `updates` into an entity and persist
    ///
    /// `id` and `createdAt` cannot be changed; `updatedAt` is refreshed.
    pub fn update(
        &mut self,
        kind: EntityKind,
        id: &EntityId,
        updates: &Map<String, Value>,
    ) -> Result<Entity, StoreError> {
        let mut next = self.list(kind).to_vec();
        let entity = next
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| StoreError::NotFound { kind, id: id.clone() })?;
        entity.apply_update(updates)?;
        let updated = entity.clone();

        self.persist(kind, next)?;
        debug!(kind = %kind, id = %id, "Updated entity");
        Ok(updated)
    }

    /// Remove an entity by id
    ///
    /// Returns whether anything was removed. Deleting an absent id is a
    /// no-op and performs no write.
    pub fn delete(&mut self, kind: EntityKind, id: &EntityId) -> Result<bool, StoreError> {
        Ok(self.delete_many(kind, std::slice::from_ref(id))? > 0)
    }

    /// Remove several entities of one kind with a single write
    pub fn delete_many(&mut self, kind: EntityKind, ids: &[EntityId]) -> Result<usize, StoreError> {
        let current = self.list(kind);
        let next: Vec<Entity> = current
            .iter()
            .filter(|e| !ids.contains(&e.id))
            .cloned()
            .collect();
        let removed = current.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(kind, next)?;
        info!(kind = %kind, removed, "Deleted entities");
        Ok(removed)
    }

    /// Create a relationship between two entities
    ///
    /// Endpoint kinds are recorded when the ids resolve; dangling ids are
    /// allowed and recorded with an `unknown` kind.
    pub fn link(
        &mut self,
        from: &EntityId,
        to: &EntityId,
        relationship_type: &str,
        description: &str,
    ) -> Result<Entity, StoreError> {
        let kind_of = |id: &EntityId| {
            self.find(id)
                .map(|e| e.kind.tag().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        };
        let partial = json!({
            "fromEntityId": from.as_str(),
            "fromEntityType": kind_of(from),
            "toEntityId": to.as_str(),
            "toEntityType": kind_of(to),
            "relationshipType": relationship_type,
            "description": description,
        });
        let partial = partial.as_object().cloned().unwrap_or_default();
        self.add(EntityKind::Relationship, &partial)
    }

    /// Relationships touching `id` on either end
    pub fn relationships_of(&self, id: &EntityId) -> Vec<&Entity> {
        self.list(EntityKind::Relationship)
            .iter()
            .filter(|r| r.text("fromEntityId") == id.as_str() || r.text("toEntityId") == id.as_str())
            .collect()
    }

    /// Every story entity, excluding relationships, brainstorms and the project
    pub fn all_entities(&self) -> Vec<&Entity> {
        EntityKind::ANALYZABLE
            .into_iter()
            .filter(|k| *k != EntityKind::Relationship)
            .flat_map(|k| self.list(k))
            .collect()
    }

    /// Number of entities per kind
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::ALL
            .into_iter()
            .map(|k| (k, self.list(k).len()))
            .collect()
    }

    /// Entities of every kind matching `query`
    pub fn search(&self, query: &SearchQuery) -> Vec<&Entity> {
        EntityKind::ALL
            .into_iter()
            .flat_map(|k| self.list(k))
            .filter(|e| query.matches(e))
            .collect()
    }

    /// The project overview, if one has been set
    pub fn project_overview(&self) -> Option<&Entity> {
        self.list(EntityKind::ProjectOverview).first()
    }

    /// Replace the project overview
    pub fn set_project_overview(&mut self, partial: &Map<String, Value>) -> Result<Entity, StoreError> {
        self.add(EntityKind::ProjectOverview, partial)
    }

    /// Merge updates into the project overview, creating it if absent
    pub fn update_project_overview(&mut self, updates: &Map<String, Value>) -> Result<Entity, StoreError> {
        match self.project_overview().map(|p| p.id.clone()) {
            Some(id) => self.update(EntityKind::ProjectOverview, &id, updates),
            None => self.set_project_overview(updates),
        }
    }

    /// Remove every collection and the metadata record
    ///
    /// Backups are kept.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        for kind in EntityKind::ALL {
            self.storage.remove(&kind.storage_key())?;
            self.collections.insert(kind, Vec::new());
        }
        self.unreadable.clear();
        self.corrupt.clear();
        self.storage.remove(crate::export::METADATA_KEY)?;
        info!("Cleared all Story Bible data");
        Ok(())
    }

    /// Borrow the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the store, returning the storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Write `next` as the whole collection for `kind`, then adopt it
    ///
    /// Held unreadable records are appended after `next`.
    pub(crate) fn persist(&mut self, kind: EntityKind, next: Vec<Entity>) -> Result<(), StoreError> {
        let key = kind.storage_key();
        let payload = if kind.is_singleton() {
            match next.first() {
                Some(entity) => serde_json::to_string(&entity.to_value())?,
                None => "null".to_string(),
            }
        } else {
            let values: Vec<Value> = next
                .iter()
                .map(Entity::to_value)
                .chain(self.unreadable(kind).iter().cloned())
                .collect();
            serde_json::to_string(&values)?
        };

        if let Some(raw) = self.corrupt.get(&kind) {
            let side_key = format!("{key}{UNREADABLE_SUFFIX}");
            self.storage.set(&side_key, raw)?;
            warn!(key = %key, copy = %side_key, "Preserved unreadable collection before rewrite");
        }

        if let Err(e) = self.storage.set(&key, &payload) {
            let err = StoreError::from(e);
            warn!(key = %key, error = %err, "Failed to persist collection");
            return Err(err);
        }
        self.corrupt.remove(&kind);
        self.collections.insert(kind, next);
        Ok(())
    }

    /// Forget every held unreadable record, e.g. before a full replace
    pub(crate) fn discard_all_unreadable(&mut self) {
        self.unreadable.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use pretty_assertions::assert_eq;
    use storybible_domain::Source;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn store() -> BibleStore<MemoryStorage> {
        BibleStore::open(MemoryStorage::new()).unwrap()
    }

    #[test]
    fn test_add_persists_whole_collection() {
        let mut bible = store();
        bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        bible.add(EntityKind::Character, &obj(json!({"name": "Bob"}))).unwrap();

        let raw = bible.storage().get("storyBible_characters").unwrap().unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["name"], json!("Bob"));
    }

    #[test]
    fn test_add_empty_name_is_rejected_without_mutation() {
        let mut bible = store();
        bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();

        let err = bible.add(EntityKind::Character, &obj(json!({"name": ""}))).unwrap_err();
        match err {
            StoreError::Validation(v) => assert!(v.contains("name is required")),
            other => panic!("Expected validation error, got {other:?}"),
        }
        assert_eq!(bible.list(EntityKind::Character).len(), 1);
    }

    #[test]
    fn test_add_rejects_confidence_outside_unit_range() {
        let mut bible = store();
        for bad in [5.0, -3.0] {
            let err = bible
                .add(EntityKind::Character, &obj(json!({"name": "A", "confidence": bad})))
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation(ref v) if v.contains("confidence must be between 0 and 1")));
        }
        assert!(bible.list(EntityKind::Character).is_empty());

        let edge = bible
            .add(EntityKind::Character, &obj(json!({"name": "A", "confidence": 0.0})))
            .unwrap();
        assert_eq!(edge.confidence, 0.0);
    }

    #[test]
    fn test_add_keeps_supplied_id_and_rejects_duplicates() {
        let mut bible = store();
        let e = bible
            .add(EntityKind::Object, &obj(json!({"id": "obj-1", "name": "key"})))
            .unwrap();
        assert_eq!(e.id.as_str(), "obj-1");

        let err = bible
            .add(EntityKind::Location, &obj(json!({"id": "obj-1", "name": "shed"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
        assert!(bible.list(EntityKind::Location).is_empty());
    }

    #[test]
    fn test_update_merges_and_keeps_identity() {
        let mut bible = store();
        let e = bible.add(EntityKind::Location, &obj(json!({"name": "house"}))).unwrap();
        let updated = bible
            .update(EntityKind::Location, &e.id, &obj(json!({"type": "building"})))
            .unwrap();
        assert_eq!(updated.id, e.id);
        assert_eq!(updated.created_at, e.created_at);
        assert_eq!(updated.text("type"), "building");
        assert_eq!(bible.get(EntityKind::Location, &e.id).unwrap().text("type"), "building");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut bible = store();
        let err = bible
            .update(EntityKind::Location, &EntityId::from("ghost"), &Map::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut bible = store();
        let e = bible.add(EntityKind::Theme, &obj(json!({"name": "love"}))).unwrap();
        bible.add(EntityKind::Theme, &obj(json!({"name": "power"}))).unwrap();

        assert!(bible.delete(EntityKind::Theme, &e.id).unwrap());
        let once = bible.storage().get("storyBible_themes").unwrap();
        assert!(!bible.delete(EntityKind::Theme, &e.id).unwrap());
        let twice = bible.storage().get("storyBible_themes").unwrap();

        assert_eq!(once, twice);
        assert_eq!(bible.list(EntityKind::Theme).len(), 1);
    }

    #[test]
    fn test_delete_never_existing_id_is_noop() {
        let mut bible = store();
        assert!(!bible.delete(EntityKind::Scene, &EntityId::from("nope")).unwrap());
        assert!(!bible.delete(EntityKind::Scene, &EntityId::from("nope")).unwrap());
        assert_eq!(bible.storage().get("storyBible_scenes").unwrap(), None);
    }

    #[test]
    fn test_delete_many() {
        let mut bible = store();
        let a = bible.add(EntityKind::Event, &obj(json!({"name": "the fire"}))).unwrap();
        let b = bible.add(EntityKind::Event, &obj(json!({"name": "the flood"}))).unwrap();
        bible.add(EntityKind::Event, &obj(json!({"name": "the wedding"}))).unwrap();
        assert_eq!(bible.delete_many(EntityKind::Event, &[a.id, b.id]).unwrap(), 2);
        assert_eq!(bible.list(EntityKind::Event).len(), 1);
    }

    #[test]
    fn test_quota_failure_leaves_memory_and_storage_in_step() {
        let mut bible = BibleStore::open(MemoryStorage::with_quota(1_200)).unwrap();
        bible.add(EntityKind::Timeline, &obj(json!({"name": "Main"}))).unwrap();

        let big = "x".repeat(2_000);
        let err = bible
            .add(EntityKind::Timeline, &obj(json!({"name": "Second", "description": big})))
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert_eq!(bible.list(EntityKind::Timeline).len(), 1);

        let storage = bible.into_storage();
        let reopened = BibleStore::open(storage).unwrap();
        assert_eq!(reopened.list(EntityKind::Timeline).len(), 1);
    }

    #[test]
    fn test_link_and_relationships_of() {
        let mut bible = store();
        let alice = bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        let house = bible.add(EntityKind::Location, &obj(json!({"name": "house"}))).unwrap();

        let rel = bible.link(&alice.id, &house.id, "lives_in", "").unwrap();
        assert_eq!(rel.label, "lives_in");
        assert_eq!(rel.text("fromEntityType"), "character");
        assert_eq!(rel.text("toEntityType"), "location");

        assert_eq!(bible.relationships_of(&alice.id).len(), 1);
        assert_eq!(bible.relationships_of(&house.id).len(), 1);
    }

    #[test]
    fn test_link_allows_dangling_ids() {
        let mut bible = store();
        let rel = bible
            .link(&EntityId::from("a"), &EntityId::from("b"), "enemy", "")
            .unwrap();
        assert_eq!(rel.text("toEntityType"), "unknown");
    }

    #[test]
    fn test_find_by_label_is_case_insensitive() {
        let mut bible = store();
        bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        assert!(bible.find_by_label(None, " alice ").is_some());
        assert!(bible.find_by_label(Some(EntityKind::Location), "alice").is_none());
    }

    #[test]
    fn test_all_entities_and_counts() {
        let mut bible = store();
        let a = bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        let b = bible.add(EntityKind::Lore, &obj(json!({"title": "Moon Rite"}))).unwrap();
        bible.link(&a.id, &b.id, "believes", "").unwrap();
        bible.add(EntityKind::BrainstormEntry, &obj(json!({"title": "twist?"}))).unwrap();

        assert_eq!(bible.all_entities().len(), 2);
        let counts = bible.counts();
        assert_eq!(counts[&EntityKind::Relationship], 1);
        assert_eq!(counts[&EntityKind::BrainstormEntry], 1);
        assert_eq!(counts[&EntityKind::Scene], 0);
    }

    #[test]
    fn test_project_overview_is_singleton() {
        let mut bible = store();
        bible.set_project_overview(&obj(json!({"title": "Draft"}))).unwrap();
        bible.set_project_overview(&obj(json!({"title": "The Letter"}))).unwrap();
        assert_eq!(bible.list(EntityKind::ProjectOverview).len(), 1);

        let p = bible
            .update_project_overview(&obj(json!({"genre": "mystery"})))
            .unwrap();
        assert_eq!(p.label, "The Letter");
        assert_eq!(p.text("genre"), "mystery");

        let raw = bible.storage().get("storyBible_project").unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_object());
    }

    #[test]
    fn test_search_across_kinds() {
        let mut bible = store();
        bible
            .add(EntityKind::Character, &obj(json!({"name": "Alice", "source": "llm_analysis", "confidence": 0.9})))
            .unwrap();
        bible.add(EntityKind::Location, &obj(json!({"name": "Alice's house"}))).unwrap();

        assert_eq!(bible.search(&SearchQuery::text("alice")).len(), 2);
        let llm_only = SearchQuery::text("alice").with_source(Source::LlmAnalysis);
        assert_eq!(bible.search(&llm_only).len(), 1);
    }

    #[test]
    fn test_load_skips_unreadable_records() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                "storyBible_characters",
                r#"[{"id": "c1", "name": "Alice"}, {"name": "no id"}, 42]"#,
            )
            .unwrap();
        storage.set("storyBible_locations", "not json").unwrap();

        let mut bible = BibleStore::open(storage).unwrap();
        assert_eq!(bible.list(EntityKind::Character).len(), 1);
        assert!(bible.list(EntityKind::Location).is_empty());

        let summary = bible.load().unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.corrupt, vec![EntityKind::Location]);
        assert_eq!(bible.unreadable(EntityKind::Character).len(), 2);
    }

    #[test]
    fn test_rewrite_keeps_unreadable_records() {
        let mut storage = MemoryStorage::new();
        storage
            .set("storyBible_characters", r#"[{"id": "c1", "name": "Alice"}, {"name": "no id"}]"#)
            .unwrap();
        let mut bible = BibleStore::open(storage).unwrap();

        bible.add(EntityKind::Character, &obj(json!({"name": "Bob"}))).unwrap();

        let raw = bible.storage().get("storyBible_characters").unwrap().unwrap();
        let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2], json!({"name": "no id"}));

        let mut reopened = BibleStore::open(bible.into_storage()).unwrap();
        assert_eq!(reopened.list(EntityKind::Character).len(), 2);
        assert_eq!(reopened.unreadable(EntityKind::Character).len(), 1);

        assert_eq!(reopened.discard_unreadable(EntityKind::Character), 1);
        reopened.add(EntityKind::Character, &obj(json!({"name": "Carol"}))).unwrap();
        let raw = reopened.storage().get("storyBible_characters").unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Vec<Value>>(&raw).unwrap().len(), 3);
    }

    #[test]
    fn test_corrupt_collection_copied_before_rewrite() {
        let mut storage = MemoryStorage::new();
        storage.set("storyBible_locations", "not json").unwrap();
        let mut bible = BibleStore::open(storage).unwrap();

        bible.add(EntityKind::Location, &obj(json!({"name": "Harbor"}))).unwrap();

        assert_eq!(
            bible.storage().get("storyBible_locations_unreadable").unwrap().as_deref(),
            Some("not json")
        );
        assert_eq!(bible.list(EntityKind::Location).len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let mut bible = store();
        bible.add(EntityKind::Character, &obj(json!({"name": "Alice"}))).unwrap();
        bible.clear_all().unwrap();
        assert!(bible.list(EntityKind::Character).is_empty());
        assert_eq!(bible.storage().get("storyBible_characters").unwrap(), None);
    }
}
