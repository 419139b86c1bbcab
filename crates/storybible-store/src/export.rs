//! Project export/import, backups and the storage metadata record

use crate::bible::BibleStore;
use crate::StoreError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use storybible_domain::entity::now;
use storybible_domain::traits::KeyValueStorage;
use storybible_domain::{Entity, EntityKind};
use tracing::{info, warn};

/// Envelope version written by [`BibleStore::export_project`]
pub const EXPORT_VERSION: &str = "2.0";

/// Version of the metadata record layout
pub const METADATA_VERSION: &str = "1.0.0";

/// Storage key of the metadata record
pub const METADATA_KEY: &str = "storyBible_metadata";

const BACKUP_PREFIX: &str = "backup_";

/// A full project snapshot
///
/// `entities` holds every non-relationship record, each tagged with an
/// `entityType` field. The project overview travels separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExport {
    /// Envelope version
    pub version: String,
    /// When the export was taken
    pub export_date: DateTime<Utc>,
    /// Project overview record, if any
    #[serde(default)]
    pub project: Option<Value>,
    /// Tagged entity records
    pub entities: Vec<Value>,
    /// Relationship records
    #[serde(default)]
    pub relationships: Vec<Value>,
    /// Summary information
    #[serde(default)]
    pub metadata: ExportMetadata,
}

/// Summary carried in an export envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// Records per collection key
    pub entity_counts: BTreeMap<String, usize>,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records imported per kind
    pub imported: BTreeMap<EntityKind, usize>,
    /// Reasons for every record that was skipped
    pub skipped: Vec<String>,
}

impl ImportSummary {
    /// Total records imported
    pub fn total(&self) -> usize {
        self.imported.values().sum()
    }
}

/// Bookkeeping record kept alongside the collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMetadata {
    /// Layout version
    pub version: String,
    /// Last successful collection write
    pub last_updated: Option<DateTime<Utc>>,
    /// Backups currently held
    pub backup_count: usize,
    /// Most recent backup
    pub last_backup: Option<DateTime<Utc>>,
    /// Most recent import or restore
    pub last_import: Option<DateTime<Utc>>,
}

impl Default for StorageMetadata {
    fn default() -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            last_updated: None,
            backup_count: 0,
            last_backup: None,
            last_import: None,
        }
    }
}

/// A stored backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// Storage key (`backup_<millis>`)
    pub key: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    /// Same instant as a date
    pub date: DateTime<Utc>,
}

impl<S> BibleStore<S>
where
    S: KeyValueStorage,
    StoreError: From<S::Error>,
{
    /// Snapshot every collection into an export envelope
    pub fn export_project(&self) -> ProjectExport {
        let mut entities = Vec::new();
        let mut entity_counts = BTreeMap::new();

        for kind in EntityKind::ALL {
            let records = self.list(kind);
            entity_counts.insert(kind.collection_key().to_string(), records.len());
            if kind.is_singleton() || kind == EntityKind::Relationship {
                continue;
            }
            for entity in records {
                let mut value = entity.to_value();
                if let Value::Object(map) = &mut value {
                    map.insert("entityType".into(), Value::String(kind.tag().to_string()));
                }
                entities.push(value);
            }
        }

        ProjectExport {
            version: EXPORT_VERSION.to_string(),
            export_date: now(),
            project: self.project_overview().map(Entity::to_value),
            entities,
            relationships: self
                .list(EntityKind::Relationship)
                .iter()
                .map(Entity::to_value)
                .collect(),
            metadata: ExportMetadata { entity_counts },
        }
    }

    /// Replace every collection with the contents of an export envelope
    ///
    /// The envelope must carry `version` and an `entities` array. Records
    /// keep their ids; records that fail validation, carry an unknown
    /// `entityType`, or repeat an id already imported are skipped and listed
    /// in the summary.
    pub fn import_project(&mut self, data: &Value) -> Result<ImportSummary, StoreError> {
        let envelope = data
            .as_object()
            .ok_or_else(|| StoreError::InvalidImport("expected a JSON object".into()))?;
        if !envelope.get("version").is_some_and(Value::is_string) {
            return Err(StoreError::InvalidImport("missing version".into()));
        }
        let entities = envelope
            .get("entities")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::InvalidImport("missing entities array".into()))?;

        let mut summary = ImportSummary::default();
        let mut seen = HashSet::new();
        let mut collections: BTreeMap<EntityKind, Vec<Entity>> =
            EntityKind::ALL.into_iter().map(|k| (k, Vec::new())).collect();

        let mut accept = |kind: EntityKind, record: &Map<String, Value>, summary: &mut ImportSummary| {
            match Entity::create(kind, record) {
                Ok(entity) if seen.insert(entity.id.clone()) => {
                    collections.entry(kind).or_default().push(entity);
                    *summary.imported.entry(kind).or_default() += 1;
                }
                Ok(entity) => summary.skipped.push(format!("duplicate id {}", entity.id)),
                Err(e) => summary.skipped.push(format!("{kind}: {e}")),
            }
        };

        for item in entities {
            let Some(record) = item.as_object() else {
                summary.skipped.push("entity is not an object".into());
                continue;
            };
            let mut record = record.clone();
            let kind = record
                .remove("entityType")
                .and_then(|t| t.as_str().and_then(|t| t.parse::<EntityKind>().ok()));
            match kind {
                Some(kind) if kind.is_singleton() => {
                    summary.skipped.push("project overview inside entities".into());
                }
                Some(kind) => accept(kind, &record, &mut summary),
                None => summary.skipped.push("missing or unknown entityType".into()),
            }
        }

        if let Some(rels) = envelope.get("relationships").and_then(Value::as_array) {
            for item in rels {
                match item.as_object() {
                    Some(record) => accept(EntityKind::Relationship, record, &mut summary),
                    None => summary.skipped.push("relationship is not an object".into()),
                }
            }
        }

        if let Some(project) = envelope.get("project").and_then(Value::as_object) {
            accept(EntityKind::ProjectOverview, project, &mut summary);
        }

        self.discard_all_unreadable();
        for (kind, records) in collections {
            self.persist(kind, records)?;
        }

        let mut meta = self.metadata()?;
        meta.last_import = Some(now());
        self.write_metadata(&meta)?;

        if !summary.skipped.is_empty() {
            warn!(skipped = summary.skipped.len(), "Import skipped records");
        }
        info!(imported = summary.total(), "Imported project");
        Ok(summary)
    }

    /// Import from a JSON string
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary, StoreError> {
        let data: Value = serde_json::from_str(json)?;
        self.import_project(&data)
    }

    /// Read the metadata record, or defaults when absent or unreadable
    pub fn metadata(&self) -> Result<StorageMetadata, StoreError> {
        let Some(raw) = self.storage.get(METADATA_KEY)? else {
            return Ok(StorageMetadata::default());
        };
        match serde_json::from_str(&raw) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                warn!(error = %e, "Metadata record unreadable, using defaults");
                Ok(StorageMetadata::default())
            }
        }
    }

    fn write_metadata(&mut self, meta: &StorageMetadata) -> Result<(), StoreError> {
        let mut meta = meta.clone();
        meta.last_updated = Some(now());
        let payload = serde_json::to_string(&meta)?;
        self.storage.set(METADATA_KEY, &payload)?;
        Ok(())
    }

    /// Write the current export under a fresh `backup_<millis>` key
    pub fn create_backup(&mut self) -> Result<BackupInfo, StoreError> {
        let export = self.export_project();
        let payload = serde_json::to_string(&export)?;

        let mut timestamp = export.export_date.timestamp_millis();
        while self.storage.get(&backup_key(timestamp))?.is_some() {
            timestamp += 1;
        }
        let key = backup_key(timestamp);
        self.storage.set(&key, &payload)?;

        let mut meta = self.metadata()?;
        meta.backup_count = self.list_backups()?.len();
        meta.last_backup = Some(export.export_date);
        self.write_metadata(&meta)?;

        info!(key = %key, "Created backup");
        Ok(BackupInfo {
            date: millis_to_date(timestamp),
            key,
            timestamp,
        })
    }

    /// Stored backups, newest first
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, StoreError> {
        let mut backups: Vec<BackupInfo> = self
            .storage
            .keys()?
            .into_iter()
            .filter_map(|key| {
                let timestamp = key.strip_prefix(BACKUP_PREFIX)?.parse::<i64>().ok()?;
                Some(BackupInfo {
                    date: millis_to_date(timestamp),
                    key,
                    timestamp,
                })
            })
            .collect();
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Replace every collection with a stored backup
    pub fn restore_backup(&mut self, key: &str) -> Result<ImportSummary, StoreError> {
        let raw = self
            .storage
            .get(key)?
            .ok_or_else(|| StoreError::BackupNotFound(key.to_string()))?;
        let data: Value = serde_json::from_str(&raw)?;
        let summary = self.import_project(&data)?;
        info!(key, "Restored backup");
        Ok(summary)
    }

    /// Remove a stored backup; returns whether it existed
    pub fn delete_backup(&mut self, key: &str) -> Result<bool, StoreError> {
        if !key.starts_with(BACKUP_PREFIX) || self.storage.get(key)?.is_none() {
            return Ok(false);
        }
        self.storage.remove(key)?;

        let mut meta = self.metadata()?;
        meta.backup_count = self.list_backups()?.len();
        self.write_metadata(&meta)?;
        Ok(true)
    }
}

fn backup_key(timestamp: i64) -> String {
    format!("{BACKUP_PREFIX}{timestamp}")
}

fn millis_to_date(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .unwrap_or_default()
}
