//! In-memory key-value storage

use crate::StoreError;
use std::collections::BTreeMap;
use storybible_domain::traits::KeyValueStorage;

/// In-memory key-value storage
///
/// With a quota set, a write that would push the total size of keys and
/// values past the limit fails with [`StoreError::QuotaExceeded`] and leaves
/// the previous value in place.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store limited to `bytes` of keys plus values
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    /// Change or lift the quota
    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        if let Some(quota) = self.quota {
            let current = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let needed = self.used_bytes() - current + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.entries.keys().cloned().collect())
    }
}
