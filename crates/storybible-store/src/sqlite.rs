//! SQLite-backed key-value storage

use crate::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use storybible_domain::traits::KeyValueStorage;
use tracing::debug;

/// SQLite-based implementation of KeyValueStorage
///
/// Stores every key in a single `kv` table.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStorage instance.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) a database at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use storybible_store::SqliteStorage;
    ///
    /// let storage = SqliteStorage::new("storybible.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut storage = Self { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        debug!(key, bytes = value.len(), "Writing key");
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.conn.execute("DELETE FROM kv", [])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_read() {
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        storage.set("storyBible_characters", "[]").unwrap();
        storage.set("storyBible_characters", "[{}]").unwrap();
        assert_eq!(
            storage.get("storyBible_characters").unwrap().as_deref(),
            Some("[{}]")
        );
        assert_eq!(storage.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_key_is_none() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        assert_eq!(storage.get("nope").unwrap(), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["b".to_string()]);
        storage.clear().unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }
}
