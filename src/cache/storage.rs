//! Record store trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::Cacheable;
use crate::db;
use crate::error::{Error, Result};

/// Trait for record store backends.
///
/// A store holds one full record set per entity type. There are no partial
/// lookups here; filtering happens over the materialized set.
pub trait RecordStore: Send + Sync {
  /// Replace the whole record set for `T` with `records`.
  fn replace_all<T: Cacheable>(&self, records: &[T]) -> Result<()>;

  /// Read the whole record set for `T`. Empty if never populated.
  fn read_all<T: Cacheable>(&self) -> Result<Vec<T>>;

  /// When the record set for `T` was last replaced.
  fn cached_at<T: Cacheable>(&self) -> Result<Option<DateTime<Utc>>>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl RecordStore for NoopStorage {
  fn replace_all<T: Cacheable>(&self, _records: &[T]) -> Result<()> {
    Ok(()) // Discard
  }

  fn read_all<T: Cacheable>(&self) -> Result<Vec<T>> {
    Ok(Vec::new()) // Always empty
  }

  fn cached_at<T: Cacheable>(&self) -> Result<Option<DateTime<Utc>>> {
    Ok(None)
  }
}

/// Bump when the layout below changes. The mirror is disposable, so the
/// schema script drops and recreates its tables.
const SCHEMA_VERSION: i32 = 1;

/// Schema for record tables.
const RECORD_SCHEMA: &str = r#"
DROP TABLE IF EXISTS records;
DROP TABLE IF EXISTS record_sets;

-- One row per mirrored record (stores serialized JSON)
CREATE TABLE records (
    entity_type TEXT NOT NULL,
    record_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (entity_type, record_key)
);

CREATE INDEX idx_records_position ON records(entity_type, position);

-- Record set tracking
CREATE TABLE record_sets (
    entity_type TEXT PRIMARY KEY,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    record_count INTEGER NOT NULL
);
"#;

/// SQLite-based record store implementation.
///
/// `replace_all` runs in a single transaction, so concurrent readers see
/// either the complete previous set or the complete new one.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite store at the given location.
  pub fn open(path: &Path) -> Result<Self> {
    Self::with_connection(db::open(path)?)
  }

  /// Create a store backed by a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(db::open_in_memory()?)
  }

  fn with_connection(mut conn: Connection) -> Result<Self> {
    db::migrate(&mut conn, SCHEMA_VERSION, RECORD_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::StorageUnavailable(format!("lock poisoned: {}", e)))
  }
}

impl RecordStore for SqliteStorage {
  fn replace_all<T: Cacheable>(&self, records: &[T]) -> Result<()> {
    let mut conn = self.lock()?;
    let entity_type = T::entity_type();

    let tx = conn.transaction()?;

    // Clear the previous set
    tx.execute(
      "DELETE FROM records WHERE entity_type = ?",
      params![entity_type],
    )?;

    for (position, record) in records.iter().enumerate() {
      let data = serde_json::to_vec(record)
        .map_err(|e| Error::StorageUnavailable(format!("failed to serialize record: {}", e)))?;

      tx.execute(
        "INSERT OR REPLACE INTO records (entity_type, record_key, position, data)
         VALUES (?, ?, ?, ?)",
        params![entity_type, record.cache_key(), position as i64, data],
      )?;
    }

    tx.execute(
      "INSERT OR REPLACE INTO record_sets (entity_type, cached_at, record_count)
       VALUES (?, datetime('now'), ?)",
      params![entity_type, records.len() as i64],
    )?;

    tx.commit()?;

    tracing::debug!(entity_type, count = records.len(), "Replaced record set");
    Ok(())
  }

  fn read_all<T: Cacheable>(&self) -> Result<Vec<T>> {
    let conn = self.lock()?;

    let mut stmt = conn.prepare(
      "SELECT data FROM records
       WHERE entity_type = ?
       ORDER BY position",
    )?;

    let rows = stmt
      .query_map(params![T::entity_type()], |row| row.get::<_, Vec<u8>>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    rows
      .iter()
      .map(|data| {
        serde_json::from_slice(data)
          .map_err(|e| Error::StorageUnavailable(format!("failed to deserialize record: {}", e)))
      })
      .collect()
  }

  fn cached_at<T: Cacheable>(&self) -> Result<Option<DateTime<Utc>>> {
    let conn = self.lock()?;

    let cached_at: Option<String> = conn
      .query_row(
        "SELECT cached_at FROM record_sets WHERE entity_type = ?",
        params![T::entity_type()],
        |row| row.get(0),
      )
      .optional()?;

    cached_at.as_deref().map(parse_datetime).transpose()
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| Error::StorageUnavailable(format!("failed to parse datetime '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    id: u32,
    label: String,
  }

  impl Cacheable for Item {
    fn cache_key(&self) -> String {
      self.id.to_string()
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  fn item(id: u32, label: &str) -> Item {
    Item {
      id,
      label: label.to_string(),
    }
  }

  #[test]
  fn test_read_all_before_any_write_is_empty() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert!(storage.read_all::<Item>().unwrap().is_empty());
    assert_eq!(storage.cached_at::<Item>().unwrap(), None);
  }

  #[test]
  fn test_replace_all_then_read_all_returns_same_set() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let items = vec![item(3, "c"), item(1, "a"), item(2, "b")];

    storage.replace_all(&items).unwrap();

    let mut read = storage.read_all::<Item>().unwrap();
    read.sort_by_key(|i| i.id);
    let mut expected = items.clone();
    expected.sort_by_key(|i| i.id);
    assert_eq!(read, expected);
    assert!(storage.cached_at::<Item>().unwrap().is_some());
  }

  #[test]
  fn test_replace_all_drops_previous_records() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.replace_all(&[item(1, "a"), item(2, "b")]).unwrap();
    storage.replace_all(&[item(3, "c")]).unwrap();

    assert_eq!(storage.read_all::<Item>().unwrap(), vec![item(3, "c")]);
  }

  #[test]
  fn test_replace_all_with_empty_set_clears_store() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.replace_all(&[item(1, "a")]).unwrap();
    storage.replace_all::<Item>(&[]).unwrap();

    assert!(storage.read_all::<Item>().unwrap().is_empty());
  }

  #[test]
  fn test_duplicate_key_keeps_last_occurrence() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .replace_all(&[item(1, "first"), item(1, "second")])
      .unwrap();

    assert_eq!(storage.read_all::<Item>().unwrap(), vec![item(1, "second")]);
  }

  #[test]
  fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.replace_all(&[item(7, "kept")]).unwrap();
    }

    let storage = SqliteStorage::open(&path).unwrap();
    assert_eq!(storage.read_all::<Item>().unwrap(), vec![item(7, "kept")]);
  }

  #[test]
  fn test_noop_storage_never_holds_data() {
    let storage = NoopStorage;
    storage.replace_all(&[item(1, "a")]).unwrap();
    assert!(storage.read_all::<Item>().unwrap().is_empty());
  }
}
