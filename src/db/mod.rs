//! SQLite connection helpers shared by the record store and the resource cache.

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Open or create a database at `path`, creating parent directories as needed.
pub fn open(path: &Path) -> Result<Connection> {
  // Ensure parent directory exists
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| {
      Error::StorageUnavailable(format!(
        "failed to create directory {}: {}",
        parent.display(),
        e
      ))
    })?;
  }

  let conn = Connection::open(path).map_err(|e| {
    Error::StorageUnavailable(format!(
      "failed to open database at {}: {}",
      path.display(),
      e
    ))
  })?;
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;

  Ok(conn)
}

/// Open a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
  let conn = Connection::open_in_memory()?;
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;
  Ok(conn)
}

/// Get the default data directory.
pub fn default_data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| Error::StorageUnavailable("could not determine data directory".into()))?;

  Ok(data_dir.join("restodir"))
}

/// Bring the schema up to `version`.
///
/// The schema is tracked in `PRAGMA user_version`. When the stored version is
/// older, `schema` runs once inside a transaction and the version is bumped.
/// Returns whether the schema script ran.
pub fn migrate(conn: &mut Connection, version: i32, schema: &str) -> Result<bool> {
  let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
  if current >= version {
    return Ok(false);
  }

  let tx = conn.transaction()?;
  tx.execute_batch(schema)?;
  tx.pragma_update(None, "user_version", version)?;
  tx.commit()?;

  tracing::info!(from = current, to = version, "Migrated cache schema");
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS t (id INTEGER PRIMARY KEY);";

  #[test]
  fn test_migrate_runs_once_per_version() {
    let mut conn = open_in_memory().unwrap();
    assert!(migrate(&mut conn, 1, SCHEMA).unwrap());
    assert!(!migrate(&mut conn, 1, SCHEMA).unwrap());
    assert!(migrate(&mut conn, 2, SCHEMA).unwrap());

    let version: i32 = conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .unwrap();
    assert_eq!(version, 2);
  }

  #[test]
  fn test_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");
    open(&path).unwrap();
    assert!(path.exists());
  }
}
