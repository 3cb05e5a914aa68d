//! SQLite-backed storage for cache generations and their responses.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::canonical::CacheKey;
use super::generation::{Generation, GenerationKind, GenerationState, IMAGE_CACHE};
use super::request::ResourceResponse;
use crate::db;
use crate::error::{Error, Result};

const SCHEMA_VERSION: i32 = 2;

/// Schema for resource cache tables.
const RESOURCE_SCHEMA: &str = r#"
DROP TABLE IF EXISTS resources;
DROP TABLE IF EXISTS generations;

-- Generation tags with explicit kind and lifecycle state
CREATE TABLE generations (
    name TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cached responses, owned by a generation
CREATE TABLE resources (
    generation TEXT NOT NULL REFERENCES generations(name) ON DELETE CASCADE ON UPDATE CASCADE,
    key_digest TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, key_digest)
);
"#;

/// Named cache generations and the responses they hold.
pub struct ResourceStore {
  conn: Mutex<Connection>,
}

impl ResourceStore {
  /// Open the resource cache at the given location.
  pub fn open(path: &Path) -> Result<Self> {
    Self::with_connection(db::open(path)?)
  }

  /// Open a resource cache backed by a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(db::open_in_memory()?)
  }

  fn with_connection(mut conn: Connection) -> Result<Self> {
    db::migrate(&mut conn, SCHEMA_VERSION, RESOURCE_SCHEMA)?;

    // The image sub-cache always exists and is never collected
    conn.execute(
      "INSERT OR IGNORE INTO generations (name, kind, state) VALUES (?, ?, ?)",
      params![
        IMAGE_CACHE,
        GenerationKind::Images.as_str(),
        GenerationState::Active.as_str()
      ],
    )?;

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

  /// Create a generation, discarding any previous one with the same name.
  pub fn create_generation(&self, name: &str, kind: GenerationKind, state: GenerationState) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM generations WHERE name = ?", params![name])?;
    tx.execute(
      "INSERT INTO generations (name, kind, state) VALUES (?, ?, ?)",
      params![name, kind.as_str(), state.as_str()],
    )?;
    tx.commit()?;
    Ok(())
  }

  pub fn set_state(&self, name: &str, state: GenerationState) -> Result<()> {
    let conn = self.lock()?;
    let updated = conn.execute(
      "UPDATE generations SET state = ? WHERE name = ?",
      params![state.as_str(), name],
    )?;
    if updated == 0 {
      return Err(Error::InvalidState(format!("no generation named {}", name)));
    }
    Ok(())
  }

  /// All generations, oldest first.
  pub fn generations(&self) -> Result<Vec<Generation>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT name, kind, state FROM generations ORDER BY created_at, rowid",
    )?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    rows
      .into_iter()
      .map(|(name, kind, state)| -> Result<Generation> {
        Ok(Generation {
          name,
          kind: kind.parse()?,
          state: state.parse()?,
        })
      })
      .collect()
  }

  /// The static generation in the given state, if any.
  pub fn find_static(&self, state: GenerationState) -> Result<Option<Generation>> {
    Ok(
      self
        .generations()?
        .into_iter()
        .rev()
        .find(|g| g.kind == GenerationKind::Static && g.state == state),
    )
  }

  /// Rename a generation, keeping its responses and replacing any generation
  /// already named `to`.
  pub fn rename_generation(&self, from: &str, to: &str) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM generations WHERE name = ?", params![to])?;
    let renamed = tx.execute(
      "UPDATE generations SET name = ? WHERE name = ?",
      params![to, from],
    )?;
    if renamed == 0 {
      return Err(Error::InvalidState(format!("no generation named {}", from)));
    }
    tx.commit()?;
    Ok(())
  }

  /// Delete a generation and every response it holds.
  pub fn delete_generation(&self, name: &str) -> Result<bool> {
    let conn = self.lock()?;
    let deleted = conn.execute("DELETE FROM generations WHERE name = ?", params![name])?;
    Ok(deleted > 0)
  }

  /// Store one response, overwriting any previous one under the same key.
  pub fn put(&self, generation: &str, key: &CacheKey, response: &ResourceResponse) -> Result<()> {
    self.put_all(generation, &[(key.clone(), response.clone())])
  }

  /// Store a batch of responses in one transaction.
  pub fn put_all(&self, generation: &str, entries: &[(CacheKey, ResourceResponse)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;

    for (key, response) in entries {
      let headers = serde_json::to_string(&response.headers)
        .map_err(|e| Error::StorageUnavailable(format!("failed to serialize headers: {}", e)))?;

      tx.execute(
        "INSERT OR REPLACE INTO resources
           (generation, key_digest, request_key, status, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          generation,
          key.digest(),
          key.to_string(),
          response.status,
          headers,
          response.body
        ],
      )?;
    }

    tx.commit()?;
    Ok(())
  }

  /// Look up a response by key.
  pub fn get(&self, generation: &str, key: &CacheKey) -> Result<Option<ResourceResponse>> {
    let conn = self.lock()?;

    let row: Option<(u16, String, Vec<u8>)> = conn
      .query_row(
        "SELECT status, headers, body FROM resources
         WHERE generation = ? AND key_digest = ?",
        params![generation, key.digest()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()?;

    row
      .map(|(status, headers, body)| -> Result<ResourceResponse> {
        let headers = serde_json::from_str(&headers)
          .map_err(|e| Error::StorageUnavailable(format!("failed to parse headers: {}", e)))?;
        Ok(ResourceResponse {
          status,
          headers,
          body,
        })
      })
      .transpose()
  }

  /// Number of responses held by a generation.
  pub fn count(&self, generation: &str) -> Result<usize> {
    let conn = self.lock()?;
    let count: i64 = conn.query_row(
      "SELECT COUNT(*) FROM resources WHERE generation = ?",
      params![generation],
      |row| row.get(0),
    )?;
    Ok(count as usize)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assets::request::ResourceRequest;

  fn key(url: &str) -> CacheKey {
    CacheKey::exact(&ResourceRequest::parse(url).unwrap())
  }

  #[test]
  fn test_image_cache_exists_from_the_start() {
    let store = ResourceStore::open_in_memory().unwrap();
    let generations = store.generations().unwrap();

    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0].name, IMAGE_CACHE);
    assert_eq!(generations[0].kind, GenerationKind::Images);
  }

  #[test]
  fn test_put_get_roundtrip_keeps_headers() {
    let store = ResourceStore::open_in_memory().unwrap();
    let k = key("http://localhost:8000/css/styles.css");
    let response = ResourceResponse::ok("body {}").with_header("content-type", "text/css");

    store.put(IMAGE_CACHE, &k, &response).unwrap();

    assert_eq!(store.get(IMAGE_CACHE, &k).unwrap(), Some(response));
    assert_eq!(store.get(IMAGE_CACHE, &key("http://localhost:8000/other")).unwrap(), None);
  }

  #[test]
  fn test_deleting_generation_drops_its_resources() {
    let store = ResourceStore::open_in_memory().unwrap();
    store
      .create_generation("restodir-static-v1", GenerationKind::Static, GenerationState::Active)
      .unwrap();
    let k = key("http://localhost:8000/index.html");
    store.put("restodir-static-v1", &k, &ResourceResponse::ok("<html>")).unwrap();
    assert_eq!(store.count("restodir-static-v1").unwrap(), 1);

    assert!(store.delete_generation("restodir-static-v1").unwrap());
    assert!(!store.delete_generation("restodir-static-v1").unwrap());
    assert_eq!(store.count("restodir-static-v1").unwrap(), 0);
  }

  #[test]
  fn test_recreating_generation_starts_empty() {
    let store = ResourceStore::open_in_memory().unwrap();
    store
      .create_generation("restodir-static-v1", GenerationKind::Static, GenerationState::Installing)
      .unwrap();
    store
      .put("restodir-static-v1", &key("http://h/a.js"), &ResourceResponse::ok("a"))
      .unwrap();

    store
      .create_generation("restodir-static-v1", GenerationKind::Static, GenerationState::Installing)
      .unwrap();
    assert_eq!(store.count("restodir-static-v1").unwrap(), 0);
  }

  #[test]
  fn test_rename_moves_resources_and_replaces_target() {
    let store = ResourceStore::open_in_memory().unwrap();
    let k = key("http://localhost:8000/index.html");
    store
      .create_generation("restodir-static-v2", GenerationKind::Static, GenerationState::Waiting)
      .unwrap();
    store.put("restodir-static-v2", &k, &ResourceResponse::ok("old")).unwrap();
    store
      .create_generation("staging", GenerationKind::Static, GenerationState::Installing)
      .unwrap();
    store.put("staging", &k, &ResourceResponse::ok("new")).unwrap();

    store.rename_generation("staging", "restodir-static-v2").unwrap();

    assert_eq!(store.count("staging").unwrap(), 0);
    assert_eq!(
      store.get("restodir-static-v2", &k).unwrap(),
      Some(ResourceResponse::ok("new"))
    );
    let names: Vec<String> = store.generations().unwrap().into_iter().map(|g| g.name).collect();
    assert_eq!(names.iter().filter(|n| *n == "restodir-static-v2").count(), 1);
    // Rolled back: the target survives a missing source
    assert!(matches!(
      store.rename_generation("missing", "restodir-static-v2"),
      Err(Error::InvalidState(_))
    ));
    assert_eq!(store.count("restodir-static-v2").unwrap(), 1);
  }

  #[test]
  fn test_set_state_on_unknown_generation_fails() {
    let store = ResourceStore::open_in_memory().unwrap();
    let err = store.set_state("nope", GenerationState::Active).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
  }

  #[test]
  fn test_state_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.db");

    {
      let store = ResourceStore::open(&path).unwrap();
      store
        .create_generation("restodir-static-v3", GenerationKind::Static, GenerationState::Waiting)
        .unwrap();
    }

    let store = ResourceStore::open(&path).unwrap();
    let waiting = store.find_static(GenerationState::Waiting).unwrap().unwrap();
    assert_eq!(waiting.name, "restodir-static-v3");
  }
}
