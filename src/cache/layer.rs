//! Cache layer that orchestrates network fetching with the local mirror.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::RecordStore;
use super::traits::{CacheResult, Cacheable};
use crate::error::Result;

/// Cache layer that manages the network-first policy.
///
/// This layer sits between the application and the network client. Fresh
/// network data is written through to the store; when the network is
/// unavailable or fails, the last written set is served instead.
pub struct CacheLayer<S: RecordStore> {
  storage: Arc<S>,
}

impl<S: RecordStore> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Access the underlying store.
  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Fetch the full record set with a network-first strategy.
  ///
  /// 1. If `online`, fetch from network
  /// 2. On success, replace the stored set and return the fresh data
  /// 3. On failure or when offline, return the stored set
  ///
  /// Never fails: a store that cannot be read counts as an empty cache.
  pub async fn fetch_all<T, F, Fut>(&self, online: bool, fetcher: F) -> CacheResult<Vec<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    if !online {
      debug!(entity_type = T::entity_type(), "Offline, serving local copy");
      let (data, cached_at) = self.read_cached::<T>();
      return CacheResult::offline(data, cached_at);
    }

    match fetcher().await {
      Ok(data) => {
        // Write-through; a failed write only costs us the offline copy
        if let Err(e) = self.storage.replace_all(&data) {
          warn!(entity_type = T::entity_type(), error = %e, "Failed to update local copy");
        }
        CacheResult::from_network(data)
      }
      Err(e) => {
        warn!(entity_type = T::entity_type(), error = %e, "Network fetch failed, serving local copy");
        let (data, cached_at) = self.read_cached::<T>();
        CacheResult::fallback(data, cached_at)
      }
    }
  }

  /// Read the stored set, treating storage errors as "no cache".
  fn read_cached<T: Cacheable>(&self) -> (Vec<T>, Option<chrono::DateTime<chrono::Utc>>) {
    let data = match self.storage.read_all::<T>() {
      Ok(data) => data,
      Err(e) => {
        warn!(entity_type = T::entity_type(), error = %e, "Local copy unavailable");
        return (Vec::new(), None);
      }
    };
    let cached_at = self.storage.cached_at::<T>().unwrap_or_else(|e| {
      debug!(entity_type = T::entity_type(), error = %e, "Failed to read cache timestamp");
      None
    });
    (data, cached_at)
  }
}

impl<S: RecordStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, SqliteStorage};
  use crate::error::Error;
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item(u32);

  impl Cacheable for Item {
    fn cache_key(&self) -> String {
      self.0.to_string()
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  /// Store whose every operation fails.
  struct BrokenStorage;

  impl RecordStore for BrokenStorage {
    fn replace_all<T: Cacheable>(&self, _records: &[T]) -> Result<()> {
      Err(Error::StorageUnavailable("quota exceeded".into()))
    }

    fn read_all<T: Cacheable>(&self) -> Result<Vec<T>> {
      Err(Error::StorageUnavailable("quota exceeded".into()))
    }

    fn cached_at<T: Cacheable>(&self) -> Result<Option<DateTime<Utc>>> {
      Err(Error::StorageUnavailable("quota exceeded".into()))
    }
  }

  fn seeded_layer(items: &[Item]) -> CacheLayer<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.replace_all(items).unwrap();
    CacheLayer::new(storage)
  }

  #[tokio::test]
  async fn test_online_success_writes_through() {
    let layer = seeded_layer(&[Item(1)]);

    let result = layer
      .fetch_all(true, || async { Ok(vec![Item(2), Item(3)]) })
      .await;

    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data, vec![Item(2), Item(3)]);
    assert_eq!(
      layer.storage().read_all::<Item>().unwrap(),
      vec![Item(2), Item(3)]
    );
  }

  #[tokio::test]
  async fn test_network_failure_falls_back_to_store() {
    let layer = seeded_layer(&[Item(1), Item(2)]);

    let result = layer
      .fetch_all::<Item, _, _>(true, || async {
        Err(Error::NetworkFailure("status 500".into()))
      })
      .await;

    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data, vec![Item(1), Item(2)]);
    assert!(result.cached_at.is_some());
  }

  #[tokio::test]
  async fn test_offline_never_calls_fetcher() {
    let layer = seeded_layer(&[Item(5)]);
    let calls = AtomicU32::new(0);

    let result = layer
      .fetch_all(false, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Item(9)])
      })
      .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data, vec![Item(5)]);
  }

  #[tokio::test]
  async fn test_unavailable_storage_degrades_to_empty() {
    let layer = CacheLayer::new(BrokenStorage);

    let offline = layer
      .fetch_all::<Item, _, _>(false, || async { Ok(vec![]) })
      .await;
    assert!(offline.data.is_empty());
    assert_eq!(offline.cached_at, None);

    // Write-through failure does not fail the fetch
    let online = layer.fetch_all(true, || async { Ok(vec![Item(1)]) }).await;
    assert_eq!(online.data, vec![Item(1)]);
    assert_eq!(online.source, CacheSource::Network);
  }
}
