//! Directory service: the single entry point for restaurant queries.

use std::collections::HashSet;
use std::hash::Hash;

use super::client::EntryFeed;
use super::connectivity::Connectivity;
use super::types::{CategoryFilter, Entry, RegionFilter};
use crate::cache::{CacheLayer, CacheResult, RecordStore};
use crate::error::{Error, Result};

/// Directory service with transparent caching support.
///
/// Every query loads the full entry set once (network first, local mirror as
/// fallback) and filters it in memory. Connectivity is read once per query.
pub struct DirectoryService<F: EntryFeed, S: RecordStore, C: Connectivity> {
  feed: F,
  cache: CacheLayer<S>,
  connectivity: C,
}

impl<F: EntryFeed, S: RecordStore, C: Connectivity> DirectoryService<F, S, C> {
  pub fn new(feed: F, storage: S, connectivity: C) -> Self {
    Self {
      feed,
      cache: CacheLayer::new(storage),
      connectivity,
    }
  }

  /// Load the current entry set.
  async fn load(&self) -> CacheResult<Vec<Entry>> {
    let online = self.connectivity.is_online().await;
    self.cache.fetch_all(online, || self.feed.fetch_all()).await
  }

  /// All entries.
  pub async fn all(&self) -> CacheResult<Vec<Entry>> {
    self.load().await
  }

  /// A single entry by id.
  pub async fn by_id(&self, id: i64) -> Result<CacheResult<Entry>> {
    let result = self.load().await;
    let entry = result
      .data
      .iter()
      .find(|e| e.id == id)
      .cloned()
      .ok_or(Error::NotFound(id))?;
    Ok(CacheResult {
      data: entry,
      source: result.source,
      cached_at: result.cached_at,
    })
  }

  /// Entries in the given category.
  pub async fn by_category(&self, category: &CategoryFilter) -> CacheResult<Vec<Entry>> {
    self
      .by_category_and_region(category, &RegionFilter::All)
      .await
  }

  /// Entries in the given region.
  pub async fn by_region(&self, region: &RegionFilter) -> CacheResult<Vec<Entry>> {
    self
      .by_category_and_region(&CategoryFilter::All, region)
      .await
  }

  /// Entries matching both filters.
  pub async fn by_category_and_region(
    &self,
    category: &CategoryFilter,
    region: &RegionFilter,
  ) -> CacheResult<Vec<Entry>> {
    self.load().await.map(|entries| {
      entries
        .into_iter()
        .filter(|e| category.matches(e) && region.matches(e))
        .collect()
    })
  }

  /// Distinct categories in first-seen order.
  pub async fn distinct_categories(&self) -> CacheResult<Vec<String>> {
    self
      .load()
      .await
      .map(|entries| distinct(entries.into_iter().map(|e| e.category)))
  }

  /// Distinct regions in first-seen order.
  pub async fn distinct_regions(&self) -> CacheResult<Vec<String>> {
    self
      .load()
      .await
      .map(|entries| distinct(entries.into_iter().map(|e| e.region)))
  }
}

/// Stable de-duplication keeping the first occurrence.
fn distinct<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
  let mut seen = HashSet::new();
  items
    .into_iter()
    .filter(|item| seen.insert(item.clone()))
    .collect()
}
