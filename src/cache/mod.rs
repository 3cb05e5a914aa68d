//! Generic caching layer for data persistence and offline support.
//!
//! This module provides a domain-agnostic mirror of a remote record set that:
//! - Stores full record sets keyed by primary key
//! - Replaces a set atomically on every successful network read
//! - Serves the last written set when the network is unavailable or fails

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{NoopStorage, RecordStore, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable};
