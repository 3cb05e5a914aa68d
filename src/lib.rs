//! Offline-first restaurant directory.
//!
//! The directory service answers queries from the remote feed when it can
//! and from the last stored record set when it cannot. The asset interceptor
//! keeps the application shell and its images available offline.

pub mod assets;
pub mod cache;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
