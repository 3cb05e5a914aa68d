use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

use crate::cache::Cacheable;

/// A directory entry (one restaurant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub id: i64,
  pub name: String,
  pub category: String,
  pub region: String,
  pub location: Location,
  pub address: String,
  /// Opening hours as (weekday label, time range) pairs in feed order,
  /// e.g. ("Monday", "5:30 pm - 11:00 pm")
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hours: Option<Vec<(String, String)>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reviews: Option<Vec<Review>>,
  /// Image file stem, when it differs from the id
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photograph: Option<String>,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub lat: f64,
  pub lng: f64,
}

/// A review, owned by its entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub author: String,
  pub date: String, // display text, not validated
  pub rating: i64,  // expected 1-5, not enforced
  pub comment: String,
}

impl Cacheable for Entry {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "restaurant"
  }
}

/// Literal used by callers to mean "no filtering".
pub const ALL: &str = "all";

/// Category filter for directory queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
  #[default]
  All,
  Named(String),
}

impl CategoryFilter {
  pub fn named(category: impl Into<String>) -> Self {
    Self::Named(category.into())
  }

  pub fn matches(&self, entry: &Entry) -> bool {
    match self {
      Self::All => true,
      Self::Named(category) => entry.category == *category,
    }
  }
}

impl FromStr for CategoryFilter {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(if s == ALL {
      Self::All
    } else {
      Self::Named(s.to_string())
    })
  }
}

/// Region filter for directory queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
  #[default]
  All,
  Named(String),
}

impl RegionFilter {
  pub fn named(region: impl Into<String>) -> Self {
    Self::Named(region.into())
  }

  pub fn matches(&self, entry: &Entry) -> bool {
    match self {
      Self::All => true,
      Self::Named(region) => entry.region == *region,
    }
  }
}

impl FromStr for RegionFilter {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(if s == ALL {
      Self::All
    } else {
      Self::Named(s.to_string())
    })
  }
}
