//! Cache generations and their lifecycle states.

use std::str::FromStr;

use crate::error::Error;

/// Name of the long-lived image/tile sub-cache.
pub const IMAGE_CACHE: &str = "restodir-images";

/// Name of the shell cache for a version tag, e.g. `restodir-static-v2`.
pub fn static_cache_name(version: &str) -> String {
  format!("restodir-static-{}", version)
}

/// What a generation holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
  /// Pre-populated shell resources; one per version
  Static,
  /// Image/tile sub-cache; survives version changes
  Images,
}

/// Lifecycle state of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
  Installing,
  Waiting,
  Activating,
  Active,
  /// Failed install or superseded; never serves again
  Redundant,
}

/// A persisted generation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  pub name: String,
  pub kind: GenerationKind,
  pub state: GenerationState,
}

impl Generation {
  pub fn is_current(&self) -> bool {
    self.kind == GenerationKind::Static && self.state == GenerationState::Active
  }
}

impl GenerationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      GenerationKind::Static => "static",
      GenerationKind::Images => "images",
    }
  }
}

impl FromStr for GenerationKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "static" => Ok(GenerationKind::Static),
      "images" => Ok(GenerationKind::Images),
      other => Err(Error::StorageUnavailable(format!(
        "unknown generation kind '{}'",
        other
      ))),
    }
  }
}

impl GenerationState {
  pub fn as_str(&self) -> &'static str {
    match self {
      GenerationState::Installing => "installing",
      GenerationState::Waiting => "waiting",
      GenerationState::Activating => "activating",
      GenerationState::Active => "active",
      GenerationState::Redundant => "redundant",
    }
  }
}

impl FromStr for GenerationState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "installing" => Ok(GenerationState::Installing),
      "waiting" => Ok(GenerationState::Waiting),
      "activating" => Ok(GenerationState::Activating),
      "active" => Ok(GenerationState::Active),
      "redundant" => Ok(GenerationState::Redundant),
      other => Err(Error::StorageUnavailable(format!(
        "unknown generation state '{}'",
        other
      ))),
    }
  }
}

impl std::fmt::Display for GenerationState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
