//! Canonical request keys.
//!
//! Several physical requests can name the same logical asset: a fragment never
//! reaches the server, and image URLs carry a `-<width>px.jpg` size hint.
//! Keys strip those so every variant lands in one cache slot.

use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

use super::request::ResourceRequest;

/// A normalized (method, URL) pair used to look up cached responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  method: Method,
  url: Url,
}

impl CacheKey {
  /// Key matching the request URL exactly, minus the fragment.
  pub fn exact(request: &ResourceRequest) -> Self {
    Self {
      method: request.method.clone(),
      url: normalize(&request.url),
    }
  }

  /// Key with volatile size suffixes stripped, for the image cache.
  pub fn canonical(request: &ResourceRequest) -> Self {
    Self {
      method: request.method.clone(),
      url: canonicalize(&request.url),
    }
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// SHA256 hex digest for stable, fixed-length storage keys.
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.to_string().as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl std::fmt::Display for CacheKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.method, self.url)
  }
}

/// Drop the fragment.
pub fn normalize(url: &Url) -> Url {
  let mut url = url.clone();
  url.set_fragment(None);
  url
}

/// Drop the fragment and every trailing `-<digits>px.jpg` size suffix from the path.
///
/// Idempotent: a canonical URL canonicalizes to itself.
pub fn canonicalize(url: &Url) -> Url {
  let mut url = normalize(url);
  let mut path = url.path().to_string();
  while let Some(stripped) = strip_size_suffix(&path) {
    path = stripped.to_string();
  }
  url.set_path(&path);
  url
}

/// `"/img/photo-250px.jpg"` -> `Some("/img/photo")`
fn strip_size_suffix(path: &str) -> Option<&str> {
  let rest = path.strip_suffix("px.jpg")?;
  let digits = rest.len() - rest.trim_end_matches(|c: char| c.is_ascii_digit()).len();
  if digits == 0 {
    return None;
  }
  rest[..rest.len() - digits].strip_suffix('-')
}
