//! Error types shared by the record store, the directory service and the
//! asset interceptor.

/// Errors surfaced by the caching core.
///
/// None of these are fatal: the directory service recovers from
/// `NetworkFailure` and `StorageUnavailable` on its own, and the rest are
/// returned to the caller to render.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Transport error or a non-success status from the network.
  #[error("network failure: {0}")]
  NetworkFailure(String),

  /// Local persistence could not be opened, migrated, read or written.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),

  /// No entry with this id exists in the current set.
  #[error("entry {0} not found")]
  NotFound(i64),

  /// A shell resource could not be pre-cached while installing a generation.
  #[error("failed to pre-cache {url}: {detail}")]
  InstallFailure { url: String, detail: String },

  /// A cache-only route had nothing stored for the request.
  #[error("{0} is not cached")]
  NotCached(String),

  #[error("invalid url: {0}")]
  InvalidUrl(String),

  /// A lifecycle transition was requested from a state that does not allow it.
  #[error("invalid lifecycle state: {0}")]
  InvalidState(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Error::StorageUnavailable(e.to_string())
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Error::NetworkFailure(e.to_string())
  }
}

impl From<url::ParseError> for Error {
  fn from(e: url::ParseError) -> Self {
    Error::InvalidUrl(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data.
pub(crate) fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }
  let mut end = MAX_ERROR_BODY_LENGTH;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!(
    "{}... (truncated, {} total bytes)",
    &body[..end],
    body.len()
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_body_is_unchanged() {
    assert_eq!(truncate_body("oops"), "oops");
  }

  #[test]
  fn test_truncate_long_body() {
    let body = "é".repeat(400);
    let truncated = truncate_body(&body);
    assert!(truncated.ends_with("(truncated, 800 total bytes)"));
    assert!(truncated.len() < body.len());
  }
}
