use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// An outbound resource request seen by the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
  pub method: Method,
  pub url: Url,
  /// True for top-level page navigations
  pub navigate: bool,
}

impl ResourceRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      navigate: false,
    }
  }

  pub fn navigate(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      navigate: true,
    }
  }

  pub fn parse(url: &str) -> Result<Self> {
    Ok(Self::get(Url::parse(url)?))
  }
}

/// A response payload with everything needed to replay it offline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl ResourceResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn ok(body: impl Into<Vec<u8>>) -> Self {
    Self::new(200, body)
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
  /// Current generation's shell cache
  StaticCache,
  /// Image/tile sub-cache
  ImageCache,
  Network,
}

impl std::fmt::Display for ServedFrom {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ServedFrom::StaticCache => write!(f, "static cache"),
      ServedFrom::ImageCache => write!(f, "image cache"),
      ServedFrom::Network => write!(f, "network"),
    }
  }
}

/// A response together with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
  pub response: ResourceResponse,
  pub from: ServedFrom,
}
