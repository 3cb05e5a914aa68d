//! HTTP client for the restaurant feed.

use reqwest::{header, Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::ApiRestaurant;
use super::types::Entry;
use crate::error::{truncate_body, Error, Result};

/// Source of the authoritative entry set.
pub trait EntryFeed: Send + Sync {
  /// Fetch the full entry set. No retries.
  fn fetch_all(&self) -> impl Future<Output = Result<Vec<Entry>>> + Send;
}

/// Feed client wrapper.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FeedClient {
  client: Client,
  url: Url,
}

impl FeedClient {
  pub fn new(url: Url, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, url })
  }

  pub fn url(&self) -> &Url {
    &self.url
  }
}

impl EntryFeed for FeedClient {
  async fn fetch_all(&self) -> Result<Vec<Entry>> {
    debug!(url = %self.url, "Fetching restaurant feed");

    let response = self
      .client
      .get(self.url.clone())
      .header(header::ACCEPT, "application/json")
      .send()
      .await?;

    let status = response.status();
    if status != StatusCode::OK {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::NetworkFailure(format!(
        "status {}: {}",
        status,
        truncate_body(&body)
      )));
    }

    let restaurants: Vec<ApiRestaurant> = response
      .json()
      .await
      .map_err(|e| Error::NetworkFailure(format!("invalid response: {}", e)))?;

    debug!(count = restaurants.len(), "Fetched restaurant feed");
    Ok(restaurants.into_iter().map(ApiRestaurant::into_entry).collect())
  }
}
