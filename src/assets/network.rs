//! The network behind the interceptor.

use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::request::{ResourceRequest, ResourceResponse};
use crate::error::Result;

/// Performs a request against the real network.
///
/// Any HTTP status is a response; only transport failures are errors.
pub trait Network: Send + Sync {
  fn fetch(&self, request: &ResourceRequest)
    -> impl Future<Output = Result<ResourceResponse>> + Send;
}

/// reqwest-backed network.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
  client: Client,
}

impl HttpNetwork {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

impl Network for HttpNetwork {
  async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse> {
    let response = self
      .client
      .request(request.method.clone(), request.url.clone())
      .send()
      .await?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response.bytes().await?.to_vec();

    debug!(url = %request.url, status, bytes = body.len(), "Fetched from network");
    Ok(ResourceResponse {
      status,
      headers,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_fetch_captures_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/css/styles.css"))
      .respond_with(
        ResponseTemplate::new(200).set_body_raw(b"body { margin: 0 }".to_vec(), "text/css"),
      )
      .mount(&server)
      .await;

    let network = HttpNetwork::new(Duration::from_secs(5)).unwrap();
    let request = ResourceRequest::parse(&format!("{}/css/styles.css", server.uri())).unwrap();
    let response = network.fetch(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("text/css"));
    assert_eq!(response.body, b"body { margin: 0 }");
  }

  #[tokio::test]
  async fn test_error_status_is_still_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;

    let network = HttpNetwork::new(Duration::from_secs(5)).unwrap();
    let request = ResourceRequest::parse(&format!("{}/missing.js", server.uri())).unwrap();
    let response = network.fetch(&request).await.unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
  }

  #[tokio::test]
  async fn test_transport_failure_is_network_failure() {
    // Reserve a port, then release it so nothing listens there
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
      .unwrap()
      .local_addr()
      .unwrap();

    let network = HttpNetwork::new(Duration::from_secs(5)).unwrap();
    let request = ResourceRequest::parse(&format!("http://{}/index.html", addr)).unwrap();
    let err = network.fetch(&request).await.unwrap_err();
    assert!(matches!(err, Error::NetworkFailure(_)));
  }
}
