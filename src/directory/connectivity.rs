//! Network reachability signals read at the start of every directory query.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Runtime-supplied "is the network reachable" probe.
pub trait Connectivity: Send + Sync {
  fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// Shared on/off switch, toggled by whoever observes connectivity changes.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag(Arc<AtomicBool>);

impl ConnectivityFlag {
  pub fn new(online: bool) -> Self {
    Self(Arc::new(AtomicBool::new(online)))
  }

  pub fn set_online(&self, online: bool) {
    self.0.store(online, Ordering::SeqCst);
  }
}

impl Connectivity for ConnectivityFlag {
  async fn is_online(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Reports online when a TCP connection to the feed host can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
  addr: String,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
    Self {
      addr: addr.into(),
      timeout,
    }
  }

  /// Probe the host and port the given URL points at.
  pub fn for_url(url: &Url, timeout: Duration) -> Result<Self> {
    let host = url
      .host_str()
      .ok_or_else(|| Error::InvalidUrl(format!("{} has no host", url)))?;
    let port = url
      .port_or_known_default()
      .ok_or_else(|| Error::InvalidUrl(format!("{} has no port", url)))?;
    Ok(Self::new(format!("{}:{}", host, port), timeout))
  }
}

impl Connectivity for TcpProbe {
  async fn is_online(&self) -> bool {
    let online = matches!(
      tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await,
      Ok(Ok(_))
    );
    debug!(addr = %self.addr, online, "Probed connectivity");
    online
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::net::TcpListener;

  #[tokio::test]
  async fn test_flag_toggles() {
    let flag = ConnectivityFlag::new(true);
    let shared = flag.clone();
    assert!(flag.is_online().await);

    shared.set_online(false);
    assert!(!flag.is_online().await);
  }

  #[tokio::test]
  async fn test_probe_reports_listening_host_online() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(1));
    assert!(probe.is_online().await);
  }

  #[tokio::test]
  async fn test_probe_reports_closed_port_offline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(1));
    assert!(!probe.is_online().await);
  }

  #[test]
  fn test_probe_for_url_uses_default_port() {
    let url = Url::parse("http://localhost/restaurants").unwrap();
    let probe = TcpProbe::for_url(&url, Duration::from_millis(100)).unwrap();
    assert_eq!(probe.addr, "localhost:80");
  }
}
