//! Request interceptor that serves resources from cache generations.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::canonical::CacheKey;
use super::generation::{static_cache_name, GenerationKind, GenerationState, IMAGE_CACHE};
use super::network::Network;
use super::request::{ResourceRequest, ResourceResponse, Served, ServedFrom};
use super::store::ResourceStore;
use crate::config::Config;
use crate::error::{Error, Result};

/// Path prefix of same-origin image assets.
const IMAGE_PATH_PREFIX: &str = "/img/";

/// How a request is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// Same-origin root navigation: cached shell document only
  ShellDocument,
  /// Same-origin image: image cache, fetch and store on miss
  Image,
  /// Third-party map tile: same policy as images
  Tile,
  /// Cache first, network without write-back
  Default,
}

/// Which requests go where.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
  /// Origin the shell is served from
  pub origin: Url,
  /// Shell resource paths pre-cached on install
  pub shell: Vec<String>,
  /// Path of the document served for root navigations
  pub shell_document: String,
  /// URL prefixes of third-party tile servers
  pub tile_prefixes: Vec<String>,
}

impl RoutePolicy {
  pub fn new(origin: Url, shell: Vec<String>, tile_prefixes: Vec<String>) -> Self {
    Self {
      origin,
      shell,
      shell_document: "/index.html".to_string(),
      tile_prefixes,
    }
  }

  pub fn from_config(config: &Config) -> Result<Self> {
    let origin = Url::parse(&config.site.origin)?;
    Ok(Self::new(
      origin,
      config.assets.shell.clone(),
      config.assets.tile_prefixes.clone(),
    ))
  }

  pub fn route(&self, request: &ResourceRequest) -> Route {
    if request.url.origin() == self.origin.origin() {
      if request.navigate && request.url.path() == "/" {
        return Route::ShellDocument;
      }
      if request.url.path().starts_with(IMAGE_PATH_PREFIX) {
        return Route::Image;
      }
    }

    let url = request.url.as_str();
    if self.tile_prefixes.iter().any(|prefix| url.starts_with(prefix.as_str())) {
      return Route::Tile;
    }

    Route::Default
  }

  fn resolve(&self, path: &str) -> Result<ResourceRequest> {
    Ok(ResourceRequest::get(self.origin.join(path)?))
  }
}

/// Snapshot of the interceptor's generations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetStatus {
  pub active: Option<String>,
  pub waiting: Option<String>,
  pub static_entries: usize,
  pub image_entries: usize,
}

/// Resource interceptor with generation lifecycle.
///
/// `install` pre-caches the shell under a new generation. The first generation
/// activates immediately; later ones wait until `release` hands over control.
/// Activation deletes every other static generation before the new one serves.
pub struct AssetInterceptor<N: Network> {
  store: ResourceStore,
  network: N,
  policy: RoutePolicy,
}

impl<N: Network> AssetInterceptor<N> {
  pub fn new(store: ResourceStore, network: N, policy: RoutePolicy) -> Self {
    Self {
      store,
      network,
      policy,
    }
  }

  pub fn policy(&self) -> &RoutePolicy {
    &self.policy
  }

  // ==========================================================================
  // Lifecycle
  // ==========================================================================

  /// Install a new version and return the state it ends up in.
  ///
  /// The shell is pre-cached under a staging name and only takes the
  /// version's name once complete. Fails with `InstallFailure` if any shell
  /// resource cannot be fetched; the staging generation is then discarded and
  /// the active and waiting ones are left as they were.
  pub async fn install(&self, version: &str) -> Result<GenerationState> {
    let name = static_cache_name(version);

    let active = self.store.find_static(GenerationState::Active)?;
    if active.as_ref().is_some_and(|g| g.name == name) {
      info!(generation = %name, "Generation already active");
      return Ok(GenerationState::Active);
    }

    let staging = format!("{}.installing", name);
    self
      .store
      .create_generation(&staging, GenerationKind::Static, GenerationState::Installing)?;
    info!(generation = %name, resources = self.policy.shell.len(), "Installing generation");

    if let Err(e) = self.precache(&staging).await {
      warn!(generation = %name, error = %e, "Install failed, discarding generation");
      self.store.delete_generation(&staging)?;
      return Err(e);
    }

    if active.is_none() {
      self.store.rename_generation(&staging, &name)?;
      self.activate(&name)?;
      return Ok(GenerationState::Active);
    }

    // Only the newest installed generation waits
    if let Some(previous) = self.store.find_static(GenerationState::Waiting)? {
      self.store.delete_generation(&previous.name)?;
      info!(generation = %previous.name, "Superseded waiting generation");
    }
    self.store.rename_generation(&staging, &name)?;
    self.store.set_state(&name, GenerationState::Waiting)?;
    info!(generation = %name, "Generation installed, waiting for release");
    Ok(GenerationState::Waiting)
  }

  /// The active generation relinquishes control; the waiting one takes over.
  ///
  /// Returns the name of the newly active generation.
  pub fn release(&self) -> Result<String> {
    let waiting = self
      .store
      .find_static(GenerationState::Waiting)?
      .ok_or_else(|| Error::InvalidState("no generation is waiting".into()))?;

    self.activate(&waiting.name)?;
    Ok(waiting.name)
  }

  /// Fetch every shell resource and store them under `generation`.
  async fn precache(&self, generation: &str) -> Result<()> {
    let requests = self
      .policy
      .shell
      .iter()
      .map(|path| self.policy.resolve(path))
      .collect::<Result<Vec<_>>>()?;

    let entries = try_join_all(requests.iter().map(|request| async move {
      let install_failure = |detail: String| Error::InstallFailure {
        url: request.url.to_string(),
        detail,
      };

      let response = self
        .network
        .fetch(request)
        .await
        .map_err(|e| install_failure(e.to_string()))?;
      if !response.is_success() {
        return Err(install_failure(format!("status {}", response.status)));
      }
      Ok((CacheKey::exact(request), response))
    }))
    .await?;

    self.store.put_all(generation, &entries)
  }

  /// Collect stale static generations, then mark `name` active.
  fn activate(&self, name: &str) -> Result<()> {
    self.store.set_state(name, GenerationState::Activating)?;

    for generation in self.store.generations()? {
      if generation.kind == GenerationKind::Static && generation.name != name {
        self.store.delete_generation(&generation.name)?;
        info!(generation = %generation.name, "Deleted stale generation");
      }
    }

    self.store.set_state(name, GenerationState::Active)?;
    info!(generation = %name, "Generation active");
    Ok(())
  }

  pub fn status(&self) -> Result<AssetStatus> {
    let active = self.store.find_static(GenerationState::Active)?;
    let waiting = self.store.find_static(GenerationState::Waiting)?;
    let static_entries = match &active {
      Some(g) => self.store.count(&g.name)?,
      None => 0,
    };

    Ok(AssetStatus {
      active: active.map(|g| g.name),
      waiting: waiting.map(|g| g.name),
      static_entries,
      image_entries: self.store.count(IMAGE_CACHE)?,
    })
  }

  // ==========================================================================
  // Request handling
  // ==========================================================================

  /// Serve a request according to its route.
  pub async fn handle(&self, request: &ResourceRequest) -> Result<Served> {
    let active = match self.store.find_static(GenerationState::Active) {
      Ok(active) => active,
      Err(e) => {
        warn!(error = %e, "Generation lookup failed, passing through");
        None
      }
    };

    // Not in control until a generation has been activated
    let Some(active) = active else {
      debug!(url = %request.url, "No active generation, passing through");
      return self.from_network(request).await;
    };

    match self.policy.route(request) {
      Route::ShellDocument => {
        let shell = self.policy.resolve(&self.policy.shell_document)?;
        self
          .lookup(&active.name, &CacheKey::exact(&shell))
          .map(|response| Served {
            response,
            from: ServedFrom::StaticCache,
          })
          .ok_or_else(|| Error::NotCached(shell.url.to_string()))
      }
      Route::Image | Route::Tile => self.serve_image(request).await,
      Route::Default => self.cache_first(&active.name, request).await,
    }
  }

  /// Image cache keyed by canonical URL: hit returns, miss fetches and stores.
  async fn serve_image(&self, request: &ResourceRequest) -> Result<Served> {
    let key = CacheKey::canonical(request);

    if let Some(response) = self.lookup(IMAGE_CACHE, &key) {
      debug!(key = %key, "Image cache hit");
      return Ok(Served {
        response,
        from: ServedFrom::ImageCache,
      });
    }

    let response = self.network.fetch(request).await?;
    if response.is_success() {
      if let Err(e) = self.store.put(IMAGE_CACHE, &key, &response) {
        warn!(key = %key, error = %e, "Failed to store image");
      }
    }

    Ok(Served {
      response,
      from: ServedFrom::Network,
    })
  }

  /// Any cached match, else the network. Nothing is written back.
  async fn cache_first(&self, generation: &str, request: &ResourceRequest) -> Result<Served> {
    let key = CacheKey::exact(request);

    for (cache, from) in [
      (generation, ServedFrom::StaticCache),
      (IMAGE_CACHE, ServedFrom::ImageCache),
    ] {
      if let Some(response) = self.lookup(cache, &key) {
        debug!(key = %key, cache, "Cache hit");
        return Ok(Served { response, from });
      }
    }

    self.from_network(request).await
  }

  async fn from_network(&self, request: &ResourceRequest) -> Result<Served> {
    let response = self.network.fetch(request).await?;
    Ok(Served {
      response,
      from: ServedFrom::Network,
    })
  }

  /// Cache lookup where an unreadable cache counts as a miss.
  fn lookup(&self, generation: &str, key: &CacheKey) -> Option<ResourceResponse> {
    self.store.get(generation, key).unwrap_or_else(|e| {
      warn!(generation, key = %key, error = %e, "Cache read failed");
      None
    })
  }
}
