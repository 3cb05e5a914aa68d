//! Asset cache interceptor.
//!
//! Sits between the application and the network and decides, per request,
//! whether to answer from a cache generation or go to the network:
//! - Shell resources are pre-cached per version into a static generation
//! - Images and map tiles share a long-lived sub-cache keyed by canonical URL
//! - A new generation takes over only after the old one is released, and
//!   stale generations are deleted before it serves

mod canonical;
mod generation;
mod interceptor;
mod network;
mod request;
mod store;

pub use canonical::{canonicalize, CacheKey};
pub use generation::{static_cache_name, Generation, GenerationKind, GenerationState, IMAGE_CACHE};
pub use interceptor::{AssetInterceptor, AssetStatus, Route, RoutePolicy};
pub use network::{HttpNetwork, Network};
pub use request::{ResourceRequest, ResourceResponse, Served, ServedFrom};
pub use store::ResourceStore;
