//! Restaurant directory: feed client, domain types and the query service.

pub mod api_types;
pub mod client;
pub mod connectivity;
pub mod links;
pub mod service;
pub mod types;

pub use client::{EntryFeed, FeedClient};
pub use connectivity::{Connectivity, ConnectivityFlag, TcpProbe};
pub use service::DirectoryService;
pub use types::{CategoryFilter, Entry, Location, RegionFilter, Review};
