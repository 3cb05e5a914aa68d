use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

use restodir::assets::{
  AssetInterceptor, HttpNetwork, ResourceRequest, ResourceStore, RoutePolicy, Served,
};
use restodir::cache::{CacheResult, NoopStorage, RecordStore, SqliteStorage};
use restodir::config::Config;
use restodir::directory::links::{image_url_for_entry, responsive_image_urls, url_for_entry};
use restodir::directory::{
  CategoryFilter, Connectivity, ConnectivityFlag, DirectoryService, Entry, FeedClient,
  RegionFilter, TcpProbe,
};
use restodir::logging;

/// Record store file inside the data directory.
const RECORDS_DB: &str = "records.db";
/// Resource cache file inside the data directory.
const ASSETS_DB: &str = "assets.db";
/// How long the connectivity probe waits for the feed host.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "restodir")]
#[command(about = "An offline-first restaurant directory")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/restodir/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Treat the network as unreachable (same as RESTODIR_OFFLINE=1)
  #[arg(long)]
  offline: bool,

  /// Print results as JSON
  #[arg(long)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(flatten)]
  Directory(DirectoryCommand),

  /// Manage the asset cache
  #[command(subcommand)]
  Assets(AssetsCommand),
}

#[derive(Subcommand, Debug)]
enum DirectoryCommand {
  /// List restaurants, optionally filtered ("all" means no filter)
  List {
    #[arg(long, default_value = "all")]
    category: CategoryFilter,
    #[arg(long, default_value = "all")]
    region: RegionFilter,
  },
  /// Show one restaurant
  Show { id: i64 },
  /// List distinct categories
  Categories,
  /// List distinct regions
  Regions,
}

#[derive(Subcommand, Debug)]
enum AssetsCommand {
  /// Install a version of the shell (default: assets.version from config)
  Install { version: Option<String> },
  /// Hand control to the waiting generation
  Release,
  /// Request a resource through the interceptor
  Fetch {
    url: String,
    /// Treat the request as a page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Show generations and cache sizes
  Status,
}

/// Connectivity chosen at startup.
enum Link {
  Forced(ConnectivityFlag),
  Probe(TcpProbe),
}

impl Connectivity for Link {
  async fn is_online(&self) -> bool {
    match self {
      Link::Forced(flag) => flag.is_online().await,
      Link::Probe(probe) => probe.is_online().await,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let data_dir = config.data_dir()?;
  let _guard = logging::init(&data_dir)?;

  match args.command {
    Command::Directory(command) => {
      let offline = args.offline || Config::offline_from_env();
      run_directory(command, &config, &data_dir, offline, args.json).await
    }
    Command::Assets(command) => run_assets(command, &config, &data_dir, args.json).await,
  }
}

// ============================================================================
// Directory commands
// ============================================================================

async fn run_directory(
  command: DirectoryCommand,
  config: &Config,
  data_dir: &Path,
  offline: bool,
  json: bool,
) -> Result<()> {
  let feed_url = Url::parse(&config.feed.url)?;
  let feed = FeedClient::new(feed_url.clone(), config.feed.timeout())?;
  let link = if offline {
    Link::Forced(ConnectivityFlag::new(false))
  } else {
    Link::Probe(TcpProbe::for_url(&feed_url, PROBE_TIMEOUT)?)
  };

  if !config.cache.enabled {
    let service = DirectoryService::new(feed, NoopStorage, link);
    return query(command, &service, config, json).await;
  }

  // An unusable store degrades to no caching rather than failing the query
  match SqliteStorage::open(&data_dir.join(RECORDS_DB)) {
    Ok(storage) => {
      let service = DirectoryService::new(feed, storage, link);
      query(command, &service, config, json).await
    }
    Err(e) => {
      warn!(error = %e, "Record store unavailable, continuing without cache");
      let service = DirectoryService::new(feed, NoopStorage, link);
      query(command, &service, config, json).await
    }
  }
}

async fn query<S: RecordStore>(
  command: DirectoryCommand,
  service: &DirectoryService<FeedClient, S, Link>,
  config: &Config,
  json: bool,
) -> Result<()> {
  match command {
    DirectoryCommand::List { category, region } => {
      let result = service.by_category_and_region(&category, &region).await;
      report(json, &result, |entries| {
        for entry in entries {
          println!("{:>4}  {}  [{} / {}]", entry.id, entry.name, entry.category, entry.region);
        }
      })
    }
    DirectoryCommand::Show { id } => {
      let result = service.by_id(id).await?;
      report(json, &result, |entry| print_entry(entry, &config.assets.image_widths))
    }
    DirectoryCommand::Categories => {
      let result = service.distinct_categories().await;
      report(json, &result, |names| names.iter().for_each(|n| println!("{}", n)))
    }
    DirectoryCommand::Regions => {
      let result = service.distinct_regions().await;
      report(json, &result, |names| names.iter().for_each(|n| println!("{}", n)))
    }
  }
}

/// Print a result and note on stderr when it came from the local mirror.
fn report<T: Serialize>(json: bool, result: &CacheResult<T>, render: impl FnOnce(&T)) -> Result<()> {
  if json {
    let value = json!({
      "source": result.source.to_string(),
      "cached_at": result.cached_at,
      "data": result.data,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    return Ok(());
  }

  render(&result.data);
  if result.is_cached() {
    match result.cached_at {
      Some(at) => eprintln!("(from {}, stored {})", result.source, at.format("%Y-%m-%d %H:%M UTC")),
      None => eprintln!("(from {}, nothing stored yet)", result.source),
    }
  }
  Ok(())
}

fn print_entry(entry: &Entry, image_widths: &[u32]) {
  println!("{} (#{})", entry.name, entry.id);
  println!("  {} in {}", entry.category, entry.region);
  println!("  {}", entry.address);
  println!("  at {:.6}, {:.6}", entry.location.lat, entry.location.lng);
  println!("  page:  {}", url_for_entry(entry));
  println!("  image: {}", image_url_for_entry(entry));
  for (width, url) in responsive_image_urls(entry, image_widths) {
    println!("         {}w {}", width, url);
  }

  if let Some(hours) = &entry.hours {
    println!("  hours:");
    for (day, open) in hours {
      println!("    {:<10} {}", day, open);
    }
  }

  match &entry.reviews {
    Some(reviews) if !reviews.is_empty() => {
      println!("  reviews:");
      for review in reviews {
        println!("    {} ({}) {}/5", review.author, review.date, review.rating);
        println!("      {}", review.comment);
      }
    }
    _ => println!("  no reviews yet"),
  }
}

// ============================================================================
// Asset commands
// ============================================================================

async fn run_assets(
  command: AssetsCommand,
  config: &Config,
  data_dir: &Path,
  json: bool,
) -> Result<()> {
  let store = ResourceStore::open(&data_dir.join(ASSETS_DB))?;
  let network = HttpNetwork::new(config.feed.timeout())?;
  let interceptor = AssetInterceptor::new(store, network, RoutePolicy::from_config(config)?);

  match command {
    AssetsCommand::Install { version } => {
      let version = version.unwrap_or_else(|| config.assets.version.clone());
      let state = interceptor.install(&version).await?;
      if json {
        println!("{}", json!({ "version": version, "state": state.to_string() }));
      } else {
        println!("{} is {}", version, state);
      }
    }
    AssetsCommand::Release => {
      let name = interceptor.release()?;
      if json {
        println!("{}", json!({ "active": name }));
      } else {
        println!("{} is active", name);
      }
    }
    AssetsCommand::Fetch { url, navigate } => {
      let url = Url::parse(&url).map_err(|e| eyre!("Invalid URL {}: {}", url, e))?;
      let request = if navigate {
        ResourceRequest::navigate(url)
      } else {
        ResourceRequest::get(url)
      };
      let served = interceptor.handle(&request).await?;
      print_served(&served, json)?;
    }
    AssetsCommand::Status => {
      let status = interceptor.status()?;
      if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
      } else {
        println!("active:  {}", status.active.as_deref().unwrap_or("-"));
        println!("waiting: {}", status.waiting.as_deref().unwrap_or("-"));
        println!("static entries: {}", status.static_entries);
        println!("image entries:  {}", status.image_entries);
      }
    }
  }

  Ok(())
}

fn print_served(served: &Served, json: bool) -> Result<()> {
  let response = &served.response;
  if json {
    let value = json!({
      "from": served.from.to_string(),
      "status": response.status,
      "headers": response.headers,
      "bytes": response.body.len(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
  } else {
    println!(
      "{} from {} ({} bytes, {})",
      response.status,
      served.from,
      response.body.len(),
      response.header("content-type").unwrap_or("unknown type")
    );
  }
  Ok(())
}
