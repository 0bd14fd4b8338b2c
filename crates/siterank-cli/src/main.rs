//! `siterank`: resolve and synchronise website classifications.
//!
//! # Usage
//!
//! ```
//! siterank resolve https://news.example.com/article -c news
//! siterank lookup example.com --exact
//! siterank sync --changed-after 2024-01-01T00:00:00Z
//! siterank sync --watch
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context as _, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use settings::Settings;
use siterank_core::ApiVersion;
use siterank_provider_http::HttpProvider;
use siterank_resolver::{MemoryCache, PageRankResolver};
use siterank_store_sqlite::SqliteStore;
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type Resolver = PageRankResolver<HttpProvider, SqliteStore, MemoryCache>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "siterank", author, version, about = "Website classification resolver")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "siterank.toml")]
  config: PathBuf,

  /// Provider API version for this invocation.
  #[arg(long, global = true)]
  api_version: Option<u8>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Look a URL up in the local store only.
  Lookup {
    url:   String,
    /// Match the normalised host only, without path or parent-domain fallback.
    #[arg(long)]
    exact: bool,
  },
  /// Classify a URL, asking the provider on a miss.
  Resolve {
    url:        String,
    #[arg(short, long = "category")]
    categories: Vec<String>,
  },
  /// Pull changed classifications from the provider into the store.
  Sync {
    /// Only fetch classifications changed after this RFC 3339 timestamp.
    #[arg(long)]
    changed_after: Option<DateTime<Utc>>,
    /// Keep running, syncing every interval until interrupted.
    #[arg(long)]
    watch:         bool,
    /// Override `resolver.sync_interval_secs`.
    #[arg(long, value_name = "SECS")]
    interval:      Option<u64>,
  },
  /// Print the provider's category taxonomy.
  Taxonomy,
  /// Submit a reassessment request (a JSON document, or `-` for stdin).
  Reassess { data: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let version = cli.api_version.map(ApiVersion).unwrap_or(settings.api_version);
  let resolver = build_resolver(&settings).await?;

  match cli.command {
    Command::Lookup { url, exact } => print_json(&resolver.fetch_page_rank(&url, exact).await),
    Command::Resolve { url, categories } => {
      let rank = resolver
        .get_page_rank(version, &url, &categories)
        .await
        .with_context(|| format!("failed to resolve {url}"))?;
      print_json(&rank)
    }
    Command::Sync { changed_after, watch: false, .. } => {
      let report = resolver.update(version, changed_after).await;
      print_json(&report)?;
      if !report.success() {
        bail!("sync stopped early");
      }
      Ok(())
    }
    Command::Sync { changed_after, watch: true, interval } => {
      let interval = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| settings.resolver.sync_interval());
      run_periodic(&resolver, version, interval, changed_after).await;
      Ok(())
    }
    Command::Taxonomy => {
      let taxonomy = resolver
        .get_taxonomy(version)
        .await
        .context("failed to fetch taxonomy")?;
      print_json(&taxonomy)
    }
    Command::Reassess { data } => {
      let raw = if data == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
      } else {
        data
      };
      let body: serde_json::Value =
        serde_json::from_str(&raw).context("reassessment data is not valid JSON")?;
      let response = resolver
        .reassessment(version, body)
        .await
        .context("reassessment request failed")?;
      print_json(&response)
    }
  }
}

async fn build_resolver(settings: &Settings) -> anyhow::Result<Resolver> {
  let store_path = settings.store_path();
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let provider =
    HttpProvider::new(settings.provider.clone()).context("failed to build provider client")?;

  Ok(PageRankResolver::new(
    Arc::new(provider),
    Arc::new(store),
    Arc::new(MemoryCache::new()),
    settings.resolver.clone(),
  ))
}

/// Sync every `interval` until Ctrl-C.
async fn run_periodic(
  resolver: &Resolver,
  version: ApiVersion,
  interval: Duration,
  changed_after: Option<DateTime<Utc>>,
) {
  let (tx, rx) = watch::channel(false);
  tokio::spawn(async move {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl-C");
    }
    let _ = tx.send(true);
  });

  tracing::info!(interval_secs = interval.as_secs(), "periodic sync started");
  resolver.scheduler().run(version, interval, changed_after, rx).await;
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("failed to encode output")?);
  Ok(())
}
