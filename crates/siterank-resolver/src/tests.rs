//! Resolver and sync tests against scripted collaborators and an in-memory
//! SQLite store.

use std::{
  collections::HashMap,
  convert::Infallible,
  io,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::json;
use siterank_core::{
  ApiVersion, ClassificationRecord,
  cache::RankCache,
  provider::ClassificationProvider,
  record::{BatchEntry, BatchPage, NewClassification, ProviderInfo, ProviderRecord},
  store::RankStore,
};
use siterank_store_sqlite::SqliteStore;
use tokio::sync::watch;

use crate::{
  Error, MemoryCache, PageRankResolver, Persisted, ResolverConfig, SkipReason,
  SyncScheduler,
  write::{INDEX_CACHE_KEY, RankWriter},
};

const V1: ApiVersion = ApiVersion(1);

// ─── Fakes ───────────────────────────────────────────────────────────────────

type BatchCall = (usize, usize, Option<DateTime<Utc>>);

/// Provider with canned answers. Batch pages are served by `offset / limit`;
/// pages past the end are empty.
#[derive(Default)]
struct ScriptedProvider {
  infos:          Mutex<HashMap<String, ProviderInfo>>,
  pages:          Mutex<Vec<BatchPage>>,
  info_calls:     AtomicUsize,
  taxonomy_calls: AtomicUsize,
  batch_calls:    Mutex<Vec<BatchCall>>,
  fail_info:      AtomicBool,
  fail_batch_at:  Mutex<Option<usize>>,
}

impl ScriptedProvider {
  fn with_info(self, url: &str, info: ProviderInfo) -> Self {
    self.infos.lock().unwrap().insert(url.to_owned(), info);
    self
  }

  fn with_pages(self, pages: Vec<BatchPage>) -> Self {
    *self.pages.lock().unwrap() = pages;
    self
  }

  fn info_calls(&self) -> usize { self.info_calls.load(Ordering::SeqCst) }

  fn batch_calls(&self) -> Vec<BatchCall> { self.batch_calls.lock().unwrap().clone() }
}

impl ClassificationProvider for ScriptedProvider {
  type Error = io::Error;

  async fn get_info<'a>(
    &'a self,
    _version: ApiVersion,
    url: &'a str,
    _categories: &'a [String],
  ) -> Result<ProviderInfo, io::Error> {
    self.info_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_info.load(Ordering::SeqCst) {
      return Err(io::Error::new(io::ErrorKind::TimedOut, "provider timed out"));
    }
    Ok(
      self
        .infos
        .lock()
        .unwrap()
        .get(url)
        .cloned()
        .unwrap_or_else(|| info(0.0, "unknown", &[])),
    )
  }

  async fn get_batch_info(
    &self,
    _version: ApiVersion,
    limit: usize,
    offset: usize,
    changed_after: Option<DateTime<Utc>>,
  ) -> Result<BatchPage, io::Error> {
    let call = self.batch_calls.lock().unwrap().len();
    self.batch_calls.lock().unwrap().push((limit, offset, changed_after));
    if *self.fail_batch_at.lock().unwrap() == Some(call) {
      return Err(io::Error::other("502 bad gateway"));
    }
    Ok(
      self
        .pages
        .lock()
        .unwrap()
        .get(offset / limit)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn reassessment(
    &self,
    _version: ApiVersion,
    data: serde_json::Value,
  ) -> Result<serde_json::Value, io::Error> {
    Ok(json!({ "accepted": true, "echo": data }))
  }

  async fn get_taxonomy(&self, version: ApiVersion) -> Result<serde_json::Value, io::Error> {
    self.taxonomy_calls.fetch_add(1, Ordering::SeqCst);
    Ok(json!({ "version": version.0, "categories": [{ "key": "news" }] }))
  }
}

/// Map-backed store that can be told to fail reads or writes.
#[derive(Default)]
struct FlakyStore {
  rows:        Mutex<HashMap<String, ClassificationRecord>>,
  fail_reads:  AtomicBool,
  fail_writes: AtomicBool,
  loads:       AtomicUsize,
}

impl RankStore for FlakyStore {
  type Error = io::Error;

  async fn upsert(&self, row: NewClassification) -> Result<(), io::Error> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(io::Error::other("disk full"));
    }
    let record =
      ClassificationRecord::new(row.host.clone(), row.rank, row.info, row.categories, row.quality, Utc::now());
    self.rows.lock().unwrap().insert(row.host, record);
    Ok(())
  }

  async fn load_ranked(&self) -> Result<Vec<ClassificationRecord>, io::Error> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "store unavailable"));
    }
    let mut rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(rows)
  }
}

/// A cache backend that is always down.
struct BrokenCache;

impl RankCache for BrokenCache {
  type Error = io::Error;

  async fn get<'a>(&'a self, _key: &'a str) -> Result<Option<serde_json::Value>, io::Error> {
    Err(io::Error::other("cache unreachable"))
  }

  async fn set<'a>(&'a self, _key: &'a str, _value: serde_json::Value, _ttl: Duration) -> Result<(), io::Error> {
    Err(io::Error::other("cache unreachable"))
  }

  async fn invalidate<'a>(&'a self, _key: &'a str) -> Result<(), io::Error> {
    Err(io::Error::other("cache unreachable"))
  }
}

/// A working in-process cache that counts reads of the index entry.
#[derive(Default)]
struct CountingCache {
  inner:       MemoryCache,
  index_reads: AtomicUsize,
}

impl RankCache for CountingCache {
  type Error = Infallible;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<serde_json::Value>, Infallible> {
    if key == INDEX_CACHE_KEY {
      self.index_reads.fetch_add(1, Ordering::SeqCst);
    }
    self.inner.get(key).await
  }

  async fn set<'a>(&'a self, key: &'a str, value: serde_json::Value, ttl: Duration) -> Result<(), Infallible> {
    self.inner.set(key, value, ttl).await
  }

  async fn invalidate<'a>(&'a self, key: &'a str) -> Result<(), Infallible> {
    self.inner.invalidate(key).await
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn info(rank: f64, text: &str, categories: &[&str]) -> ProviderInfo {
  ProviderInfo {
    rank:       Some(rank),
    info:       Some(text.to_owned()),
    categories: Some(categories.iter().map(|c| c.to_string()).collect()),
    quality:    Some("medium".to_owned()),
    updated_at: None,
  }
}

fn page(start: usize, len: usize) -> BatchPage {
  BatchPage {
    page_ranks: (start..start + len)
      .map(|i| {
        BatchEntry::Record(ProviderRecord {
          url:  format!("https://site{i}.example.com/landing"),
          info: info(0.5, "ok", &["news"]),
        })
      })
      .collect(),
  }
}

fn resolver<S: RankStore, C: RankCache>(
  provider: &Arc<ScriptedProvider>,
  store: &Arc<S>,
  cache: C,
) -> PageRankResolver<ScriptedProvider, S, C> {
  PageRankResolver::new(provider.clone(), store.clone(), Arc::new(cache), ResolverConfig::default())
}

async fn sqlite() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn row(host: &str, rank: f64) -> NewClassification {
  NewClassification {
    host:       host.into(),
    rank,
    info:       "ok".into(),
    categories: vec![],
    quality:    "high".into(),
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn exact_host_hit_does_not_call_provider() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  store.upsert(row("example.com", 0.4)).await.unwrap();
  let r = resolver(&provider, &store, MemoryCache::new());

  let rank = r.get_page_rank(V1, "https://www.Example.com/some/page", &[]).await.unwrap();
  assert_eq!(rank.url, "example.com");
  assert_eq!(rank.rank, 0.4);
  assert!(rank.updated_at.is_some());
  assert_eq!(provider.info_calls(), 0);
}

#[tokio::test]
async fn miss_asks_provider_then_serves_from_store() {
  let url = "https://news.example.org/article";
  let provider = Arc::new(ScriptedProvider::default().with_info(url, info(0.8, "ok", &["news", "local"])));
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  let first = r.get_page_rank(V1, url, &["news".to_owned()]).await.unwrap();
  assert_eq!(first.url, "news.example.org");
  assert_eq!(first.rank, 0.8);
  assert_eq!(first.categories, vec!["news", "local"]);
  assert_eq!(provider.info_calls(), 1);

  // The write invalidated the index, so the exact host now matches.
  let second = r.get_page_rank(V1, url, &[]).await.unwrap();
  assert_eq!(second.rank, 0.8);
  assert_eq!(second.info, "ok");
  assert_eq!(provider.info_calls(), 1);
}

#[tokio::test]
async fn provider_answer_is_memoised_per_exact_url() {
  let url = "https://nothing-known.com/";
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  // Sentinel answer: returned, never persisted, but memoised.
  let first = r.get_page_rank(V1, url, &[]).await.unwrap();
  assert_eq!(first.info, "unknown");
  assert_eq!(first.rank, 0.0);
  let second = r.get_page_rank(V1, url, &[]).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(provider.info_calls(), 1);

  // A different exact URL is a different cache key.
  r.get_page_rank(V1, "https://nothing-known.com/other", &[]).await.unwrap();
  assert_eq!(provider.info_calls(), 2);
}

#[tokio::test]
async fn no_information_sentinel_is_never_persisted() {
  let url = "https://blank.com/";
  let provider = Arc::new(ScriptedProvider::default().with_info(url, info(0.0, "unknown", &[])));
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  r.get_page_rank(V1, url, &[]).await.unwrap();
  assert!(r.fetch_page_rank(url, true).await.is_none());
  assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn persisted_record_round_trips_through_exact_lookup() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  let input = info(-0.3, "suspicious", &["gambling", "ads"]);
  assert!(r.writer().persist("https://www.shady.net/path?q=1", &input).await.is_written());

  let rank = r.fetch_page_rank("shady.net", true).await.unwrap();
  assert_eq!(rank.url, "shady.net");
  assert_eq!(rank.rank, -0.3);
  assert_eq!(rank.info, "suspicious");
  assert_eq!(rank.categories, vec!["gambling", "ads"]);
  assert_eq!(rank.quality, "medium");
}

#[tokio::test]
async fn more_specific_candidate_wins() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  store.upsert(row("a.b.com/x", 0.7)).await.unwrap();
  store.upsert(row("b.com", 0.2)).await.unwrap();
  let r = resolver(&provider, &store, MemoryCache::new());

  let rank = r.fetch_page_rank("https://a.b.com/x/y", false).await.unwrap();
  assert_eq!(rank.url, "a.b.com/x");
  assert_eq!(rank.rank, 0.7);

  let rank = r.fetch_page_rank("c.a.b.com", false).await.unwrap();
  assert_eq!(rank.url, "b.com");
  assert_eq!(rank.rank, 0.2);

  // Exact matching never falls back.
  assert!(r.fetch_page_rank("c.a.b.com", true).await.is_none());
  assert!(r.fetch_page_rank("https://unrelated.org/x", false).await.is_none());
}

#[tokio::test]
async fn stored_ranks_are_clamped_on_read() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  r.writer().persist("https://high.com", &info(5.0, "ok", &[])).await;
  r.writer().persist("https://low.com", &info(-7.0, "ok", &[])).await;

  assert_eq!(r.fetch_page_rank("high.com", true).await.unwrap().rank, 1.0);
  assert_eq!(r.fetch_page_rank("low.com", true).await.unwrap().rank, -1.0);
}

#[tokio::test]
async fn write_invalidates_a_live_index() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  // Build and cache an empty index.
  assert!(r.fetch_page_rank("late.com", true).await.is_none());

  // A write behind the resolver's back is not seen until invalidation...
  store.upsert(row("late.com", 0.1)).await.unwrap();
  assert!(r.fetch_page_rank("late.com", true).await.is_none());

  // ...which any write-path call performs.
  r.writer().persist("https://other.com", &info(0.3, "ok", &[])).await;
  assert_eq!(r.fetch_page_rank("late.com", true).await.unwrap().rank, 0.1);
  assert_eq!(r.fetch_page_rank("other.com", true).await.unwrap().rank, 0.3);
}

#[tokio::test]
async fn index_is_cached_between_lookups() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = Arc::new(FlakyStore::default());
  let r = resolver(&provider, &store, MemoryCache::new());

  r.fetch_page_rank("a.com", false).await;
  r.fetch_page_rank("b.com", false).await;
  r.fetch_page_rank("c.com", true).await;
  assert_eq!(store.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn warm_lookups_share_one_built_index() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = sqlite().await;
  for i in 0..50 {
    store.upsert(row(&format!("host{i}.com"), 0.1)).await.unwrap();
  }
  let cache = Arc::new(CountingCache::default());
  let r = PageRankResolver::new(provider.clone(), store.clone(), cache.clone(), ResolverConfig::default());

  let first = r.fetch_page_ranks().await.into_value();
  for _ in 0..10 {
    assert!(r.fetch_page_rank("host1.com", true).await.is_some());
  }
  let again = r.fetch_page_ranks().await.into_value();

  // Warm lookups neither decode the cached rows nor rebuild the map.
  assert!(Arc::ptr_eq(&first, &again));
  assert_eq!(first.len(), 50);
  assert_eq!(cache.index_reads.load(Ordering::SeqCst), 1);

  // A write drops the snapshot; the next lookup rebuilds once.
  r.writer().persist("https://fresh.com", &info(0.2, "ok", &[])).await;
  assert!(r.fetch_page_rank("fresh.com", true).await.is_some());
  assert!(r.fetch_page_rank("host2.com", true).await.is_some());
  assert_eq!(cache.index_reads.load(Ordering::SeqCst), 2);
  assert!(!Arc::ptr_eq(&first, &r.fetch_page_ranks().await.into_value()));
}

// ─── Failure handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn provider_failure_on_miss_propagates() {
  let provider = Arc::new(ScriptedProvider::default());
  provider.fail_info.store(true, Ordering::SeqCst);
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  let err = r.get_page_rank(V1, "https://down.com", &[]).await.unwrap_err();
  assert!(matches!(err, Error::Upstream(_)), "got {err:?}");

  // Failures are not memoised.
  provider.fail_info.store(false, Ordering::SeqCst);
  r.get_page_rank(V1, "https://down.com", &[]).await.unwrap();
  assert_eq!(provider.info_calls(), 2);
}

#[tokio::test]
async fn store_failure_during_index_load_degrades_to_empty() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = Arc::new(FlakyStore::default());
  store.upsert(row("known.com", 0.5)).await.unwrap();
  store.fail_reads.store(true, Ordering::SeqCst);
  let r = resolver(&provider, &store, MemoryCache::new());

  let outcome = r.fetch_page_ranks().await;
  assert!(outcome.is_degraded());
  assert!(outcome.value().is_empty());
  assert!(matches!(outcome.cause(), Some(Error::TransientLookup(_))));

  assert!(r.fetch_page_rank("known.com", false).await.is_none());

  // The empty fallback is not cached: recovery is immediate.
  store.fail_reads.store(false, Ordering::SeqCst);
  assert!(r.fetch_page_rank("known.com", true).await.is_some());
}

#[tokio::test]
async fn cache_failure_falls_through_to_store() {
  let provider = Arc::new(ScriptedProvider::default().with_info("https://fresh.com", info(0.6, "ok", &[])));
  let store = Arc::new(FlakyStore::default());
  store.upsert(row("known.com", 0.5)).await.unwrap();
  let r = resolver(&provider, &store, BrokenCache);

  let outcome = r.fetch_page_ranks().await;
  assert!(outcome.is_degraded());
  assert_eq!(outcome.value().len(), 1);

  assert_eq!(r.get_page_rank(V1, "https://known.com", &[]).await.unwrap().rank, 0.5);

  // Miss path still answers; the failed invalidation is logged, not raised.
  let fresh = r.get_page_rank(V1, "https://fresh.com", &[]).await.unwrap();
  assert_eq!(fresh.rank, 0.6);
  assert!(matches!(
    r.writer().persist("https://fresh.com", &info(0.6, "ok", &[])).await,
    Persisted::Failed(Error::Persistence(_))
  ));
}

#[tokio::test]
async fn persistence_failure_does_not_fail_the_request() {
  let url = "https://unsaved.com";
  let provider = Arc::new(ScriptedProvider::default().with_info(url, info(0.9, "ok", &[])));
  let store = Arc::new(FlakyStore::default());
  store.fail_writes.store(true, Ordering::SeqCst);
  let r = resolver(&provider, &store, MemoryCache::new());

  let rank = r.get_page_rank(V1, url, &[]).await.unwrap();
  assert_eq!(rank.rank, 0.9);
  assert!(store.rows.lock().unwrap().is_empty());

  let persisted = r.writer().persist(url, &info(0.9, "ok", &[])).await;
  assert!(matches!(persisted, Persisted::Failed(Error::Persistence(_))));
}

#[tokio::test]
async fn write_path_skips_unusable_input() {
  let store = Arc::new(FlakyStore::default());
  let writer = RankWriter::new(store.clone(), Arc::new(MemoryCache::new()));

  let cases = [
    ("", info(0.5, "ok", &[]), SkipReason::EmptyHost),
    ("https://", info(0.5, "ok", &[]), SkipReason::EmptyHost),
    ("https://a.com", ProviderInfo { rank: None, ..info(0.5, "ok", &[]) }, SkipReason::MissingFields),
    ("https://a.com", ProviderInfo { info: None, ..info(0.5, "ok", &[]) }, SkipReason::MissingFields),
    ("https://a.com", info(0.0, "unknown", &[]), SkipReason::NoInformation),
  ];
  for (url, input, reason) in cases {
    let persisted = writer.persist(url, &input).await;
    assert!(matches!(persisted, Persisted::Skipped(r) if r == reason), "{url:?}: {persisted:?}");
  }
  assert!(store.rows.lock().unwrap().is_empty());

  // Rank zero with a real status is a valid classification.
  assert!(writer.persist("https://a.com", &info(0.0, "ok", &[])).await.is_written());
  // Missing categories and quality take the empty/unknown defaults.
  let bare = ProviderInfo { rank: Some(0.2), info: Some("ok".into()), ..ProviderInfo::default() };
  assert!(writer.persist("https://b.com", &bare).await.is_written());
  let rows = store.rows.lock().unwrap();
  assert!(rows["b.com"].categories.is_empty());
  assert_eq!(rows["b.com"].quality, "unknown");
}

// ─── Pass-throughs ───────────────────────────────────────────────────────────

#[tokio::test]
async fn taxonomy_is_memoised_per_version() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = Arc::new(FlakyStore::default());
  let r = resolver(&provider, &store, MemoryCache::new());

  let v1 = r.get_taxonomy(ApiVersion(1)).await.unwrap();
  r.get_taxonomy(ApiVersion(1)).await.unwrap();
  let v2 = r.get_taxonomy(ApiVersion(2)).await.unwrap();

  assert_eq!(v1["version"], 1);
  assert_eq!(v2["version"], 2);
  assert_eq!(provider.taxonomy_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reassessment_passes_through() {
  let provider = Arc::new(ScriptedProvider::default());
  let store = Arc::new(FlakyStore::default());
  let r = resolver(&provider, &store, MemoryCache::new());

  let out = r.reassessment(V1, json!({ "url": "https://a.com" })).await.unwrap();
  assert_eq!(out["accepted"], true);
  assert_eq!(out["echo"]["url"], "https://a.com");
}

// ─── Sync ────────────────────────────────────────────────────────────────────

fn scheduler(
  provider: &Arc<ScriptedProvider>,
  store: &Arc<FlakyStore>,
  batch_size: usize,
) -> SyncScheduler<ScriptedProvider, FlakyStore, MemoryCache> {
  let writer = RankWriter::new(store.clone(), Arc::new(MemoryCache::new()));
  SyncScheduler::new(provider.clone(), writer, batch_size)
}

#[tokio::test]
async fn sync_stops_after_short_page() {
  let provider =
    Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 1000), page(1000, 1000), page(2000, 450)]));
  let store = Arc::new(FlakyStore::default());

  let report = scheduler(&provider, &store, 1000).update(V1, None).await;

  let offsets: Vec<usize> = provider.batch_calls().iter().map(|c| c.1).collect();
  assert_eq!(offsets, vec![0, 1000, 2000]);
  assert!(provider.batch_calls().iter().all(|c| c.0 == 1000));
  assert!(report.success());
  assert_eq!(report.pages, 3);
  assert_eq!(report.written, 2450);
  assert_eq!(store.rows.lock().unwrap().len(), 2450);
}

#[tokio::test]
async fn sync_requests_one_empty_page_after_a_full_one() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 10), page(10, 10)]));
  let store = Arc::new(FlakyStore::default());

  let report = scheduler(&provider, &store, 10).update(V1, None).await;
  assert_eq!(provider.batch_calls().len(), 3);
  assert_eq!(report.pages, 3);
  assert_eq!(report.written, 20);
}

#[tokio::test]
async fn sync_passes_cursor_through() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 3)]));
  let store = Arc::new(FlakyStore::default());
  let since = Utc::now() - chrono::Duration::days(1);

  scheduler(&provider, &store, 10).update(V1, Some(since)).await;
  assert_eq!(provider.batch_calls(), vec![(10, 0, Some(since))]);
}

#[tokio::test]
async fn sync_is_idempotent() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 5), page(5, 2)]));
  let store = sqlite().await;
  let r = PageRankResolver::new(
    provider.clone(),
    store.clone(),
    Arc::new(MemoryCache::new()),
    ResolverConfig { batch_size: 5, ..ResolverConfig::default() },
  );

  let strip = |rows: Vec<ClassificationRecord>| {
    let mut rows: Vec<_> = rows
      .into_iter()
      .map(|r| (r.host, r.rank.to_bits(), r.info, r.categories, r.quality))
      .collect();
    rows.sort();
    rows
  };

  assert!(r.update(V1, None).await.success());
  let first = strip(store.load_ranked().await.unwrap());
  assert!(r.update(V1, None).await.success());
  let second = strip(store.load_ranked().await.unwrap());

  assert_eq!(first.len(), 7);
  assert_eq!(first, second);
  assert_eq!(store.count().await.unwrap(), 7);
}

#[tokio::test]
async fn sync_counts_skipped_and_failed_records_but_still_succeeds() {
  let mut entries = page(0, 2).page_ranks;
  entries.push(BatchEntry::Record(ProviderRecord { url: "https://void.com".into(), info: info(0.0, "unknown", &[]) }));
  entries.push(BatchEntry::Record(ProviderRecord { url: String::new(), info: info(0.5, "ok", &[]) }));
  entries.push(BatchEntry::Malformed(json!({ "url": 42 })));
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![BatchPage { page_ranks: entries }]));
  let store = Arc::new(FlakyStore::default());

  let report = scheduler(&provider, &store, 10).update(V1, None).await;
  assert!(report.success());
  assert_eq!(report.written, 2);
  assert_eq!(report.skipped, 3);
  assert_eq!(report.failed, 0);

  store.fail_writes.store(true, Ordering::SeqCst);
  let report = scheduler(&provider, &store, 10).update(V1, None).await;
  assert!(report.success());
  assert_eq!(report.failed, 2);
}

#[tokio::test]
async fn sync_page_failure_stops_without_raising() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 10), page(10, 10), page(20, 1)]));
  *provider.fail_batch_at.lock().unwrap() = Some(1);
  let store = Arc::new(FlakyStore::default());

  let report = scheduler(&provider, &store, 10).update(V1, None).await;
  assert!(!report.success());
  assert!(report.interrupted.as_deref().unwrap().contains("502"));
  assert_eq!(report.pages, 1);
  assert_eq!(report.written, 10);
  assert_eq!(provider.batch_calls().len(), 2);
}

#[tokio::test]
async fn sync_writes_become_visible_to_resolution() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 3)]));
  let store = sqlite().await;
  let r = resolver(&provider, &store, MemoryCache::new());

  assert!(r.fetch_page_rank("site1.example.com", true).await.is_none());
  r.update(V1, None).await;
  let rank = r.fetch_page_rank("https://site1.example.com/anything", false).await.unwrap();
  assert_eq!(rank.url, "site1.example.com");
  assert_eq!(rank.categories, vec!["news"]);
}

#[tokio::test(start_paused = true)]
async fn periodic_sync_advances_cursor_and_stops_on_shutdown() {
  let provider = Arc::new(ScriptedProvider::default().with_pages(vec![page(0, 2)]));
  let store = Arc::new(FlakyStore::default());
  let sched = scheduler(&provider, &store, 10);
  let (tx, rx) = watch::channel(false);

  let handle = tokio::spawn(async move {
    sched.run(V1, Duration::from_secs(60), None, rx).await;
  });

  tokio::time::sleep(Duration::from_secs(150)).await;
  tx.send(true).unwrap();
  handle.await.unwrap();

  let calls = provider.batch_calls();
  assert!(calls.len() >= 2, "calls: {calls:?}");
  assert_eq!(calls[0].2, None);
  assert!(calls[1].2.is_some());
  assert!(calls.windows(2).all(|w| w[0].2 <= w[1].2));
}
