//! Cache-aside helper and the in-process [`RankCache`] backend.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use serde::{Serialize, de::DeserializeOwned};
use siterank_core::cache::RankCache;

use crate::Error;

// ─── Cache-aside ─────────────────────────────────────────────────────────────

/// The value produced by [`get_or_compute`].
#[derive(Debug)]
pub struct Fetched<T> {
  pub value:    T,
  /// True when the value came from the cache.
  pub hit:      bool,
  /// Set when the cache failed and was bypassed. The value is still sound.
  pub bypassed: Option<Error>,
}

/// Read `key` from `cache`; on a miss run `compute`, store its value for
/// `ttl`, and return it.
///
/// Cache failures never fail the call: a failed read falls through to
/// `compute`, a failed write is reported in [`Fetched::bypassed`]. Only
/// `compute`'s own error is returned. Concurrent misses on the same key are
/// not deduplicated; each runs `compute`.
pub async fn get_or_compute<C, T, E, F, Fut>(
  cache: &C,
  key: &str,
  ttl: Duration,
  compute: F,
) -> Result<Fetched<T>, E>
where
  C: RankCache,
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let mut bypassed = None;

  match cache.get(key).await {
    Ok(Some(raw)) => match serde_json::from_value::<T>(raw) {
      Ok(value) => return Ok(Fetched { value, hit: true, bypassed: None }),
      Err(e) => tracing::debug!(key, error = %e, "discarding undecodable cache entry"),
    },
    Ok(None) => {}
    Err(e) => {
      tracing::warn!(key, error = %e, "cache read failed; computing without cache");
      bypassed = Some(Error::transient(e));
    }
  }

  let value = compute().await?;

  if bypassed.is_none() {
    match serde_json::to_value(&value) {
      Ok(raw) => {
        if let Err(e) = cache.set(key, raw, ttl).await {
          tracing::warn!(key, error = %e, "cache write failed");
          bypassed = Some(Error::transient(e));
        }
      }
      Err(e) => {
        tracing::warn!(key, error = %e, "value not cacheable");
        bypassed = Some(Error::transient(e));
      }
    }
  }

  Ok(Fetched { value, hit: false, bypassed })
}

// ─── In-process backend ──────────────────────────────────────────────────────

/// Smallest map size at which a write sweeps expired entries.
const SWEEP_THRESHOLD: usize = 4096;

struct Entry {
  value:      serde_json::Value,
  expires_at: Instant,
}

impl Entry {
  fn is_live(&self, now: Instant) -> bool { now < self.expires_at }
}

/// A process-local TTL map implementing [`RankCache`].
///
/// Cloning is cheap and clones share entries.
///
/// A write sweeps expired entries once the map reaches `sweep_at`, which is
/// then reset to twice the surviving size, so sweeping is amortised O(1) per
/// write however many entries are live.
#[derive(Clone)]
pub struct MemoryCache {
  entries:  Arc<RwLock<HashMap<String, Entry>>>,
  sweep_at: Arc<AtomicUsize>,
}

impl Default for MemoryCache {
  fn default() -> Self {
    Self {
      entries:  Arc::default(),
      sweep_at: Arc::new(AtomicUsize::new(SWEEP_THRESHOLD)),
    }
  }
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }

  /// Number of stored entries, expired ones included.
  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Drop every expired entry.
  pub fn purge_expired(&self) {
    let now = Instant::now();
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.retain(|_, entry| entry.is_live(now));
  }
}

impl RankCache for MemoryCache {
  type Error = Infallible;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<serde_json::Value>, Infallible> {
    let now = Instant::now();
    {
      let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
      match entries.get(key) {
        Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
        Some(_) => {}
        None => return Ok(None),
      }
    }
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
      entries.remove(key);
    }
    Ok(None)
  }

  async fn set<'a>(
    &'a self,
    key: &'a str,
    value: serde_json::Value,
    ttl: Duration,
  ) -> Result<(), Infallible> {
    let now = Instant::now();
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    if entries.len() >= self.sweep_at.load(Ordering::Relaxed) {
      entries.retain(|_, entry| entry.is_live(now));
      self
        .sweep_at
        .store((entries.len() * 2).max(SWEEP_THRESHOLD), Ordering::Relaxed);
    }
    entries.insert(key.to_owned(), Entry { value, expires_at: now + ttl });
    Ok(())
  }

  async fn invalidate<'a>(&'a self, key: &'a str) -> Result<(), Infallible> {
    self
      .entries
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .remove(key);
    Ok(())
  }
}
