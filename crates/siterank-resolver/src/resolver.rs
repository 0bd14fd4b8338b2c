//! [`PageRankResolver`]: cache-aside resolution with hierarchical fallback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use siterank_core::{
  ApiVersion, PageRank,
  cache::RankCache,
  normalize::{explode_url, normalize, normalize_host},
  provider::ClassificationProvider,
  store::RankStore,
};

use crate::{
  ClassificationIndex, Error, Result, ResolverConfig,
  cache::get_or_compute,
  outcome::Outcome,
  sync::{SyncReport, SyncScheduler},
  write::{INDEX_CACHE_KEY, RankWriter},
};

/// Prefix of the memoised provider answer for one exact URL.
pub const PAGE_INFO_KEY_PREFIX: &str = "page_info_domain_";

/// Prefix of the memoised taxonomy, one entry per API version.
pub const TAXONOMY_KEY_PREFIX: &str = "taxonomy_";

/// Cache key of the provider answer for `url`.
pub fn page_info_key(url: &str) -> String {
  let digest = Sha256::digest(url.as_bytes());
  format!("{PAGE_INFO_KEY_PREFIX}{}", hex::encode(digest))
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Answers classification requests from the durable store, the short-lived
/// cache and, on a genuine miss, the provider.
///
/// Safe to share between tasks; every method takes `&self`.
pub struct PageRankResolver<P, S, C> {
  provider: Arc<P>,
  store:    Arc<S>,
  cache:    Arc<C>,
  writer:   RankWriter<S, C>,
  sync:     SyncScheduler<P, S, C>,
  config:   ResolverConfig,
}

impl<P, S, C> PageRankResolver<P, S, C>
where
  P: ClassificationProvider,
  S: RankStore,
  C: RankCache,
{
  pub fn new(provider: Arc<P>, store: Arc<S>, cache: Arc<C>, config: ResolverConfig) -> Self {
    let writer = RankWriter::new(store.clone(), cache.clone());
    let sync = SyncScheduler::new(provider.clone(), writer.clone(), config.batch_size());
    Self { provider, store, cache, writer, sync, config }
  }

  pub fn writer(&self) -> &RankWriter<S, C> { &self.writer }

  pub fn scheduler(&self) -> &SyncScheduler<P, S, C> { &self.sync }

  // ── Lookups ───────────────────────────────────────────────────────────────

  /// Classify `url`.
  ///
  /// An exact host match in the index wins. Otherwise the provider is asked
  /// (memoised per exact URL for `page_info_ttl`), the answer is persisted,
  /// and returned. Only a provider failure on that miss path is an error.
  pub async fn get_page_rank(
    &self,
    version: ApiVersion,
    url: &str,
    categories: &[String],
  ) -> Result<PageRank> {
    if let Some(rank) = self.fetch_page_rank(url, true).await {
      return Ok(rank);
    }

    let host = normalize_host(&normalize(url));
    let key = page_info_key(url);
    let fetched = get_or_compute(&*self.cache, &key, self.config.page_info_ttl(), || async {
      let info = self
        .provider
        .get_info(version, url, categories)
        .await
        .map_err(Error::upstream)?;
      self.writer.persist(url, &info).await;
      Ok::<_, Error>(PageRank::from_provider(host.as_str(), &info))
    })
    .await?;

    tracing::debug!(url, hit = fetched.hit, "page rank resolved from provider path");
    Ok(fetched.value)
  }

  /// Look `request_url` up in the index without calling the provider.
  ///
  /// With `host_exact_match` only the normalised host is tried. Otherwise
  /// candidate keys are walked from most to least specific and the first hit
  /// wins.
  pub async fn fetch_page_rank(
    &self,
    request_url: &str,
    host_exact_match: bool,
  ) -> Option<PageRank> {
    let url = normalize(request_url);
    let index = self.fetch_page_ranks().await.into_value();

    if host_exact_match {
      let host = normalize_host(&url);
      return index.get(&host).map(|record| record.to_page_rank(&host));
    }

    index
      .first_match(explode_url(&url))
      .map(|(key, record)| record.to_page_rank(&key))
  }

  /// The index snapshot: the in-process copy while it is fresh, otherwise
  /// rebuilt from the shared cache or the store.
  ///
  /// A cache failure falls through to the store. A store failure yields an
  /// empty index that is not kept. Both are reported as
  /// [`Outcome::Degraded`].
  pub async fn fetch_page_ranks(&self) -> Outcome<Arc<ClassificationIndex>> {
    let snapshot = self.writer.snapshot();
    let ttl = self.config.index_ttl();
    if let Some(index) = snapshot.get(ttl) {
      return Outcome::Ok(index);
    }

    let generation = snapshot.generation();
    let fetched = get_or_compute(&*self.cache, INDEX_CACHE_KEY, ttl, || async {
      self.store.load_ranked().await.map_err(Error::transient)
    })
    .await;

    match fetched {
      Ok(fetched) => {
        let index = snapshot.put(generation, ClassificationIndex::from_records(fetched.value));
        match fetched.bypassed {
          None => Outcome::Ok(index),
          Some(cause) => Outcome::Degraded(index, cause),
        }
      }
      Err(cause) => {
        tracing::error!(error = %cause, "failed to load page rank index");
        Outcome::Degraded(Arc::new(ClassificationIndex::default()), cause)
      }
    }
  }

  // ── Sync and pass-throughs ────────────────────────────────────────────────

  /// Run one batch sync. See [`SyncScheduler::update`].
  pub async fn update(
    &self,
    version: ApiVersion,
    changed_after: Option<DateTime<Utc>>,
  ) -> SyncReport {
    self.sync.update(version, changed_after).await
  }

  /// The provider's category tree, memoised per version for `taxonomy_ttl`.
  pub async fn get_taxonomy(&self, version: ApiVersion) -> Result<serde_json::Value> {
    let key = format!("{TAXONOMY_KEY_PREFIX}{version}");
    let fetched = get_or_compute(&*self.cache, &key, self.config.taxonomy_ttl(), || async {
      self.provider.get_taxonomy(version).await.map_err(Error::upstream)
    })
    .await?;
    Ok(fetched.value)
  }

  /// Forward a reassessment request to the provider, uncached.
  pub async fn reassessment(
    &self,
    version: ApiVersion,
    data: serde_json::Value,
  ) -> Result<serde_json::Value> {
    self
      .provider
      .reassessment(version, data)
      .await
      .map_err(Error::upstream)
  }
}
