//! The write path: persist one provider answer, then invalidate the index.

use std::sync::Arc;

use siterank_core::{
  INFO_UNKNOWN,
  cache::RankCache,
  normalize::{normalize, normalize_host},
  record::{NewClassification, ProviderInfo},
  store::RankStore,
};

use crate::{
  Error,
  index::IndexSnapshot,
  outcome::{Persisted, SkipReason},
};

/// Cache key of the [`ClassificationIndex`](crate::ClassificationIndex)
/// snapshot.
pub const INDEX_CACHE_KEY: &str = "page_info_page_ranks";

/// Writes classifications through to the durable store.
///
/// Shared by the resolver (miss path) and the sync scheduler. Never fails its
/// caller: every problem is reported through [`Persisted`] and logged.
pub struct RankWriter<S, C> {
  store:    Arc<S>,
  cache:    Arc<C>,
  snapshot: Arc<IndexSnapshot>,
}

impl<S, C> Clone for RankWriter<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      cache:    self.cache.clone(),
      snapshot: self.snapshot.clone(),
    }
  }
}

impl<S, C> RankWriter<S, C>
where
  S: RankStore,
  C: RankCache,
{
  pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
    Self { store, cache, snapshot: Arc::new(IndexSnapshot::new()) }
  }

  /// The in-process index snapshot this writer clears after each write.
  pub fn snapshot(&self) -> &IndexSnapshot { &self.snapshot }

  /// Upsert the classification of `url` under its normalised host.
  ///
  /// Skips (without error) an empty host, a record missing `rank` or `info`,
  /// and the `rank == 0, info == "unknown"` no-information sentinel. After a
  /// write both the in-process snapshot and the cached index are dropped so
  /// the next read rebuilds it.
  pub async fn persist(&self, url: &str, info: &ProviderInfo) -> Persisted {
    let host = normalize_host(&normalize(url));
    if host.is_empty() {
      return Persisted::Skipped(SkipReason::EmptyHost);
    }

    let (Some(rank), Some(text)) = (info.rank, info.info.as_deref()) else {
      return Persisted::Skipped(SkipReason::MissingFields);
    };
    if rank == 0.0 && text == INFO_UNKNOWN {
      return Persisted::Skipped(SkipReason::NoInformation);
    }

    let row = NewClassification {
      host:       host.clone(),
      rank,
      info:       text.to_owned(),
      categories: info.categories.clone().unwrap_or_default(),
      quality:    info.quality.clone().unwrap_or_else(|| INFO_UNKNOWN.to_owned()),
    };

    if let Err(e) = self.store.upsert(row).await {
      tracing::error!(%host, error = %e, "failed to persist page rank");
      return Persisted::Failed(Error::persistence(e));
    }

    self.snapshot.clear();
    if let Err(e) = self.cache.invalidate(INDEX_CACHE_KEY).await {
      tracing::error!(%host, error = %e, "failed to invalidate page rank index");
      return Persisted::Failed(Error::persistence(e));
    }

    Persisted::Written
  }
}
