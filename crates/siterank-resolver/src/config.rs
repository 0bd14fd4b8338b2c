//! Tunables for resolution and synchronisation.

use std::time::Duration;

use serde::Deserialize;

/// Deserialised from the `[resolver]` table of the binary's configuration.
/// Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
  /// Lifetime of the cached snapshot of all durable rows.
  pub index_ttl_secs:     u64,
  /// Lifetime of a memoised provider answer for one exact URL.
  pub page_info_ttl_secs: u64,
  pub taxonomy_ttl_secs:  u64,
  /// Page size of the batch sync loop.
  pub batch_size:         usize,
  /// Period of the background sync loop.
  pub sync_interval_secs: u64,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      index_ttl_secs:     300,
      page_info_ttl_secs: 300,
      taxonomy_ttl_secs:  60,
      batch_size:         1000,
      sync_interval_secs: 3600,
    }
  }
}

impl ResolverConfig {
  pub fn index_ttl(&self) -> Duration { Duration::from_secs(self.index_ttl_secs) }

  pub fn page_info_ttl(&self) -> Duration { Duration::from_secs(self.page_info_ttl_secs) }

  pub fn taxonomy_ttl(&self) -> Duration { Duration::from_secs(self.taxonomy_ttl_secs) }

  pub fn sync_interval(&self) -> Duration { Duration::from_secs(self.sync_interval_secs.max(1)) }

  /// Never zero, so pagination always advances.
  pub fn batch_size(&self) -> usize { self.batch_size.max(1) }
}
