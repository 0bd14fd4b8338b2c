//! Classification records: the rows held per normalised host, and the
//! provider-side shapes they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel `info`/`quality` value for "row exists but carries no signal".
pub const INFO_UNKNOWN: &str = "unknown";

pub const RANK_MIN: f64 = -1.0;
pub const RANK_MAX: f64 = 1.0;

/// Clamp a rank into `[RANK_MIN, RANK_MAX]`. NaN reads as zero.
pub fn clamp_rank(rank: f64) -> f64 {
  if rank.is_nan() {
    return 0.0;
  }
  rank.clamp(RANK_MIN, RANK_MAX)
}

// ─── Durable row ─────────────────────────────────────────────────────────────

/// A known classification for one index key (normally a bare host).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
  pub host:       String,
  /// Always within `[-1, 1]` once constructed through [`Self::new`].
  pub rank:       f64,
  pub info:       String,
  /// Provider order is preserved.
  pub categories: Vec<String>,
  pub quality:    String,
  pub updated_at: DateTime<Utc>,
}

impl ClassificationRecord {
  pub fn new(
    host: impl Into<String>,
    rank: f64,
    info: impl Into<String>,
    categories: Vec<String>,
    quality: impl Into<String>,
    updated_at: DateTime<Utc>,
  ) -> Self {
    Self {
      host: host.into(),
      rank: clamp_rank(rank),
      info: info.into(),
      categories,
      quality: quality.into(),
      updated_at,
    }
  }

  /// Map this record to the caller-facing result, reporting it under `key`.
  pub fn to_page_rank(&self, key: &str) -> PageRank {
    PageRank {
      url:        key.to_owned(),
      rank:       clamp_rank(self.rank),
      info:       self.info.clone(),
      categories: self.categories.clone(),
      quality:    self.quality.clone(),
      updated_at: Some(self.updated_at),
    }
  }
}

/// Input to [`RankStore::upsert`](crate::store::RankStore::upsert). The store
/// assigns `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClassification {
  pub host:       String,
  pub rank:       f64,
  pub info:       String,
  pub categories: Vec<String>,
  pub quality:    String,
}

// ─── Caller-facing result ────────────────────────────────────────────────────

/// The answer to "what is the classification of URL X". Shaped identically on
/// the index-hit and provider-miss paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRank {
  pub url:        String,
  pub rank:       f64,
  pub info:       String,
  pub categories: Vec<String>,
  pub quality:    String,
  pub updated_at: Option<DateTime<Utc>>,
}

impl PageRank {
  /// Build a result from a fresh provider answer. Missing fields take the
  /// "no information" defaults.
  pub fn from_provider(url: impl Into<String>, info: &ProviderInfo) -> Self {
    Self {
      url:        url.into(),
      rank:       clamp_rank(info.rank.unwrap_or(0.0)),
      info:       info.info.clone().unwrap_or_else(|| INFO_UNKNOWN.to_owned()),
      categories: info.categories.clone().unwrap_or_default(),
      quality:    info.quality.clone().unwrap_or_else(|| INFO_UNKNOWN.to_owned()),
      updated_at: info.updated_at,
    }
  }
}

// ─── Provider shapes ─────────────────────────────────────────────────────────

/// Classification fields as returned by the provider. Every field may be
/// missing; the write path decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
  #[serde(default)]
  pub rank:       Option<f64>,
  #[serde(default)]
  pub info:       Option<String>,
  #[serde(default)]
  pub categories: Option<Vec<String>>,
  #[serde(default)]
  pub quality:    Option<String>,
  #[serde(default, deserialize_with = "lenient_datetime")]
  pub updated_at: Option<DateTime<Utc>>,
}

/// One entry of a batch page: the classified URL plus its fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
  #[serde(default)]
  pub url:  String,
  #[serde(flatten)]
  pub info: ProviderInfo,
}

/// A batch entry that either decoded or did not. Undecodable entries still
/// count toward the page length.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
  Record(ProviderRecord),
  Malformed(serde_json::Value),
}

/// A page of changed classifications.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchPage {
  #[serde(default)]
  pub page_ranks: Vec<BatchEntry>,
}

impl BatchPage {
  pub fn len(&self) -> usize { self.page_ranks.len() }

  pub fn is_empty(&self) -> bool { self.page_ranks.is_empty() }
}

/// Accept RFC 3339 timestamps and treat anything else as absent.
fn lenient_datetime<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(de)?;
  Ok(raw.and_then(|s| {
    DateTime::parse_from_rfc3339(&s)
      .ok()
      .map(|dt| dt.with_timezone(&Utc))
  }))
}
