//! The `ClassificationProvider` trait, the upstream source of truth.

use std::{fmt, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{BatchPage, ProviderInfo};

/// Provider API version. Passed explicitly to every upstream call so that
/// concurrent requests against different versions never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiVersion(pub u8);

impl Default for ApiVersion {
  fn default() -> Self { Self(1) }
}

impl fmt::Display for ApiVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "v{}", self.0)
  }
}

/// Abstraction over the external classification service.
///
/// Implementations must report transport, HTTP status, and malformed-response
/// failures as distinguishable variants of their `Error` type.
pub trait ClassificationProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Classify a single URL.
  fn get_info<'a>(
    &'a self,
    version: ApiVersion,
    url: &'a str,
    categories: &'a [String],
  ) -> impl Future<Output = Result<ProviderInfo, Self::Error>> + Send + 'a;

  /// One page of classifications changed after `changed_after` (all of them
  /// when `None`).
  fn get_batch_info(
    &self,
    version: ApiVersion,
    limit: usize,
    offset: usize,
    changed_after: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<BatchPage, Self::Error>> + Send + '_;

  /// Submit a reassessment request; the response is passed through verbatim.
  fn reassessment(
    &self,
    version: ApiVersion,
    data: serde_json::Value,
  ) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send + '_;

  /// The provider's nested category tree.
  fn get_taxonomy(
    &self,
    version: ApiVersion,
  ) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send + '_;
}
