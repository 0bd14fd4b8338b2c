//! The `RankStore` trait: durable storage, one row per normalised host.
//!
//! The store is the single source of truth; every cache in front of it is a
//! derived view that may be dropped at any time.

use std::future::Future;

use crate::record::{ClassificationRecord, NewClassification};

pub trait RankStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace the row keyed by `row.host`. Last write wins on every
  /// field; `updated_at` is set by the store.
  fn upsert(
    &self,
    row: NewClassification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every row with a non-null rank, most recently updated first. Rows that
  /// cannot be decoded are left out.
  fn load_ranked(
    &self,
  ) -> impl Future<Output = Result<Vec<ClassificationRecord>, Self::Error>> + Send + '_;
}
