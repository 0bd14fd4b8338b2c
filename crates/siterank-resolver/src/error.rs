//! Error taxonomy for the resolver.
//!
//! Collaborator errors are boxed so the resolver stays generic over its
//! provider, store and cache.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Cache or store unavailable during a read. Recovered locally.
  #[error("transient lookup failure: {0}")]
  TransientLookup(#[source] BoxError),

  /// The provider failed during a single-URL lookup. Propagated.
  #[error("upstream provider failure: {0}")]
  Upstream(#[source] BoxError),

  /// Writing a record or invalidating the index failed. Logged only.
  #[error("persistence failure: {0}")]
  Persistence(#[source] BoxError),

  /// A row or batch entry without the required fields.
  #[error("malformed record: {0}")]
  MalformedRecord(String),
}

impl Error {
  pub fn transient(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::TransientLookup(Box::new(e))
  }

  pub fn upstream(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Upstream(Box::new(e))
  }

  pub fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
