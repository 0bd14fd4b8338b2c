//! The `RankCache` trait: a short-lived key/value cache with per-entry TTL.
//!
//! Values are JSON documents so that any backend (in-process map, Redis,
//! memcached) can hold them. Cache-aside logic lives with the caller.

use std::{future::Future, time::Duration};

pub trait RankCache: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the live value for `key`, or `None` if absent or expired.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>> + Send + 'a;

  /// Store `value` under `key` for `ttl`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: serde_json::Value,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Drop `key`. Dropping an absent key is not an error.
  fn invalidate<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
