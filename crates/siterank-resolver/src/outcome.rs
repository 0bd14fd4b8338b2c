//! Result types for paths that degrade instead of failing.
//!
//! Index builds and writes swallow their failures so that a storage outage
//! never blocks a classification request. The cause is still carried in the
//! value so callers and tests can see it without inspecting logs.

use crate::Error;

/// A value that is either sound or a logged-but-suppressed fallback.
#[derive(Debug)]
pub enum Outcome<T> {
  Ok(T),
  /// `T` is the fallback (possibly empty) value; the error is why.
  Degraded(T, Error),
}

impl<T> Outcome<T> {
  pub fn value(&self) -> &T {
    match self {
      Self::Ok(v) | Self::Degraded(v, _) => v,
    }
  }

  pub fn into_value(self) -> T {
    match self {
      Self::Ok(v) | Self::Degraded(v, _) => v,
    }
  }

  pub fn is_degraded(&self) -> bool { matches!(self, Self::Degraded(..)) }

  pub fn cause(&self) -> Option<&Error> {
    match self {
      Self::Ok(_) => None,
      Self::Degraded(_, e) => Some(e),
    }
  }
}

/// Why the write path declined to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// The URL normalised to an empty host.
  EmptyHost,
  /// `rank` or `info` was missing.
  MissingFields,
  /// `rank == 0` with `info == "unknown"`: no information, not rank zero.
  NoInformation,
}

/// Result of one pass through the write path.
#[derive(Debug)]
pub enum Persisted {
  Written,
  Skipped(SkipReason),
  Failed(Error),
}

impl Persisted {
  pub fn is_written(&self) -> bool { matches!(self, Self::Written) }
}
