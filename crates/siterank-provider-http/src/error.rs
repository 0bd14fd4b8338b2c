//! Error types for `siterank-provider-http`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Connection, timeout, or body read failure.
  #[error("provider transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("provider returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("malformed provider response: {0}")]
  Malformed(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
