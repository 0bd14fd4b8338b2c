use std::time::Duration;

use serde::Deserialize;

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://gitoku.com";

/// The `[provider]` table of the binary's configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
  pub base_url:     String,
  /// Whole-request timeout, including reading the body.
  pub timeout_secs: u64,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_BASE_URL.to_owned(), timeout_secs: 30 }
  }
}

impl ProviderConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs.max(1)) }
}
