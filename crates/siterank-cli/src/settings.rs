//! Layered configuration: optional TOML file, then `SITERANK_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use siterank_core::ApiVersion;
use siterank_provider_http::ProviderConfig;
use siterank_resolver::ResolverConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path:  PathBuf,
  pub api_version: ApiVersion,
  pub provider:    ProviderConfig,
  pub resolver:    ResolverConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:  PathBuf::from("~/.local/share/siterank/siterank.db"),
      api_version: ApiVersion::default(),
      provider:    ProviderConfig::default(),
      resolver:    ResolverConfig::default(),
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then overlay the environment.
  ///
  /// Nested keys use a double underscore:
  /// `SITERANK_PROVIDER__BASE_URL`, `SITERANK_RESOLVER__BATCH_SIZE`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SITERANK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise configuration")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
