//! Async HTTP client for the provider's versioned JSON API.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use siterank_core::{
  ApiVersion,
  provider::ClassificationProvider,
  record::{BatchPage, ProviderInfo},
};
use url::form_urlencoded;

use crate::{Error, ProviderConfig, Result};

/// [`ClassificationProvider`] backed by `reqwest`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpProvider {
  client: Client,
  config: ProviderConfig,
}

impl HttpProvider {
  pub fn new(config: ProviderConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout()).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, version: ApiVersion, path: &str) -> String {
    format!(
      "{}/api/v{}{}",
      self.config.base_url.trim_end_matches('/'),
      version.0,
      path
    )
  }

  /// Send `req` and decode a successful JSON body. Non-2xx responses keep
  /// their body text for the error.
  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Status { status: status.as_u16(), body });
    }
    let text = resp.text().await?;
    Ok(serde_json::from_str(&text)?)
  }
}

/// `url` as a single path segment, `+` for spaces.
fn encode_segment(url: &str) -> String {
  form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

fn batch_query(
  limit: usize,
  offset: usize,
  changed_after: Option<DateTime<Utc>>,
) -> Vec<(&'static str, String)> {
  let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
  if let Some(ts) = changed_after {
    query.push(("changedAfter", ts.to_rfc3339_opts(SecondsFormat::Secs, false)));
  }
  query
}

impl ClassificationProvider for HttpProvider {
  type Error = Error;

  /// `GET /api/v{n}/page-rank/{url}?categories[]=..`
  async fn get_info<'a>(
    &'a self,
    version: ApiVersion,
    url: &'a str,
    categories: &'a [String],
  ) -> Result<ProviderInfo> {
    let query: Vec<(&str, &str)> = categories.iter().map(|c| ("categories[]", c.as_str())).collect();
    let req = self
      .client
      .get(self.url(version, &format!("/page-rank/{}", encode_segment(url))))
      .query(&query);
    tracing::debug!(%version, url, "requesting page info");
    self.send(req).await
  }

  /// `GET /api/v{n}/page-rank?limit=&offset=[&changedAfter=]`
  async fn get_batch_info(
    &self,
    version: ApiVersion,
    limit: usize,
    offset: usize,
    changed_after: Option<DateTime<Utc>>,
  ) -> Result<BatchPage> {
    let req = self
      .client
      .get(self.url(version, "/page-rank"))
      .query(&batch_query(limit, offset, changed_after));
    tracing::debug!(%version, limit, offset, "requesting page info batch");
    self.send(req).await
  }

  /// `POST /api/v{n}/reassessment`
  async fn reassessment(
    &self,
    version: ApiVersion,
    data: serde_json::Value,
  ) -> Result<serde_json::Value> {
    let req = self.client.post(self.url(version, "/reassessment")).json(&data);
    self.send(req).await
  }

  /// `GET /api/v{n}/taxonomy`
  async fn get_taxonomy(&self, version: ApiVersion) -> Result<serde_json::Value> {
    self.send(self.client.get(self.url(version, "/taxonomy"))).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn url_joins_base_version_and_path() {
    let provider = HttpProvider::new(ProviderConfig {
      base_url: "https://provider.test/".into(),
      ..ProviderConfig::default()
    })
    .unwrap();
    assert_eq!(provider.url(ApiVersion(2), "/taxonomy"), "https://provider.test/api/v2/taxonomy");
  }

  #[test]
  fn page_url_is_one_encoded_segment() {
    assert_eq!(
      encode_segment("https://a.com/x y?q=1"),
      "https%3A%2F%2Fa.com%2Fx+y%3Fq%3D1"
    );
  }

  #[test]
  fn batch_query_includes_cursor_only_when_set() {
    assert_eq!(batch_query(1000, 0, None).len(), 2);
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    let query = batch_query(10, 20, Some(ts));
    assert_eq!(query[0], ("limit", "10".to_owned()));
    assert_eq!(query[1], ("offset", "20".to_owned()));
    assert_eq!(query[2], ("changedAfter", "2024-03-01T12:30:00+00:00".to_owned()));
  }
}
