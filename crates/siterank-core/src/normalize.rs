//! URL canonicalisation and candidate-key expansion.
//!
//! A requested URL is reduced to `//host/path`: scheme, userinfo, port, query
//! and fragment are dropped, the host is lower-cased with any leading `www.`
//! removed, and the path loses empty and dot segments plus its trailing slash.
//! [`explode_url`] then lists every host/path-prefix truncation from most to
//! least specific; that order is the matching policy of the resolver.
//!
//! Normalisation never fails. Input the `url` crate rejects is reduced with
//! the same rules by plain string handling.

use std::{
  fmt,
  net::{IpAddr, Ipv6Addr},
};

use url::{Host, Url};

/// A canonicalised URL. Displays as `//host/path` (or `//host`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl {
  host:     String,
  /// Path segments without separators.
  segments: Vec<String>,
  /// True when the host is an IP literal; such hosts are never truncated.
  ip:       bool,
}

impl NormalizedUrl {
  pub fn host(&self) -> &str { &self.host }

  pub fn segments(&self) -> &[String] { &self.segments }

  pub fn is_empty(&self) -> bool { self.host.is_empty() }
}

impl fmt::Display for NormalizedUrl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "//{}", self.host)?;
    for segment in &self.segments {
      write!(f, "/{segment}")?;
    }
    Ok(())
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Canonicalise `raw`. Accepts absolute URLs, scheme-relative `//host/..`
/// strings (including this type's own `Display` output) and bare `host/path`.
pub fn normalize(raw: &str) -> NormalizedUrl {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return NormalizedUrl { host: String::new(), segments: vec![], ip: false };
  }

  let candidate = if trimmed.contains("://") {
    trimmed.to_owned()
  } else if trimmed.starts_with("//") {
    format!("http:{trimmed}")
  } else {
    format!("http://{trimmed}")
  };

  match Url::parse(&candidate) {
    Ok(url) => match url.host() {
      Some(host) => from_parsed(&url, host),
      None => fallback(trimmed),
    },
    Err(_) => fallback(trimmed),
  }
}

fn from_parsed(url: &Url, host: Host<&str>) -> NormalizedUrl {
  let (host, ip) = match host {
    Host::Domain(domain) => (clean_host(domain), false),
    Host::Ipv4(addr) => (addr.to_string(), true),
    Host::Ipv6(addr) => (format!("[{addr}]"), true),
  };
  NormalizedUrl { host, segments: clean_segments(url.path()), ip }
}

/// Best-effort reduction for input the URL parser rejects. Only the
/// authority is lower-cased; the path keeps its case as it does when parsed.
fn fallback(raw: &str) -> NormalizedUrl {
  let rest = match raw.find("://") {
    Some(pos) => &raw[pos + 3..],
    None => raw.trim_start_matches('/'),
  };
  let rest = rest.split(['?', '#']).next().unwrap_or_default();
  let (authority, path) = match rest.find('/') {
    Some(pos) => (&rest[..pos], &rest[pos..]),
    None => (rest, ""),
  };
  let authority = authority.rsplit('@').next().unwrap_or_default();
  let (host, ip) = fallback_host(authority);
  NormalizedUrl { host, segments: clean_segments(path), ip }
}

/// Host of an unparsed authority with any port removed. IP literals are
/// detected so they are rendered and matched like parsed ones.
fn fallback_host(authority: &str) -> (String, bool) {
  if let Some(inner) = authority.strip_prefix('[') {
    let literal = inner.split(']').next().unwrap_or_default();
    if let Ok(addr) = literal.parse::<Ipv6Addr>() {
      return (format!("[{addr}]"), true);
    }
  }
  let host = authority.split(':').next().unwrap_or_default();
  match host.parse::<IpAddr>() {
    Ok(addr) => (addr.to_string(), true),
    Err(_) => (clean_host(host), false),
  }
}

fn clean_host(host: &str) -> String {
  let host = host.trim().trim_end_matches('.').to_lowercase();
  match host.strip_prefix("www.") {
    Some(rest) if !rest.is_empty() => rest.to_owned(),
    _ => host,
  }
}

fn clean_segments(path: &str) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        out.pop();
      }
      other => out.push(other.to_owned()),
    }
  }
  out
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The bare host used as the durable row key.
pub fn normalize_host(url: &NormalizedUrl) -> String { url.host.clone() }

/// Candidate index keys for `url`, most specific first, without the leading
/// `//`. For `//sub.example.com/a/b`:
///
/// ```text
/// sub.example.com/a/b
/// sub.example.com/a
/// sub.example.com
/// example.com
/// ```
///
/// Path prefixes are tried on the full host only; host truncation stops at
/// two labels. The sequence is free of duplicates and ends with the shortest
/// host form. Empty when the URL has no host.
pub fn explode_url(url: &NormalizedUrl) -> Vec<String> {
  if url.host.is_empty() {
    return Vec::new();
  }

  let mut keys: Vec<String> = Vec::new();
  let mut push = |key: String| {
    if !keys.contains(&key) {
      keys.push(key);
    }
  };

  for len in (1..=url.segments.len()).rev() {
    push(format!("{}/{}", url.host, url.segments[..len].join("/")));
  }

  if url.ip {
    push(url.host.clone());
    return keys;
  }

  let labels: Vec<&str> = url.host.split('.').collect();
  let floor = labels.len().saturating_sub(2);
  for start in 0..=floor {
    push(labels[start..].join("."));
  }
  keys
}
