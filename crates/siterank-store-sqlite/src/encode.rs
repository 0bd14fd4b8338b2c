//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that lexical order matches time order. Category
//! lists are stored as compact JSON arrays.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use siterank_core::{ClassificationRecord, INFO_UNKNOWN};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Categories ──────────────────────────────────────────────────────────────

pub fn encode_categories(categories: &[String]) -> Result<String> {
  Ok(serde_json::to_string(categories)?)
}

/// `NULL`, the empty string and JSON `null` all read back as an empty list.
pub fn decode_categories(s: Option<&str>) -> Result<Vec<String>> {
  match s.map(str::trim) {
    None | Some("") | Some("null") => Ok(vec![]),
    Some(json) => Ok(serde_json::from_str(json)?),
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Untyped values read directly from a `page_ranks` row. SQLite does not
/// enforce column types, so every column is checked in [`RawRank::into_record`]
/// and a bad row fails on its own.
pub struct RawRank {
  pub host:       Value,
  pub rank:       Value,
  pub info:       Value,
  pub categories: Value,
  pub quality:    Value,
  pub updated_at: Value,
}

impl RawRank {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      host:       row.get(0)?,
      rank:       row.get(1)?,
      info:       row.get(2)?,
      categories: row.get(3)?,
      quality:    row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  /// The host for log fields, whatever its storage class.
  pub fn host_label(&self) -> String {
    match &self.host {
      Value::Text(host) => host.clone(),
      other => format!("<{}>", type_name(other)),
    }
  }

  pub fn into_record(self) -> Result<ClassificationRecord> {
    let host = text("host", self.host)?.unwrap_or_default();
    let updated_at = text("updated_at", self.updated_at)?
      .ok_or(Error::ColumnType { column: "updated_at", found: "null" })?;
    let info = text("info", self.info)?
      .ok_or(Error::ColumnType { column: "info", found: "null" })?;

    Ok(ClassificationRecord::new(
      host,
      real("rank", self.rank)?,
      info,
      decode_categories(text("categories", self.categories)?.as_deref())?,
      text("quality", self.quality)?.unwrap_or_else(|| INFO_UNKNOWN.to_owned()),
      decode_dt(&updated_at)?,
    ))
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Integer(_) => "integer",
    Value::Real(_) => "real",
    Value::Text(_) => "text",
    Value::Blob(_) => "blob",
  }
}

fn text(column: &'static str, value: Value) -> Result<Option<String>> {
  match value {
    Value::Null => Ok(None),
    Value::Text(s) => Ok(Some(s)),
    other => Err(Error::ColumnType { column, found: type_name(&other) }),
  }
}

fn real(column: &'static str, value: Value) -> Result<f64> {
  match value {
    Value::Real(f) => Ok(f),
    Value::Integer(i) => Ok(i as f64),
    other => Err(Error::ColumnType { column, found: type_name(&other) }),
  }
}
