//! Error type for `siterank-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column {column} holds a {found} value")]
  ColumnType { column: &'static str, found: &'static str },

  #[error("refusing to write a row with an empty host")]
  EmptyHost,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
