//! [`SqliteStore`], the SQLite implementation of [`RankStore`].

use std::path::Path;

use chrono::Utc;
use siterank_core::{
  ClassificationRecord,
  record::NewClassification,
  store::RankStore,
};

use crate::{
  Error, Result,
  encode::{RawRank, encode_categories, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Classification rows backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows, ranked or not.
  pub async fn count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM page_ranks", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }

  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RankStore impl ──────────────────────────────────────────────────────────

impl RankStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, row: NewClassification) -> Result<()> {
    if row.host.is_empty() {
      return Err(Error::EmptyHost);
    }

    let categories_str = encode_categories(&row.categories)?;
    let updated_at_str = encode_dt(Utc::now());
    let NewClassification { host, rank, info, quality, .. } = row;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO page_ranks (host, rank, info, categories, quality, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(host) DO UPDATE SET
             rank       = excluded.rank,
             info       = excluded.info,
             categories = excluded.categories,
             quality    = excluded.quality,
             updated_at = excluded.updated_at",
          rusqlite::params![host, rank, info, categories_str, quality, updated_at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_ranked(&self) -> Result<Vec<ClassificationRecord>> {
    let raws: Vec<RawRank> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT host, rank, info, categories, quality, updated_at
           FROM page_ranks
           WHERE rank IS NOT NULL
           ORDER BY updated_at DESC, host ASC",
        )?;
        let rows = stmt
          .query_map([], RawRank::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let records = raws
      .into_iter()
      .filter_map(|raw| {
        let host = raw.host_label();
        match raw.into_record() {
          Ok(record) => Some(record),
          Err(e) => {
            tracing::debug!(%host, error = %e, "skipping undecodable page_ranks row");
            None
          }
        }
      })
      .collect();
    Ok(records)
  }
}
