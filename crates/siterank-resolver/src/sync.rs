//! Batch synchronisation of the durable store from the provider.
//!
//! Pagination is by offset: a page shorter than the page size is the last
//! one. If the upstream set changes mid-run, rows can be skipped or seen
//! twice. Re-running is always safe because writes upsert by host, and the
//! periodic loop narrows each run with a `changedAfter` cursor.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use siterank_core::{
  ApiVersion,
  cache::RankCache,
  provider::ClassificationProvider,
  record::BatchEntry,
  store::RankStore,
};
use tokio::sync::watch;

use crate::{Error, outcome::Persisted, write::RankWriter};

// ─── Report ──────────────────────────────────────────────────────────────────

/// What one [`SyncScheduler::update`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Page requests that returned successfully.
  pub pages:       usize,
  pub written:     usize,
  /// Entries the write path declined, plus undecodable entries.
  pub skipped:     usize,
  /// Entries whose write failed.
  pub failed:      usize,
  /// Set when a page request failed and the run stopped early.
  pub interrupted: Option<String>,
}

impl SyncReport {
  /// True when pagination ran to the last page. Per-record skips and write
  /// failures do not affect this.
  pub fn success(&self) -> bool { self.interrupted.is_none() }

  fn record(&mut self, persisted: Persisted) {
    match persisted {
      Persisted::Written => self.written += 1,
      Persisted::Skipped(_) => self.skipped += 1,
      Persisted::Failed(_) => self.failed += 1,
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Pulls changed classifications from the provider and writes them through
/// [`RankWriter`]. Never reads the index.
pub struct SyncScheduler<P, S, C> {
  provider:   Arc<P>,
  writer:     RankWriter<S, C>,
  batch_size: usize,
}

impl<P, S, C> SyncScheduler<P, S, C>
where
  P: ClassificationProvider,
  S: RankStore,
  C: RankCache,
{
  pub fn new(provider: Arc<P>, writer: RankWriter<S, C>, batch_size: usize) -> Self {
    Self { provider, writer, batch_size: batch_size.max(1) }
  }

  pub fn batch_size(&self) -> usize { self.batch_size }

  /// Page through every classification changed after `changed_after` and
  /// persist each one. Never fails; see [`SyncReport`].
  pub async fn update(
    &self,
    version: ApiVersion,
    changed_after: Option<DateTime<Utc>>,
  ) -> SyncReport {
    tracing::info!(%version, ?changed_after, "updating page ranks from the provider");

    let limit = self.batch_size;
    let mut offset = 0;
    let mut report = SyncReport::default();

    loop {
      let page = match self
        .provider
        .get_batch_info(version, limit, offset, changed_after)
        .await
      {
        Ok(page) => page,
        Err(e) => {
          tracing::error!(offset, error = %e, "page rank batch request failed");
          report.interrupted = Some(e.to_string());
          break;
        }
      };
      report.pages += 1;

      let count = page.len();
      for entry in page.page_ranks {
        match entry {
          BatchEntry::Record(record) => {
            report.record(self.writer.persist(&record.url, &record.info).await);
          }
          BatchEntry::Malformed(raw) => {
            let skipped = Error::MalformedRecord(raw.to_string());
            tracing::debug!(error = %skipped, "skipping batch entry");
            report.skipped += 1;
          }
        }
      }

      offset += limit;
      if count < limit {
        break;
      }
    }

    tracing::info!(
      pages = report.pages,
      written = report.written,
      skipped = report.skipped,
      failed = report.failed,
      complete = report.success(),
      "updating page ranks finished"
    );
    report
  }

  /// Run [`Self::update`] every `interval` until `shutdown` flips to `true`
  /// or its sender is dropped.
  ///
  /// The first run uses `changed_after`; each later run uses the start time
  /// of the last complete run.
  pub async fn run(
    &self,
    version: ApiVersion,
    interval: Duration,
    changed_after: Option<DateTime<Utc>>,
    mut shutdown: watch::Receiver<bool>,
  ) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut cursor = changed_after;

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          let started = Utc::now();
          if self.update(version, cursor).await.success() {
            cursor = Some(started);
          }
        }
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            tracing::info!("page rank sync loop stopping");
            break;
          }
        }
      }
    }
  }
}
