//! [`ClassificationIndex`], the in-memory snapshot of every ranked row, and
//! the process-local slot that holds the built snapshot between lookups.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
  time::{Duration, Instant},
};

use siterank_core::{ClassificationRecord, record::clamp_rank};

/// All durable rows keyed by host (or host/path key).
#[derive(Debug, Clone, Default)]
pub struct ClassificationIndex {
  records: HashMap<String, ClassificationRecord>,
}

impl ClassificationIndex {
  /// Build from rows ordered most recently updated first. When two rows share
  /// a key the first one (the newest) is kept. Ranks are clamped again here
  /// since rows may arrive through a cache rather than the store.
  pub fn from_records(rows: impl IntoIterator<Item = ClassificationRecord>) -> Self {
    let mut records = HashMap::new();
    for mut row in rows {
      row.rank = clamp_rank(row.rank);
      records.entry(row.host.clone()).or_insert(row);
    }
    Self { records }
  }

  pub fn get(&self, key: &str) -> Option<&ClassificationRecord> { self.records.get(key) }

  /// The first of `keys` present in the index, with the key that matched.
  pub fn first_match<'a, I>(&'a self, keys: I) -> Option<(String, &'a ClassificationRecord)>
  where
    I: IntoIterator<Item = String>,
  {
    keys
      .into_iter()
      .find_map(|key| self.records.get(&key).map(|record| (key, record)))
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

// ─── Snapshot slot ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Slot {
  generation: u64,
  current:    Option<(Instant, Arc<ClassificationIndex>)>,
}

/// The built index, shared by reference so a warm lookup skips the rebuild.
///
/// [`clear`](Self::clear) bumps a generation counter. A snapshot built from a
/// load that started before the bump is refused by [`put`](Self::put), so a
/// write racing a rebuild cannot leave a stale index in place.
#[derive(Default)]
pub struct IndexSnapshot {
  slot: RwLock<Slot>,
}

impl IndexSnapshot {
  pub fn new() -> Self { Self::default() }

  /// The current snapshot if it was built less than `ttl` ago.
  pub fn get(&self, ttl: Duration) -> Option<Arc<ClassificationIndex>> {
    let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
    slot
      .current
      .as_ref()
      .filter(|(built, _)| built.elapsed() < ttl)
      .map(|(_, index)| index.clone())
  }

  /// Token to pass to [`put`](Self::put) for a rebuild starting now.
  pub fn generation(&self) -> u64 {
    self.slot.read().unwrap_or_else(|e| e.into_inner()).generation
  }

  /// Install `index` unless the slot was cleared since `generation` was read.
  pub fn put(&self, generation: u64, index: ClassificationIndex) -> Arc<ClassificationIndex> {
    let index = Arc::new(index);
    let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
    if slot.generation == generation {
      slot.current = Some((Instant::now(), index.clone()));
    }
    index
  }

  pub fn clear(&self) {
    let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
    slot.generation = slot.generation.wrapping_add(1);
    slot.current = None;
  }
}
