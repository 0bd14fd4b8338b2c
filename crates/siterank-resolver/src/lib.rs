//! Page-rank resolution and synchronisation engine.
//!
//! [`PageRankResolver`] answers "what is the classification of URL X" by
//! walking the candidate keys of the normalised URL against a cached snapshot
//! of the durable store, falling back to the upstream provider on a miss.
//! [`SyncScheduler`] keeps the durable store current by paging through the
//! provider's changed classifications.
//!
//! Both are generic over the collaborator traits in [`siterank_core`].

pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod outcome;
pub mod resolver;
pub mod sync;
pub mod write;

pub use cache::MemoryCache;
pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use index::ClassificationIndex;
pub use outcome::{Outcome, Persisted, SkipReason};
pub use resolver::PageRankResolver;
pub use sync::{SyncReport, SyncScheduler};
pub use write::RankWriter;

#[cfg(test)]
mod tests;
