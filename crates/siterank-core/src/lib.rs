//! Core types and trait definitions for the siterank page-rank engine.
//!
//! Holds the classification data model, URL normalisation, and the
//! collaborator traits the resolver is generic over. No HTTP or database code
//! lives here.

#![allow(async_fn_in_trait)]

pub mod cache;
pub mod normalize;
pub mod provider;
pub mod record;
pub mod store;

pub use provider::ApiVersion;
pub use record::{ClassificationRecord, INFO_UNKNOWN, PageRank};
