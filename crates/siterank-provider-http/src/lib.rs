//! `siterank-provider-http`: the classification provider over HTTP.
//!
//! Every request goes to `{base_url}/api/v{n}{path}`; the API version is a
//! per-call argument, never client state.

mod client;
mod config;
pub mod error;

pub use client::HttpProvider;
pub use config::ProviderConfig;
pub use error::{Error, Result};
