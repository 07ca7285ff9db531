//! sparkscope-core — shared building blocks for Sparkscope.
//!
//! Holds everything the ingestion pipeline and the diagnostics engine
//! agree on without touching the network or the store:
//!
//! - [`config`] — `sparkscope.toml` model with per-section defaults
//! - [`keys`] — composite resource keys derived from URLs and id pairs
//! - [`urls`] — history server URL shapes, including the fixed quantile set
//! - [`json`] — optional nested lookups into loosely shaped payloads
//! - [`units`] — byte-size / boolean parsing and human-readable formatting

pub mod config;
pub mod json;
pub mod keys;
pub mod units;
pub mod urls;

pub use config::{ConfigError, SparkscopeConfig};
pub use keys::KeyCodec;
pub use urls::UrlBuilder;
