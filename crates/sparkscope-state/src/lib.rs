//! sparkscope-state — embedded telemetry store for Sparkscope.
//!
//! Backed by [redb](https://docs.rs/redb), holds applications and everything
//! ingested beneath them: executors, jobs, stages, stage statistics, stage
//! executors and tasks.
//!
//! # Architecture
//!
//! ```text
//! StateStore (Arc<Database>, Clone + Send + Sync)
//!   ├── typed reads scoped to one app or one stage
//!   └── begin_ingest() ─► IngestSession
//!                           ├── add(record)   staged in memory
//!                           ├── commit()      one write transaction
//!                           └── rollback()    drop everything
//! ```
//!
//! All entities are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{app_id}_{id}`, `{stage_key}_{id}`) keep every row of
//! one application under a common prefix.

pub mod error;
pub mod session;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use session::IngestSession;
pub use store::StateStore;
pub use tables::Record;
pub use types::*;
