//! sparkscope-fetcher — history server ingestion for Sparkscope.
//!
//! Walks the history server's REST tree for every new application and
//! stages the normalized rows in one [`IngestSession`](sparkscope_state::IngestSession),
//! committed at the end of the run or rolled back on the first run-level
//! error.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator::run(mode)
//!   ├── watermark(store)           latest end time + 1ms
//!   ├── walkers, in order, each fanning out through FetchPool
//!   │     application ─► executor ─► job ─► stage
//!   │                                  │       │
//!   │                       StageOwnership   StageIndex
//!   │                                          ├── stage_executor
//!   │                                          ├── stage_statistics
//!   │                                          └── task
//!   └── IngestSession::commit()    or rollback() on error
//!
//! FetchPool
//!   ├── one reqwest::Client per worker
//!   ├── shared URL queue drained by a JoinSet
//!   └── BTreeMap<key, Option<Value>>   failed URLs map to None
//! ```

pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod walkers;

pub use error::{FetchError, FetchResult};
pub use orchestrator::{IngestReport, Orchestrator, SyncMode, format_watermark, watermark};
pub use pool::{FetchPool, FetchResults, KeyMode, Payload};
