//! sparkscope-analyzer — turns stored telemetry into graded findings.
//!
//! Every analyzer reads one application's rows from the
//! [`StateStore`](sparkscope_state::StateStore) and yields at most one
//! [`Metric`] per [`MetricKind`]. [`Diagnostics`] keeps the ones that flag an
//! issue and computes the overall severity.
//!
//! # Architecture
//!
//! ```text
//! Diagnostics::run(store, app_id, thresholds)
//!   ├── StageAnalyzer      failed stages, skew, disk spill
//!   ├── JobAnalyzer        failed jobs
//!   ├── ExecutorAnalyzer   driver / executor GC share
//!   └── AppConfigAnalyzer  serializer, dynamic allocation, executors,
//!                          queue, memory, cores
//!         │
//!         ▼
//!   Metric { severity, summary, DetailsList }  ─►  Report (text / JSON)
//! ```

pub mod analyzers;
pub mod details;
pub mod diagnostics;
pub mod error;
pub mod metric;
pub mod properties;
pub mod report;
pub mod severity;
pub mod summary;
pub mod thresholds;

#[cfg(test)]
mod fixtures;

pub use analyzers::{AppConfigAnalyzer, ExecutorAnalyzer, JobAnalyzer, StageAnalyzer};
pub use details::{DetailsList, MetricDetails, Ranking};
pub use diagnostics::Diagnostics;
pub use error::{AnalyzerError, AnalyzerResult};
pub use metric::{Metric, MetricKind};
pub use report::{MetricView, Report};
pub use severity::Severity;
pub use summary::{AppSummary, ConfigSnapshot};
pub use thresholds::{Direction, IntervalThresholds, Thresholds};
