//! redb table definitions for the Sparkscope telemetry store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized entities).
//! Keys are the composite keys from `sparkscope_core::keys`, so every row of
//! one application sorts under the `{app_id}_` prefix.

use redb::TableDefinition;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::*;

pub type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Applications keyed by `{app_id}`.
pub const APPLICATIONS: Table = <Application as Record>::TABLE;

/// Executors keyed by `{app_id}_{executor_id}`.
pub const EXECUTORS: Table = <Executor as Record>::TABLE;

/// Jobs keyed by `{app_id}_{job_id}`.
pub const JOBS: Table = <Job as Record>::TABLE;

/// Stages keyed by `{app_id}_{stage_id}`.
pub const STAGES: Table = <Stage as Record>::TABLE;

/// Stage statistics keyed by their stage key.
pub const STAGE_STATISTICS: Table = <StageStatistics as Record>::TABLE;

/// Stage executors keyed by `{stage_key}_{executor_id}`.
pub const STAGE_EXECUTORS: Table = <StageExecutor as Record>::TABLE;

/// Tasks keyed by `{stage_key}_{task_id}`.
pub const TASKS: Table = <Task as Record>::TABLE;

pub const ALL_TABLES: [Table; 7] = [
    APPLICATIONS,
    EXECUTORS,
    JOBS,
    STAGES,
    STAGE_STATISTICS,
    STAGE_EXECUTORS,
    TASKS,
];

/// An entity stored as one row of a fixed table.
pub trait Record: Serialize + DeserializeOwned {
    const NAME: &'static str;
    const TABLE: Table = TableDefinition::new(Self::NAME);

    fn table_key(&self) -> String;

    /// Owning application, used to filter prefix scans.
    fn app_id(&self) -> &str;
}

macro_rules! record {
    ($ty:ty, $name:literal) => {
        impl Record for $ty {
            const NAME: &'static str = $name;

            fn table_key(&self) -> String {
                <$ty>::table_key(self)
            }

            fn app_id(&self) -> &str {
                &self.app_id
            }
        }
    };
}

record!(Application, "applications");
record!(Executor, "executors");
record!(Job, "jobs");
record!(Stage, "stages");
record!(StageStatistics, "stage_statistics");
record!(StageExecutor, "stage_executors");
record!(Task, "tasks");
