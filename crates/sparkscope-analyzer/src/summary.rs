//! Basic figures shown next to an application's diagnostics.

use serde::Serialize;
use sparkscope_core::config::AppConfigThresholds;
use sparkscope_state::{Application, StateStore};

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::properties::{self as keys, SparkProperties};

/// Totals over everything stored for one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSummary {
    pub app_id: String,
    pub name: String,
    /// Milliseconds.
    pub duration: u64,
    /// Nanoseconds, summed over stages.
    pub executor_cpu_time: u64,
    /// Milliseconds, summed over stages.
    pub executor_run_time: u64,
    pub tasks: u64,
    pub jobs: usize,
    pub stages: usize,
    /// Executors that ran tasks, excluding the driver.
    pub executors: usize,
    /// Milliseconds, driver included.
    pub total_gc_time: u64,
}

impl AppSummary {
    pub fn compute(store: &StateStore, app_id: &str) -> AnalyzerResult<Self> {
        let app = store
            .get_application(app_id)?
            .ok_or_else(|| AnalyzerError::AppNotFound(app_id.to_string()))?;
        let stages = store.list_stages(app_id)?;
        let jobs = store.list_jobs(app_id)?;
        let executors = store.list_executors(app_id)?;

        Ok(Self {
            app_id: app.app_id,
            name: app.name,
            duration: app.duration,
            executor_cpu_time: stages.iter().map(|s| s.executor_cpu_time).sum(),
            executor_run_time: stages.iter().map(|s| s.executor_run_time).sum(),
            tasks: stages.iter().map(|s| s.num_tasks).sum(),
            jobs: jobs.len(),
            stages: stages.len(),
            executors: executors
                .iter()
                .filter(|e| !e.is_driver() && !e.placeholder)
                .count(),
            total_gc_time: executors.iter().map(|e| e.total_gc_time).sum(),
        })
    }
}

/// The resource settings an application ran with, defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub driver_memory: u64,
    pub driver_memory_overhead: u64,
    pub driver_cores: u64,
    pub executor_memory: u64,
    pub executor_memory_overhead: u64,
    pub executor_cores: u64,
    pub executor_instances: Option<u64>,
    pub dynamic_allocation: bool,
    pub min_executors: Option<u64>,
    pub max_executors: Option<u64>,
    pub serializer: String,
    pub queue: Option<String>,
}

impl ConfigSnapshot {
    /// Unset overheads use the same fallback as the memory check.
    pub fn of(app: &Application, thresholds: &AppConfigThresholds) -> Self {
        let props = SparkProperties::new(app);
        let fraction = thresholds.overhead_fraction;
        let floor = thresholds.overhead_floor.bytes();
        let driver_memory = props.bytes(keys::DRIVER_MEMORY, keys::DEFAULT_MEMORY);
        let executor_memory = props.bytes(keys::EXECUTOR_MEMORY, keys::DEFAULT_MEMORY);

        Self {
            driver_memory,
            driver_memory_overhead: props.overhead(
                keys::DRIVER_MEMORY_OVERHEAD,
                driver_memory,
                fraction,
                floor,
            ),
            driver_cores: props.count(keys::DRIVER_CORES).unwrap_or(keys::DEFAULT_CORES),
            executor_memory,
            executor_memory_overhead: props.overhead(
                keys::EXECUTOR_MEMORY_OVERHEAD,
                executor_memory,
                fraction,
                floor,
            ),
            executor_cores: props.count(keys::EXECUTOR_CORES).unwrap_or(keys::DEFAULT_CORES),
            executor_instances: props.count(keys::EXECUTOR_INSTANCES),
            dynamic_allocation: props.flag(keys::DYNAMIC_ALLOCATION),
            min_executors: props.count(keys::MIN_EXECUTORS),
            max_executors: props.count(keys::MAX_EXECUTORS),
            serializer: props.serializer().to_string(),
            queue: props.queue().map(str::to_string),
        }
    }
}
