//! Telemetry entities persisted by the ingestion pipeline.
//!
//! Each entity stores its own composite key plus the keys of its parents, so
//! scoped queries never need to re-derive them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sparkscope_core::urls::{MAXIMUM, MEDIAN, TASK_QUANTILES};

pub type Timestamp = DateTime<Utc>;

/// Values at each of [`TASK_QUANTILES`], in that order.
pub type Quantiles = [f64; TASK_QUANTILES.len()];

pub const DRIVER_ID: &str = "driver";

// ── Application ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Client,
    Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub java_version: Option<String>,
    pub java_home: Option<String>,
    pub scala_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub app_id: String,
    pub name: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
    pub spark_user: String,
    pub completed: bool,
    pub mode: ExecutionMode,
    pub runtime: Option<RuntimeInfo>,
    /// Submitted configuration, in upstream order.
    pub spark_properties: Vec<(String, String)>,
    /// Driver command line (`sun.java.command`).
    pub spark_command: Option<String>,
}

impl Application {
    pub fn table_key(&self) -> String {
        self.app_id.clone()
    }

    /// Last value submitted for `key`, if any.
    pub fn spark_property(&self, key: &str) -> Option<&str> {
        self.spark_properties
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ── Executor ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Executor {
    pub executor_key: String,
    pub app_id: String,
    pub id: String,
    /// Inserted to satisfy a stage-level reference; carries no counters.
    pub placeholder: bool,
    pub host_port: Option<String>,
    pub is_active: bool,
    pub rdd_blocks: u64,
    pub memory_used: u64,
    pub disk_used: u64,
    pub total_cores: u32,
    pub max_tasks: u32,
    pub active_tasks: u32,
    pub failed_tasks: u32,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    /// Milliseconds spent running tasks.
    pub total_duration: u64,
    pub total_gc_time: u64,
    pub total_input_bytes: u64,
    pub total_shuffle_read: u64,
    pub total_shuffle_write: u64,
    pub is_blacklisted: bool,
    pub max_memory: u64,
    pub add_time: Option<Timestamp>,
    pub remove_time: Option<Timestamp>,
    pub remove_reason: Option<String>,
    pub stdout_log: Option<String>,
    pub stderr_log: Option<String>,
    pub used_on_heap_storage_memory: Option<u64>,
    pub used_off_heap_storage_memory: Option<u64>,
    pub total_on_heap_storage_memory: Option<u64>,
    pub total_off_heap_storage_memory: Option<u64>,
    pub blacklisted_in_stages: Vec<u64>,
}

impl Executor {
    pub fn table_key(&self) -> String {
        self.executor_key.clone()
    }

    /// Stub row for an executor seen only in a stage breakdown.
    pub fn placeholder(executor_key: String, app_id: &str, id: &str) -> Self {
        Self {
            executor_key,
            app_id: app_id.to_string(),
            id: id.to_string(),
            placeholder: true,
            ..Self::default()
        }
    }

    pub fn is_driver(&self) -> bool {
        self.id == DRIVER_ID
    }
}

// ── Job ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_key: String,
    pub app_id: String,
    pub job_id: u64,
    pub name: String,
    pub status: String,
    pub submission_time: Option<Timestamp>,
    pub completion_time: Option<Timestamp>,
    pub num_tasks: u64,
    pub num_active_tasks: u64,
    pub num_completed_tasks: u64,
    pub num_skipped_tasks: u64,
    pub num_failed_tasks: u64,
    pub num_killed_tasks: u64,
    pub num_completed_indices: u64,
    pub num_active_stages: u64,
    pub num_completed_stages: u64,
    pub num_skipped_stages: u64,
    pub num_failed_stages: u64,
    pub killed_tasks_summary: BTreeMap<String, u64>,
}

impl Job {
    pub fn table_key(&self) -> String {
        self.job_key.clone()
    }

    pub fn is_failed(&self) -> bool {
        is_failed_status(&self.status)
    }
}

// ── Stage ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub stage_key: String,
    pub app_id: String,
    pub job_key: String,
    pub stage_id: u64,
    pub attempt_id: u32,
    pub status: String,
    pub name: String,
    pub details: String,
    pub failure_reason: Option<String>,
    pub scheduling_pool: String,
    pub submission_time: Option<Timestamp>,
    pub first_task_launched_time: Option<Timestamp>,
    pub completion_time: Option<Timestamp>,
    pub num_tasks: u64,
    pub num_active_tasks: u64,
    pub num_complete_tasks: u64,
    pub num_failed_tasks: u64,
    pub num_killed_tasks: u64,
    pub num_completed_indices: u64,
    /// Milliseconds, summed over tasks.
    pub executor_run_time: u64,
    /// Nanoseconds, summed over tasks.
    pub executor_cpu_time: u64,
    pub input_bytes: u64,
    pub input_records: u64,
    pub output_bytes: u64,
    pub output_records: u64,
    pub shuffle_read_bytes: u64,
    pub shuffle_read_records: u64,
    pub shuffle_write_bytes: u64,
    pub shuffle_write_records: u64,
    pub memory_bytes_spilled: u64,
    pub disk_bytes_spilled: u64,
    pub rdd_ids: Vec<u64>,
    pub killed_tasks_summary: BTreeMap<String, u64>,
}

impl Stage {
    pub fn table_key(&self) -> String {
        self.stage_key.clone()
    }

    pub fn is_failed(&self) -> bool {
        is_failed_status(&self.status)
    }

    /// Largest of input, output, shuffle read and shuffle write bytes.
    pub fn max_io_bytes(&self) -> u64 {
        self.input_bytes
            .max(self.output_bytes)
            .max(self.shuffle_read_bytes)
            .max(self.shuffle_write_bytes)
    }
}

fn is_failed_status(status: &str) -> bool {
    matches!(status, "FAILED" | "KILLED")
}

// ── Stage statistics ───────────────────────────────────────────────

/// Task metric distributions for one stage at [`TASK_QUANTILES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatistics {
    pub stage_key: String,
    pub app_id: String,
    pub quantiles: Quantiles,
    pub executor_deserialize_time: Quantiles,
    pub executor_deserialize_cpu_time: Quantiles,
    pub executor_run_time: Quantiles,
    pub executor_cpu_time: Quantiles,
    pub result_size: Quantiles,
    pub jvm_gc_time: Quantiles,
    pub result_serialization_time: Quantiles,
    pub getting_result_time: Quantiles,
    pub scheduler_delay: Quantiles,
    pub peak_execution_memory: Quantiles,
    pub memory_bytes_spilled: Quantiles,
    pub disk_bytes_spilled: Quantiles,
    pub bytes_read: Quantiles,
    pub records_read: Quantiles,
    pub bytes_written: Quantiles,
    pub records_written: Quantiles,
    pub shuffle_read_bytes: Quantiles,
    pub shuffle_read_records: Quantiles,
    pub shuffle_remote_blocks_fetched: Quantiles,
    pub shuffle_local_blocks_fetched: Quantiles,
    pub shuffle_fetch_wait_time: Quantiles,
    pub shuffle_remote_bytes_read: Quantiles,
    pub shuffle_remote_bytes_read_to_disk: Quantiles,
    pub shuffle_total_blocks_fetched: Quantiles,
    pub shuffle_write_bytes: Quantiles,
    pub shuffle_write_records: Quantiles,
    pub shuffle_write_time: Quantiles,
}

impl StageStatistics {
    pub fn table_key(&self) -> String {
        self.stage_key.clone()
    }
}

pub fn median(values: &Quantiles) -> f64 {
    values[MEDIAN]
}

pub fn maximum(values: &Quantiles) -> f64 {
    values[MAXIMUM]
}

// ── Stage executor ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExecutor {
    pub stage_executor_key: String,
    pub stage_key: String,
    pub app_id: String,
    pub executor_key: String,
    pub executor_id: String,
    pub task_time: u64,
    pub failed_tasks: u64,
    pub succeeded_tasks: u64,
    pub killed_tasks: u64,
    pub input_bytes: u64,
    pub input_records: u64,
    pub output_bytes: u64,
    pub output_records: u64,
    pub shuffle_read: u64,
    pub shuffle_read_records: u64,
    pub shuffle_write: u64,
    pub shuffle_write_records: u64,
    pub memory_bytes_spilled: u64,
    pub disk_bytes_spilled: u64,
    pub is_blacklisted_for_stage: bool,
}

impl StageExecutor {
    pub fn table_key(&self) -> String {
        self.stage_executor_key.clone()
    }
}

// ── Task ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_key: String,
    pub stage_key: String,
    pub app_id: String,
    pub executor_key: String,
    pub task_id: u64,
    pub index: u64,
    pub attempt: u32,
    pub launch_time: Option<Timestamp>,
    pub duration: u64,
    pub host: String,
    pub status: String,
    pub task_locality: String,
    pub speculative: bool,
    pub error_message: Option<String>,
    pub executor_deserialize_time: u64,
    pub executor_deserialize_cpu_time: u64,
    pub executor_run_time: u64,
    pub executor_cpu_time: u64,
    pub result_size: u64,
    pub jvm_gc_time: u64,
    pub result_serialization_time: u64,
    pub memory_bytes_spilled: u64,
    pub disk_bytes_spilled: u64,
    pub peak_execution_memory: u64,
    pub bytes_read: u64,
    pub records_read: u64,
    pub bytes_written: u64,
    pub records_written: u64,
    pub shuffle_remote_blocks_fetched: u64,
    pub shuffle_local_blocks_fetched: u64,
    pub shuffle_fetch_wait_time: u64,
    pub shuffle_remote_bytes_read: u64,
    pub shuffle_remote_bytes_read_to_disk: u64,
    pub shuffle_local_bytes_read: u64,
    pub shuffle_records_read: u64,
    pub shuffle_bytes_written: u64,
    pub shuffle_write_time: u64,
    pub shuffle_records_written: u64,
}

impl Task {
    pub fn table_key(&self) -> String {
        self.task_key.clone()
    }
}
