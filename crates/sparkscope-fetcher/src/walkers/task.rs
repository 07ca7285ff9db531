//! Task walker: the longest-running tasks of each stage, up to the task limit.

use serde::Deserialize;
use sparkscope_core::keys::{app_id_from_stage_key, composite_key};
use sparkscope_state::{IngestSession, Task, Timestamp};
use tracing::info;

use super::{StageIndex, WalkContext, decode, gmt_opt, rows, shape_error};
use crate::error::FetchResult;
use crate::pool::KeyMode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskData {
    task_id: u64,
    index: u64,
    attempt: u32,
    #[serde(default, deserialize_with = "gmt_opt")]
    launch_time: Option<Timestamp>,
    #[serde(default)]
    duration: u64,
    executor_id: String,
    host: String,
    status: String,
    task_locality: String,
    speculative: bool,
    error_message: Option<String>,
    /// Absent for tasks that never reported metrics.
    #[serde(default)]
    task_metrics: TaskMetrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaskMetrics {
    executor_deserialize_time: u64,
    executor_deserialize_cpu_time: u64,
    executor_run_time: u64,
    executor_cpu_time: u64,
    result_size: u64,
    jvm_gc_time: u64,
    result_serialization_time: u64,
    memory_bytes_spilled: u64,
    disk_bytes_spilled: u64,
    peak_execution_memory: u64,
    input_metrics: InputMetrics,
    output_metrics: OutputMetrics,
    shuffle_read_metrics: ShuffleReadMetrics,
    shuffle_write_metrics: ShuffleWriteMetrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InputMetrics {
    bytes_read: u64,
    records_read: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OutputMetrics {
    bytes_written: u64,
    records_written: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ShuffleReadMetrics {
    remote_blocks_fetched: u64,
    local_blocks_fetched: u64,
    fetch_wait_time: u64,
    remote_bytes_read: u64,
    remote_bytes_read_to_disk: u64,
    local_bytes_read: u64,
    records_read: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ShuffleWriteMetrics {
    bytes_written: u64,
    write_time: u64,
    records_written: u64,
}

pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    stages: &StageIndex,
) -> FetchResult<usize> {
    let limit = ctx.task_limit;
    let urls = ctx.stage_urls(stages, |urls, app_id, stage_id| {
        urls.task_list(app_id, stage_id, limit)
    });
    let results = ctx.pool.fetch_all(urls, KeyMode::ByStage).await;

    let mut staged = 0;
    for (stage_key, payload) in &results {
        let Some(payload) = payload else { continue };
        let app_id = app_id_from_stage_key(stage_key)
            .ok_or_else(|| shape_error("task list", stage_key, "malformed stage key"))?;
        for raw in rows("task list", stage_key, payload)? {
            let data: TaskData = decode("task", stage_key, raw)?;
            session.add(&task(stage_key, &app_id, data))?;
            staged += 1;
        }
    }

    info!(count = staged, limit, "tasks staged");
    Ok(staged)
}

fn task(stage_key: &str, app_id: &str, data: TaskData) -> Task {
    let m = data.task_metrics;
    Task {
        task_key: composite_key(stage_key, data.task_id),
        stage_key: stage_key.to_string(),
        app_id: app_id.to_string(),
        executor_key: composite_key(app_id, &data.executor_id),
        task_id: data.task_id,
        index: data.index,
        attempt: data.attempt,
        launch_time: data.launch_time,
        duration: data.duration,
        host: data.host,
        status: data.status,
        task_locality: data.task_locality,
        speculative: data.speculative,
        error_message: data.error_message,
        executor_deserialize_time: m.executor_deserialize_time,
        executor_deserialize_cpu_time: m.executor_deserialize_cpu_time,
        executor_run_time: m.executor_run_time,
        executor_cpu_time: m.executor_cpu_time,
        result_size: m.result_size,
        jvm_gc_time: m.jvm_gc_time,
        result_serialization_time: m.result_serialization_time,
        memory_bytes_spilled: m.memory_bytes_spilled,
        disk_bytes_spilled: m.disk_bytes_spilled,
        peak_execution_memory: m.peak_execution_memory,
        bytes_read: m.input_metrics.bytes_read,
        records_read: m.input_metrics.records_read,
        bytes_written: m.output_metrics.bytes_written,
        records_written: m.output_metrics.records_written,
        shuffle_remote_blocks_fetched: m.shuffle_read_metrics.remote_blocks_fetched,
        shuffle_local_blocks_fetched: m.shuffle_read_metrics.local_blocks_fetched,
        shuffle_fetch_wait_time: m.shuffle_read_metrics.fetch_wait_time,
        shuffle_remote_bytes_read: m.shuffle_read_metrics.remote_bytes_read,
        shuffle_remote_bytes_read_to_disk: m.shuffle_read_metrics.remote_bytes_read_to_disk,
        shuffle_local_bytes_read: m.shuffle_read_metrics.local_bytes_read,
        shuffle_records_read: m.shuffle_read_metrics.records_read,
        shuffle_bytes_written: m.shuffle_write_metrics.bytes_written,
        shuffle_write_time: m.shuffle_write_metrics.write_time,
        shuffle_records_written: m.shuffle_write_metrics.records_written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_without_metrics() {
        let data: TaskData = decode(
            "task",
            "app-1_2",
            &json!({
                "taskId": 17, "index": 3, "attempt": 1,
                "launchTime": "2020-10-23T12:00:01.500GMT",
                "executorId": "4", "host": "node-4", "status": "FAILED",
                "taskLocality": "PROCESS_LOCAL", "speculative": false,
                "errorMessage": "ExecutorLostFailure"
            }),
        )
        .unwrap();
        let task = task("app-1_2", "app-1", data);
        assert_eq!(task.task_key, "app-1_2_17");
        assert_eq!(task.executor_key, "app-1_4");
        assert_eq!(task.duration, 0);
        assert_eq!(task.memory_bytes_spilled, 0);
        assert_eq!(task.error_message.as_deref(), Some("ExecutorLostFailure"));
    }

    #[test]
    fn nested_metrics_flatten() {
        let data: TaskData = decode(
            "task",
            "app-1_2",
            &json!({
                "taskId": 1, "index": 1, "attempt": 0, "duration": 5000,
                "executorId": "1", "host": "node-1", "status": "SUCCESS",
                "taskLocality": "NODE_LOCAL", "speculative": true,
                "taskMetrics": {
                    "executorRunTime": 4800, "jvmGcTime": 300, "memoryBytesSpilled": 4096,
                    "inputMetrics": {"bytesRead": 1000, "recordsRead": 10},
                    "shuffleReadMetrics": {"localBytesRead": 77, "recordsRead": 5},
                    "shuffleWriteMetrics": {"bytesWritten": 88, "writeTime": 9, "recordsWritten": 2}
                }
            }),
        )
        .unwrap();
        let task = task("app-1_2", "app-1", data);
        assert!(task.speculative);
        assert_eq!(task.executor_run_time, 4800);
        assert_eq!(task.bytes_read, 1000);
        assert_eq!(task.shuffle_local_bytes_read, 77);
        assert_eq!(task.shuffle_records_read, 5);
        assert_eq!(task.shuffle_bytes_written, 88);
        assert_eq!(task.bytes_written, 0);
    }
}
