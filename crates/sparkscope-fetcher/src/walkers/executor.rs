//! Executor walker: `/{app}/allexecutors`, including the driver.

use serde::Deserialize;
use serde_json::Value;
use sparkscope_core::json::{lookup_str, lookup_u64};
use sparkscope_core::keys::composite_key;
use sparkscope_state::{Executor, IngestSession, Timestamp};
use tracing::{debug, info};

use super::{WalkContext, decode, gmt_opt, rows};
use crate::error::FetchResult;
use crate::pool::KeyMode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutorSummary {
    id: String,
    host_port: Option<String>,
    is_active: bool,
    rdd_blocks: u64,
    memory_used: u64,
    disk_used: u64,
    total_cores: u32,
    max_tasks: u32,
    active_tasks: u32,
    failed_tasks: u32,
    #[serde(default)]
    completed_tasks: u32,
    #[serde(default)]
    total_tasks: u32,
    total_duration: u64,
    #[serde(rename = "totalGCTime")]
    total_gc_time: u64,
    total_input_bytes: u64,
    total_shuffle_read: u64,
    total_shuffle_write: u64,
    #[serde(default, alias = "isExcluded")]
    is_blacklisted: bool,
    max_memory: u64,
    #[serde(default, deserialize_with = "gmt_opt")]
    add_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "gmt_opt")]
    remove_time: Option<Timestamp>,
    remove_reason: Option<String>,
    #[serde(default, alias = "excludedInStages")]
    blacklisted_in_stages: Vec<u64>,
}

pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    app_ids: &[String],
) -> FetchResult<usize> {
    let urls = app_ids.iter().map(|id| ctx.urls.executors(id)).collect();
    let results = ctx.pool.fetch_all(urls, KeyMode::ByApp).await;

    let mut staged = 0;
    for (app_id, payload) in &results {
        let Some(payload) = payload else { continue };
        for raw in rows("executor list", app_id, payload)? {
            session.add(&executor(app_id, raw)?)?;
            staged += 1;
        }
        debug!(%app_id, "executors staged");
    }

    info!(count = staged, "executors staged");
    Ok(staged)
}

fn executor(app_id: &str, raw: &Value) -> FetchResult<Executor> {
    let summary: ExecutorSummary = decode("executor", app_id, raw)?;
    let memory = |name: &str| lookup_u64(raw, &["memoryMetrics", name]);
    let log = |name: &str| lookup_str(raw, &["executorLogs", name]).map(str::to_string);

    Ok(Executor {
        executor_key: composite_key(app_id, &summary.id),
        app_id: app_id.to_string(),
        placeholder: false,
        stdout_log: log("stdout"),
        stderr_log: log("stderr"),
        used_on_heap_storage_memory: memory("usedOnHeapStorageMemory"),
        used_off_heap_storage_memory: memory("usedOffHeapStorageMemory"),
        total_on_heap_storage_memory: memory("totalOnHeapStorageMemory"),
        total_off_heap_storage_memory: memory("totalOffHeapStorageMemory"),
        id: summary.id,
        host_port: summary.host_port,
        is_active: summary.is_active,
        rdd_blocks: summary.rdd_blocks,
        memory_used: summary.memory_used,
        disk_used: summary.disk_used,
        total_cores: summary.total_cores,
        max_tasks: summary.max_tasks,
        active_tasks: summary.active_tasks,
        failed_tasks: summary.failed_tasks,
        completed_tasks: summary.completed_tasks,
        total_tasks: summary.total_tasks,
        total_duration: summary.total_duration,
        total_gc_time: summary.total_gc_time,
        total_input_bytes: summary.total_input_bytes,
        total_shuffle_read: summary.total_shuffle_read,
        total_shuffle_write: summary.total_shuffle_write,
        is_blacklisted: summary.is_blacklisted,
        max_memory: summary.max_memory,
        add_time: summary.add_time,
        remove_time: summary.remove_time,
        remove_reason: summary.remove_reason,
        blacklisted_in_stages: summary.blacklisted_in_stages,
    })
}
