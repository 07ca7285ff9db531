//! Stage walker. Only the first attempt of each stage becomes a row.

use std::collections::BTreeMap;

use serde::Deserialize;
use sparkscope_core::keys::composite_key;
use sparkscope_state::{IngestSession, Stage, Timestamp};
use tracing::{debug, info};

use super::{StageIndex, StageOwnership, WalkContext, decode, gmt_opt, rows};
use crate::error::{FetchError, FetchResult};
use crate::pool::KeyMode;

const CANONICAL_ATTEMPT: u32 = 0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageData {
    status: String,
    stage_id: u64,
    attempt_id: u32,
    num_tasks: u64,
    num_active_tasks: u64,
    num_complete_tasks: u64,
    num_failed_tasks: u64,
    num_killed_tasks: u64,
    num_completed_indices: u64,
    executor_run_time: u64,
    executor_cpu_time: u64,
    #[serde(default, deserialize_with = "gmt_opt")]
    submission_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "gmt_opt")]
    first_task_launched_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "gmt_opt")]
    completion_time: Option<Timestamp>,
    failure_reason: Option<String>,
    input_bytes: u64,
    input_records: u64,
    output_bytes: u64,
    output_records: u64,
    shuffle_read_bytes: u64,
    shuffle_read_records: u64,
    shuffle_write_bytes: u64,
    shuffle_write_records: u64,
    memory_bytes_spilled: u64,
    disk_bytes_spilled: u64,
    name: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    scheduling_pool: String,
    #[serde(default)]
    rdd_ids: Vec<u64>,
    #[serde(default)]
    killed_tasks_summary: BTreeMap<String, u64>,
}

/// Stage every first-attempt stage. Returns the persisted stage ids per app.
pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    app_ids: &[String],
    ownership: &StageOwnership,
) -> FetchResult<StageIndex> {
    let urls = app_ids.iter().map(|id| ctx.urls.stages(id)).collect();
    let results = ctx.pool.fetch_all(urls, KeyMode::ByApp).await;

    let mut index = StageIndex::new();
    for (app_id, payload) in &results {
        let Some(payload) = payload else { continue };
        for raw in rows("stage list", app_id, payload)? {
            let data: StageData = decode("stage", app_id, raw)?;
            let stage_key = composite_key(app_id, data.stage_id);
            let job_key = ownership
                .owner(&stage_key)
                .ok_or_else(|| FetchError::UnclaimedStage(stage_key.clone()))?
                .to_string();
            if data.attempt_id != CANONICAL_ATTEMPT {
                debug!(%stage_key, attempt = data.attempt_id, "skipping stage retry");
                continue;
            }
            index.entry(app_id.clone()).or_default().push(data.stage_id);
            session.add(&stage(app_id, stage_key, job_key, data))?;
        }
    }

    for ids in index.values_mut() {
        ids.sort_unstable();
        ids.dedup();
    }
    let staged: usize = index.values().map(Vec::len).sum();
    info!(count = staged, "stages staged");
    Ok(index)
}

fn stage(app_id: &str, stage_key: String, job_key: String, data: StageData) -> Stage {
    Stage {
        stage_key,
        app_id: app_id.to_string(),
        job_key,
        stage_id: data.stage_id,
        attempt_id: data.attempt_id,
        status: data.status,
        name: data.name,
        details: data.details,
        failure_reason: data.failure_reason,
        scheduling_pool: data.scheduling_pool,
        submission_time: data.submission_time,
        first_task_launched_time: data.first_task_launched_time,
        completion_time: data.completion_time,
        num_tasks: data.num_tasks,
        num_active_tasks: data.num_active_tasks,
        num_complete_tasks: data.num_complete_tasks,
        num_failed_tasks: data.num_failed_tasks,
        num_killed_tasks: data.num_killed_tasks,
        num_completed_indices: data.num_completed_indices,
        executor_run_time: data.executor_run_time,
        executor_cpu_time: data.executor_cpu_time,
        input_bytes: data.input_bytes,
        input_records: data.input_records,
        output_bytes: data.output_bytes,
        output_records: data.output_records,
        shuffle_read_bytes: data.shuffle_read_bytes,
        shuffle_read_records: data.shuffle_read_records,
        shuffle_write_bytes: data.shuffle_write_bytes,
        shuffle_write_records: data.shuffle_write_records,
        memory_bytes_spilled: data.memory_bytes_spilled,
        disk_bytes_spilled: data.disk_bytes_spilled,
        rdd_ids: data.rdd_ids,
        killed_tasks_summary: data.killed_tasks_summary,
    }
}
