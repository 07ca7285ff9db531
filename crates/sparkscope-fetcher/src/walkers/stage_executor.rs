//! Per-(stage, executor) breakdown from the stage detail payload.

use serde::Deserialize;
use serde_json::Value;
use sparkscope_core::UrlBuilder;
use sparkscope_core::json::lookup;
use sparkscope_core::keys::{app_id_from_stage_key, composite_key};
use sparkscope_state::{Executor, IngestSession, StageExecutor};
use tracing::{debug, info};

use super::{StageIndex, WalkContext, decode, shape_error};
use crate::error::FetchResult;
use crate::pool::KeyMode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutorStageSummary {
    task_time: u64,
    failed_tasks: u64,
    succeeded_tasks: u64,
    #[serde(default)]
    killed_tasks: u64,
    input_bytes: u64,
    input_records: u64,
    output_bytes: u64,
    output_records: u64,
    shuffle_read: u64,
    shuffle_read_records: u64,
    shuffle_write: u64,
    shuffle_write_records: u64,
    memory_bytes_spilled: u64,
    disk_bytes_spilled: u64,
    #[serde(default, alias = "isExcludedForStage")]
    is_blacklisted_for_stage: bool,
}

pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    stages: &StageIndex,
) -> FetchResult<usize> {
    let urls = ctx.stage_urls(stages, UrlBuilder::stage_detail);
    let results = ctx.pool.fetch_all(urls, KeyMode::ByStage).await;

    let mut staged = 0;
    let mut placeholders = 0;
    for (stage_key, payload) in &results {
        let Some(payload) = payload else { continue };
        let app_id = app_id_from_stage_key(stage_key)
            .ok_or_else(|| shape_error("stage detail", stage_key, "malformed stage key"))?;
        let Some(summaries) = lookup(payload, &["executorSummary"]).and_then(Value::as_object)
        else {
            debug!(%stage_key, "stage detail has no executor summary");
            continue;
        };

        for (executor_id, raw) in summaries {
            let summary: ExecutorStageSummary = decode("stage executor", stage_key, raw)?;
            let executor_key = composite_key(&app_id, executor_id);
            if !session.contains::<Executor>(&executor_key) {
                debug!(%executor_key, %stage_key, "inserting placeholder executor");
                session.add(&Executor::placeholder(executor_key.clone(), &app_id, executor_id))?;
                placeholders += 1;
            }
            session.add(&stage_executor(
                stage_key,
                &app_id,
                executor_id,
                executor_key,
                summary,
            ))?;
            staged += 1;
        }
    }

    info!(count = staged, placeholders, "stage executors staged");
    Ok(staged)
}

fn stage_executor(
    stage_key: &str,
    app_id: &str,
    executor_id: &str,
    executor_key: String,
    summary: ExecutorStageSummary,
) -> StageExecutor {
    StageExecutor {
        stage_executor_key: composite_key(stage_key, executor_id),
        stage_key: stage_key.to_string(),
        app_id: app_id.to_string(),
        executor_key,
        executor_id: executor_id.to_string(),
        task_time: summary.task_time,
        failed_tasks: summary.failed_tasks,
        succeeded_tasks: summary.succeeded_tasks,
        killed_tasks: summary.killed_tasks,
        input_bytes: summary.input_bytes,
        input_records: summary.input_records,
        output_bytes: summary.output_bytes,
        output_records: summary.output_records,
        shuffle_read: summary.shuffle_read,
        shuffle_read_records: summary.shuffle_read_records,
        shuffle_write: summary.shuffle_write,
        shuffle_write_records: summary.shuffle_write_records,
        memory_bytes_spilled: summary.memory_bytes_spilled,
        disk_bytes_spilled: summary.disk_bytes_spilled,
        is_blacklisted_for_stage: summary.is_blacklisted_for_stage,
    }
}
