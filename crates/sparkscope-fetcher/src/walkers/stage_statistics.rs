//! Task metric distributions per stage at the fixed quantile set.

use serde::Deserialize;
use sparkscope_core::UrlBuilder;
use sparkscope_core::keys::app_id_from_stage_key;
use sparkscope_core::urls::TASK_QUANTILES;
use sparkscope_state::{IngestSession, Quantiles, StageStatistics};
use tracing::info;

use super::{StageIndex, WalkContext, decode, shape_error};
use crate::error::FetchResult;
use crate::pool::KeyMode;

const ENTITY: &str = "stage statistics";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Distributions {
    quantiles: Vec<f64>,
    executor_deserialize_time: Vec<f64>,
    executor_deserialize_cpu_time: Vec<f64>,
    executor_run_time: Vec<f64>,
    executor_cpu_time: Vec<f64>,
    result_size: Vec<f64>,
    jvm_gc_time: Vec<f64>,
    result_serialization_time: Vec<f64>,
    getting_result_time: Vec<f64>,
    scheduler_delay: Vec<f64>,
    peak_execution_memory: Vec<f64>,
    memory_bytes_spilled: Vec<f64>,
    disk_bytes_spilled: Vec<f64>,
    input_metrics: InputDistributions,
    output_metrics: OutputDistributions,
    shuffle_read_metrics: ShuffleReadDistributions,
    shuffle_write_metrics: ShuffleWriteDistributions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputDistributions {
    bytes_read: Vec<f64>,
    records_read: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputDistributions {
    bytes_written: Vec<f64>,
    records_written: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShuffleReadDistributions {
    read_bytes: Vec<f64>,
    read_records: Vec<f64>,
    remote_blocks_fetched: Vec<f64>,
    local_blocks_fetched: Vec<f64>,
    fetch_wait_time: Vec<f64>,
    remote_bytes_read: Vec<f64>,
    remote_bytes_read_to_disk: Vec<f64>,
    total_blocks_fetched: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShuffleWriteDistributions {
    write_bytes: Vec<f64>,
    write_records: Vec<f64>,
    write_time: Vec<f64>,
}

pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    stages: &StageIndex,
) -> FetchResult<usize> {
    let urls = ctx.stage_urls(stages, UrlBuilder::task_summary);
    let results = ctx.pool.fetch_all(urls, KeyMode::ByStage).await;

    let mut staged = 0;
    for (stage_key, payload) in &results {
        let Some(payload) = payload else { continue };
        let distributions: Distributions = decode(ENTITY, stage_key, payload)?;
        session.add(&statistics(stage_key, distributions)?)?;
        staged += 1;
    }

    info!(count = staged, "stage statistics staged");
    Ok(staged)
}

fn statistics(stage_key: &str, d: Distributions) -> FetchResult<StageStatistics> {
    let app_id = app_id_from_stage_key(stage_key)
        .ok_or_else(|| shape_error(ENTITY, stage_key, "malformed stage key"))?;
    let q = |name: &str, values: Vec<f64>| -> FetchResult<Quantiles> {
        values.try_into().map_err(|values: Vec<f64>| {
            shape_error(
                ENTITY,
                stage_key,
                format!(
                    "{name} has {} values, expected {}",
                    values.len(),
                    TASK_QUANTILES.len()
                ),
            )
        })
    };

    let quantiles = q("quantiles", d.quantiles)?;
    let matches_request = quantiles
        .iter()
        .zip(TASK_QUANTILES)
        .all(|(got, want)| (got - want).abs() < 1e-9);
    if !matches_request {
        return Err(shape_error(
            ENTITY,
            stage_key,
            format!("quantiles {quantiles:?} differ from requested {TASK_QUANTILES:?}"),
        ));
    }

    Ok(StageStatistics {
        stage_key: stage_key.to_string(),
        app_id,
        quantiles,
        executor_deserialize_time: q("executorDeserializeTime", d.executor_deserialize_time)?,
        executor_deserialize_cpu_time: q(
            "executorDeserializeCpuTime",
            d.executor_deserialize_cpu_time,
        )?,
        executor_run_time: q("executorRunTime", d.executor_run_time)?,
        executor_cpu_time: q("executorCpuTime", d.executor_cpu_time)?,
        result_size: q("resultSize", d.result_size)?,
        jvm_gc_time: q("jvmGcTime", d.jvm_gc_time)?,
        result_serialization_time: q("resultSerializationTime", d.result_serialization_time)?,
        getting_result_time: q("gettingResultTime", d.getting_result_time)?,
        scheduler_delay: q("schedulerDelay", d.scheduler_delay)?,
        peak_execution_memory: q("peakExecutionMemory", d.peak_execution_memory)?,
        memory_bytes_spilled: q("memoryBytesSpilled", d.memory_bytes_spilled)?,
        disk_bytes_spilled: q("diskBytesSpilled", d.disk_bytes_spilled)?,
        bytes_read: q("inputMetrics.bytesRead", d.input_metrics.bytes_read)?,
        records_read: q("inputMetrics.recordsRead", d.input_metrics.records_read)?,
        bytes_written: q("outputMetrics.bytesWritten", d.output_metrics.bytes_written)?,
        records_written: q("outputMetrics.recordsWritten", d.output_metrics.records_written)?,
        shuffle_read_bytes: q("shuffleReadMetrics.readBytes", d.shuffle_read_metrics.read_bytes)?,
        shuffle_read_records: q(
            "shuffleReadMetrics.readRecords",
            d.shuffle_read_metrics.read_records,
        )?,
        shuffle_remote_blocks_fetched: q(
            "shuffleReadMetrics.remoteBlocksFetched",
            d.shuffle_read_metrics.remote_blocks_fetched,
        )?,
        shuffle_local_blocks_fetched: q(
            "shuffleReadMetrics.localBlocksFetched",
            d.shuffle_read_metrics.local_blocks_fetched,
        )?,
        shuffle_fetch_wait_time: q(
            "shuffleReadMetrics.fetchWaitTime",
            d.shuffle_read_metrics.fetch_wait_time,
        )?,
        shuffle_remote_bytes_read: q(
            "shuffleReadMetrics.remoteBytesRead",
            d.shuffle_read_metrics.remote_bytes_read,
        )?,
        shuffle_remote_bytes_read_to_disk: q(
            "shuffleReadMetrics.remoteBytesReadToDisk",
            d.shuffle_read_metrics.remote_bytes_read_to_disk,
        )?,
        shuffle_total_blocks_fetched: q(
            "shuffleReadMetrics.totalBlocksFetched",
            d.shuffle_read_metrics.total_blocks_fetched,
        )?,
        shuffle_write_bytes: q(
            "shuffleWriteMetrics.writeBytes",
            d.shuffle_write_metrics.write_bytes,
        )?,
        shuffle_write_records: q(
            "shuffleWriteMetrics.writeRecords",
            d.shuffle_write_metrics.write_records,
        )?,
        shuffle_write_time: q("shuffleWriteMetrics.writeTime", d.shuffle_write_metrics.write_time)?,
    })
}
