//! End-to-end ingestion against a stub history server, followed by analysis
//! of what was stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use sparkscope_analyzer::{Diagnostics, MetricKind, Severity};
use sparkscope_core::SparkscopeConfig;
use sparkscope_fetcher::{FetchError, Orchestrator, SyncMode};
use sparkscope_state::{Application, Job, StateStore};

const APP_ID: &str = "app-20201023-0001";
const END_TIME: &str = "2020-10-23T12:34:56.012GMT";

#[derive(Default)]
struct Stub {
    /// Query strings of every application listing request.
    listings: Mutex<Vec<HashMap<String, String>>>,
    /// When set, no job claims stage 1.
    orphan_stage: bool,
}

type Shared = Arc<Stub>;

fn router(stub: Shared) -> Router {
    Router::new()
        .route("/api/v1/applications", get(listing))
        .route("/api/v1/applications/{app}/environment", get(environment))
        .route("/api/v1/applications/{app}/allexecutors", get(executors))
        .route("/api/v1/applications/{app}/jobs", get(jobs))
        .route("/api/v1/applications/{app}/stages", get(stages))
        .route("/api/v1/applications/{app}/stages/{stage}/0", get(stage_detail))
        .route(
            "/api/v1/applications/{app}/stages/{stage}/0/taskSummary",
            get(task_summary),
        )
        .route(
            "/api/v1/applications/{app}/stages/{stage}/0/taskList",
            get(task_list),
        )
        .with_state(stub)
}

async fn serve(stub: Shared) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(stub)).await.unwrap();
    });
    format!("http://{addr}/api/v1/applications")
}

// ── Stub handlers ──────────────────────────────────────────────────

/// Timestamps share one fixed-width format, so string order is time order.
async fn listing(
    State(stub): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let visible = params
        .get("minEndDate")
        .is_none_or(|since| since.as_str() <= END_TIME);
    stub.listings.lock().unwrap().push(params);
    if !visible {
        return Json(json!([]));
    }
    Json(json!([{
        "id": APP_ID,
        "name": "nightly-etl",
        "attempts": [{
            "startTime": "2020-10-23T12:24:56.012GMT",
            "endTime": END_TIME,
            "duration": 600000,
            "sparkUser": "spark",
            "completed": true
        }]
    }]))
}

async fn environment(Path(_app): Path<String>) -> Json<Value> {
    Json(json!({
        "runtime": {"javaVersion": "1.8.0_252", "scalaVersion": "version 2.12.10"},
        "sparkProperties": [
            ["spark.executor.memory", "2g"],
            ["spark.executor.cores", "2"]
        ],
        "systemProperties": [
            ["sun.java.command", "org.apache.spark.deploy.SparkSubmit --class Etl etl.jar"]
        ]
    }))
}

fn executor_json(id: &str, duration: u64, gc: u64) -> Value {
    json!({
        "id": id,
        "hostPort": "10.0.0.5:40000",
        "isActive": false,
        "rddBlocks": 0,
        "memoryUsed": 0,
        "diskUsed": 0,
        "totalCores": 2,
        "maxTasks": 2,
        "activeTasks": 0,
        "failedTasks": 0,
        "completedTasks": 10,
        "totalTasks": 10,
        "totalDuration": duration,
        "totalGCTime": gc,
        "totalInputBytes": 1000,
        "totalShuffleRead": 0,
        "totalShuffleWrite": 0,
        "isBlacklisted": false,
        "maxMemory": 1073741824,
        "addTime": "2020-10-23T12:25:00.000GMT"
    })
}

async fn executors(Path(_app): Path<String>) -> Json<Value> {
    Json(json!([
        executor_json("driver", 600000, 12000),
        executor_json("1", 100000, 6000),
    ]))
}

fn job_json(job_id: u64, status: &str, stage_ids: &[u64]) -> Value {
    json!({
        "jobId": job_id,
        "name": format!("job {job_id}"),
        "submissionTime": "2020-10-23T12:25:00.000GMT",
        "stageIds": stage_ids,
        "status": status,
        "numTasks": 10,
        "numActiveTasks": 0,
        "numCompletedTasks": 10,
        "numSkippedTasks": 0,
        "numFailedTasks": 0,
        "numKilledTasks": 0,
        "numCompletedIndices": 10,
        "numActiveStages": 0,
        "numCompletedStages": 1,
        "numSkippedStages": 0,
        "numFailedStages": 0
    })
}

async fn jobs(State(stub): State<Shared>, Path(_app): Path<String>) -> Json<Value> {
    let second: &[u64] = if stub.orphan_stage { &[] } else { &[1] };
    Json(json!([
        job_json(0, "FAILED", &[0]),
        job_json(1, "SUCCEEDED", second),
    ]))
}

fn stage_json(stage_id: u64, attempt_id: u32, status: &str, spilled: u64) -> Value {
    json!({
        "status": status,
        "stageId": stage_id,
        "attemptId": attempt_id,
        "numTasks": 10,
        "numActiveTasks": 0,
        "numCompleteTasks": 10,
        "numFailedTasks": 0,
        "numKilledTasks": 0,
        "numCompletedIndices": 10,
        "executorRunTime": 1000,
        "executorCpuTime": 900000000,
        "submissionTime": "2020-10-23T12:25:00.000GMT",
        "inputBytes": 1000,
        "inputRecords": 10,
        "outputBytes": 0,
        "outputRecords": 0,
        "shuffleReadBytes": 0,
        "shuffleReadRecords": 0,
        "shuffleWriteBytes": 0,
        "shuffleWriteRecords": 0,
        "memoryBytesSpilled": spilled,
        "diskBytesSpilled": spilled / 2,
        "name": format!("stage {stage_id}")
    })
}

async fn stages(Path(_app): Path<String>) -> Json<Value> {
    Json(json!([
        stage_json(0, 0, "FAILED", 0),
        stage_json(0, 1, "COMPLETE", 0),
        stage_json(1, 0, "COMPLETE", 1000),
    ]))
}

fn executor_stage_json(task_time: u64) -> Value {
    json!({
        "taskTime": task_time,
        "failedTasks": 0,
        "succeededTasks": 5,
        "inputBytes": 500,
        "inputRecords": 5,
        "outputBytes": 0,
        "outputRecords": 0,
        "shuffleRead": 0,
        "shuffleReadRecords": 0,
        "shuffleWrite": 0,
        "shuffleWriteRecords": 0,
        "memoryBytesSpilled": 0,
        "diskBytesSpilled": 0
    })
}

/// Executor "7" ran tasks but is missing from the executor listing.
async fn stage_detail(Path((_app, stage)): Path<(String, u64)>) -> Json<Value> {
    Json(json!({
        "stageId": stage,
        "executorSummary": {
            "1": executor_stage_json(600),
            "7": executor_stage_json(400)
        }
    }))
}

async fn task_summary(Path((_app, _stage)): Path<(String, u64)>) -> Json<Value> {
    let flat = json!([10.0, 10.0, 10.0, 10.0, 10.0]);
    Json(json!({
        "quantiles": [0.001, 0.25, 0.5, 0.75, 0.999],
        "executorDeserializeTime": flat, "executorDeserializeCpuTime": flat,
        "executorRunTime": [90.0, 100.0, 100.0, 100.0, 110.0],
        "executorCpuTime": flat, "resultSize": flat, "jvmGcTime": flat,
        "resultSerializationTime": flat, "gettingResultTime": flat,
        "schedulerDelay": flat, "peakExecutionMemory": flat,
        "memoryBytesSpilled": flat, "diskBytesSpilled": flat,
        "inputMetrics": {"bytesRead": flat, "recordsRead": flat},
        "outputMetrics": {"bytesWritten": flat, "recordsWritten": flat},
        "shuffleReadMetrics": {
            "readBytes": flat, "readRecords": flat, "remoteBlocksFetched": flat,
            "localBlocksFetched": flat, "fetchWaitTime": flat, "remoteBytesRead": flat,
            "remoteBytesReadToDisk": flat, "totalBlocksFetched": flat
        },
        "shuffleWriteMetrics": {"writeBytes": flat, "writeRecords": flat, "writeTime": flat}
    }))
}

async fn task_list(Path((_app, stage)): Path<(String, u64)>) -> Json<Value> {
    let spilled = if stage == 1 { 800 } else { 0 };
    Json(json!([{
        "taskId": stage * 100 + 11,
        "index": 0,
        "attempt": 0,
        "launchTime": "2020-10-23T12:25:01.000GMT",
        "duration": 110,
        "executorId": "7",
        "host": "10.0.0.7",
        "status": "SUCCESS",
        "taskLocality": "PROCESS_LOCAL",
        "speculative": false,
        "taskMetrics": {
            "executorRunTime": 110,
            "memoryBytesSpilled": spilled,
            "diskBytesSpilled": spilled / 2,
            "inputMetrics": {"bytesRead": 100, "recordsRead": 1}
        }
    }]))
}

// ── Scenarios ──────────────────────────────────────────────────────

fn config_for(base_url: String) -> SparkscopeConfig {
    let mut config = SparkscopeConfig::default();
    config.history_server.base_url = base_url;
    config.history_server.worker_pool_size = 3;
    config.history_server.request_timeout_secs = 5;
    config
}

#[tokio::test]
async fn ingest_then_analyze() {
    let stub = Shared::default();
    let config = config_for(serve(Arc::clone(&stub)).await);
    let store = StateStore::open_in_memory().unwrap();
    let orchestrator = Orchestrator::new(store.clone(), &config).unwrap();

    let report = orchestrator.run(SyncMode::Incremental).await.unwrap();
    assert_eq!(report.app_ids, vec![APP_ID.to_string()]);
    assert!(report.rows > 0);

    let app = store.get_application(APP_ID).unwrap().unwrap();
    assert_eq!(app.name, "nightly-etl");
    assert_eq!(app.spark_property("spark.executor.memory"), Some("2g"));
    assert_eq!(
        app.spark_command.as_deref(),
        Some("org.apache.spark.deploy.SparkSubmit --class Etl etl.jar")
    );

    // the retried attempt of stage 0 is not stored
    let stages = store.list_stages(APP_ID).unwrap();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].attempt_id, 0);
    assert_eq!(stages[0].status, "FAILED");
    assert_eq!(stages[1].job_key, format!("{APP_ID}_1"));

    let placeholder = store
        .get_executor(&format!("{APP_ID}_7"))
        .unwrap()
        .unwrap();
    assert!(placeholder.placeholder);
    assert_eq!(store.list_executors(APP_ID).unwrap().len(), 3);
    assert_eq!(store.list_stage_executors(&format!("{APP_ID}_1")).unwrap().len(), 2);
    assert!(store.get_stage_statistics(&format!("{APP_ID}_1")).unwrap().is_some());
    assert_eq!(store.list_tasks(&format!("{APP_ID}_1")).unwrap().len(), 1);

    let diagnostics = Diagnostics::run(&store, APP_ID, &config.thresholds).unwrap();
    let overview = diagnostics.overview();
    assert_eq!(overview[&MetricKind::JobFailure], Severity::High);
    assert_eq!(overview[&MetricKind::StageFailure], Severity::High);
    assert_eq!(overview[&MetricKind::StageDiskSpill], Severity::High);
    assert!(!overview.contains_key(&MetricKind::StageSkew));
    assert_eq!(
        diagnostics.severity,
        overview.values().copied().max().unwrap()
    );

    let spill = diagnostics.get(MetricKind::StageDiskSpill).unwrap();
    let evidence = spill.evidence();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].entity_id.as_deref(), Some("1"));
    assert!(evidence[0].subdetails.iter().any(|line| line.contains("task 111")));
}

#[tokio::test]
async fn second_run_starts_at_watermark() {
    let stub = Shared::default();
    let config = config_for(serve(Arc::clone(&stub)).await);
    let store = StateStore::open_in_memory().unwrap();
    let orchestrator = Orchestrator::new(store.clone(), &config).unwrap();

    orchestrator.run(SyncMode::Incremental).await.unwrap();
    let second = orchestrator.run(SyncMode::Incremental).await.unwrap();
    assert!(second.app_ids.is_empty());
    assert_eq!(second.rows, 0);
    assert_eq!(store.count::<Application>().unwrap(), 1);

    let listings = stub.listings.lock().unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0]["minEndDate"], "1970-01-01T00:00:00.001GMT");
    assert_eq!(listings[1]["minEndDate"], "2020-10-23T12:34:56.013GMT");
    assert_eq!(listings[1]["status"], "completed");
}

#[tokio::test]
async fn test_mode_requests_a_fixed_count() {
    let stub = Shared::default();
    let mut config = config_for(serve(Arc::clone(&stub)).await);
    config.testing.apps_number = 3;
    let store = StateStore::open_in_memory().unwrap();
    let orchestrator = Orchestrator::new(store.clone(), &config).unwrap();

    let report = orchestrator.run(SyncMode::Test).await.unwrap();
    assert_eq!(report.app_ids.len(), 1);

    let listings = stub.listings.lock().unwrap();
    assert_eq!(listings[0]["limit"], "3");
    assert!(!listings[0].contains_key("minEndDate"));
}

#[tokio::test]
async fn unclaimed_stage_rolls_back_everything() {
    let stub = Arc::new(Stub {
        orphan_stage: true,
        ..Stub::default()
    });
    let config = config_for(serve(stub).await);
    let store = StateStore::open_in_memory().unwrap();
    let orchestrator = Orchestrator::new(store.clone(), &config).unwrap();

    let err = orchestrator.run(SyncMode::Incremental).await.unwrap_err();
    assert!(matches!(err, FetchError::UnclaimedStage(ref key) if *key == format!("{APP_ID}_1")));
    assert_eq!(store.count::<Application>().unwrap(), 0);
    assert_eq!(store.count::<Job>().unwrap(), 0);
}

#[tokio::test]
async fn unreachable_server_fails_the_run() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = config_for(format!("http://{addr}/api/v1/applications"));
    let store = StateStore::open_in_memory().unwrap();
    let orchestrator = Orchestrator::new(store.clone(), &config).unwrap();

    let err = orchestrator.run(SyncMode::Incremental).await.unwrap_err();
    assert!(matches!(err, FetchError::ApplicationList(_)));
    assert_eq!(store.count::<Application>().unwrap(), 0);
}
