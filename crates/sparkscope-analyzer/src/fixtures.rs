//! Entity builders shared by the unit tests.

use std::collections::BTreeMap;

use sparkscope_core::keys::composite_key;
use sparkscope_state::{
    Application, ExecutionMode, Executor, Job, Stage, StageStatistics, StateStore, Task,
    Timestamp,
};

pub const APP_ID: &str = "app-1";

pub fn app_with(properties: &[(&str, &str)]) -> Application {
    Application {
        app_id: APP_ID.to_string(),
        name: "etl".to_string(),
        start_time: Timestamp::default(),
        end_time: Timestamp::default(),
        duration: 600_000,
        spark_user: "spark".to_string(),
        completed: true,
        mode: ExecutionMode::Client,
        runtime: None,
        spark_properties: properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        spark_command: None,
    }
}

pub fn job(job_id: u64, status: &str) -> Job {
    Job {
        job_key: composite_key(APP_ID, job_id),
        app_id: APP_ID.to_string(),
        job_id,
        name: format!("job {job_id}"),
        status: status.to_string(),
        submission_time: None,
        completion_time: None,
        num_tasks: 10,
        num_active_tasks: 0,
        num_completed_tasks: 10,
        num_skipped_tasks: 0,
        num_failed_tasks: 0,
        num_killed_tasks: 0,
        num_completed_indices: 10,
        num_active_stages: 0,
        num_completed_stages: 1,
        num_skipped_stages: 0,
        num_failed_stages: 0,
        killed_tasks_summary: BTreeMap::new(),
    }
}

pub fn stage(stage_id: u64, status: &str) -> Stage {
    Stage {
        stage_key: composite_key(APP_ID, stage_id),
        app_id: APP_ID.to_string(),
        job_key: composite_key(APP_ID, 0),
        stage_id,
        attempt_id: 0,
        status: status.to_string(),
        name: format!("stage {stage_id}"),
        details: String::new(),
        failure_reason: None,
        scheduling_pool: "default".to_string(),
        submission_time: None,
        first_task_launched_time: None,
        completion_time: None,
        num_tasks: 10,
        num_active_tasks: 0,
        num_complete_tasks: 10,
        num_failed_tasks: 0,
        num_killed_tasks: 0,
        num_completed_indices: 10,
        executor_run_time: 1_000,
        executor_cpu_time: 900_000_000,
        input_bytes: 0,
        input_records: 0,
        output_bytes: 0,
        output_records: 0,
        shuffle_read_bytes: 0,
        shuffle_read_records: 0,
        shuffle_write_bytes: 0,
        shuffle_write_records: 0,
        memory_bytes_spilled: 0,
        disk_bytes_spilled: 0,
        rdd_ids: Vec::new(),
        killed_tasks_summary: BTreeMap::new(),
    }
}

/// Statistics whose run time quantiles are `run_time`; every other metric is flat.
pub fn statistics(stage_id: u64, run_time: [f64; 5]) -> StageStatistics {
    let flat = [0.0; 5];
    StageStatistics {
        stage_key: composite_key(APP_ID, stage_id),
        app_id: APP_ID.to_string(),
        quantiles: [0.001, 0.25, 0.5, 0.75, 0.999],
        executor_deserialize_time: flat,
        executor_deserialize_cpu_time: flat,
        executor_run_time: run_time,
        executor_cpu_time: flat,
        result_size: flat,
        jvm_gc_time: flat,
        result_serialization_time: flat,
        getting_result_time: flat,
        scheduler_delay: flat,
        peak_execution_memory: flat,
        memory_bytes_spilled: flat,
        disk_bytes_spilled: flat,
        bytes_read: flat,
        records_read: flat,
        bytes_written: flat,
        records_written: flat,
        shuffle_read_bytes: flat,
        shuffle_read_records: flat,
        shuffle_remote_blocks_fetched: flat,
        shuffle_local_blocks_fetched: flat,
        shuffle_fetch_wait_time: flat,
        shuffle_remote_bytes_read: flat,
        shuffle_remote_bytes_read_to_disk: flat,
        shuffle_total_blocks_fetched: flat,
        shuffle_write_bytes: flat,
        shuffle_write_records: flat,
        shuffle_write_time: flat,
    }
}

pub fn executor(id: &str, total_duration: u64, total_gc_time: u64) -> Executor {
    Executor {
        executor_key: composite_key(APP_ID, id),
        app_id: APP_ID.to_string(),
        id: id.to_string(),
        is_active: false,
        total_cores: 4,
        total_duration,
        total_gc_time,
        ..Executor::default()
    }
}

pub fn task(stage_id: u64, task_id: u64, memory_bytes_spilled: u64) -> Task {
    let stage_key = composite_key(APP_ID, stage_id);
    Task {
        task_key: composite_key(&stage_key, task_id),
        stage_key,
        app_id: APP_ID.to_string(),
        executor_key: composite_key(APP_ID, "1"),
        task_id,
        memory_bytes_spilled,
        disk_bytes_spilled: memory_bytes_spilled / 2,
        ..Task::default()
    }
}

/// Everything handed to a single ingest session, committed.
pub struct Fixture {
    pub store: StateStore,
}

impl Fixture {
    pub fn new(app: Application) -> Self {
        let store = StateStore::open_in_memory().unwrap();
        let mut session = store.begin_ingest();
        session.add(&app).unwrap();
        session.commit().unwrap();
        Self { store }
    }

    pub fn with_jobs(self, jobs: &[Job]) -> Self {
        self.commit(jobs)
    }

    pub fn with_stages(self, stages: &[Stage]) -> Self {
        self.commit(stages)
    }

    pub fn with_statistics(self, statistics: &[StageStatistics]) -> Self {
        self.commit(statistics)
    }

    pub fn with_executors(self, executors: &[Executor]) -> Self {
        self.commit(executors)
    }

    pub fn with_tasks(self, tasks: &[Task]) -> Self {
        self.commit(tasks)
    }

    fn commit<T: sparkscope_state::Record>(self, rows: &[T]) -> Self {
        let mut session = self.store.begin_ingest();
        for row in rows {
            session.add(row).unwrap();
        }
        session.commit().unwrap();
        self
    }
}
