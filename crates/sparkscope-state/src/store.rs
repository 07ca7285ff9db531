//! StateStore — redb-backed telemetry persistence for Sparkscope.
//!
//! Reads are typed queries scoped to one application or one stage. Writes
//! only happen through an [`IngestSession`], which commits a whole ingestion
//! run in a single transaction.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::session::IngestSession;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

pub(crate) use map_err;

/// Thread-safe telemetry store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        for table in ALL_TABLES {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Start a run-scoped write session. Nothing is visible until it commits.
    pub fn begin_ingest(&self) -> IngestSession {
        IngestSession::new(self.clone())
    }

    // ── Generic access ─────────────────────────────────────────────

    fn get<T: Record>(&self, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(T::TABLE).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Rows whose key starts with `prefix` and that pass `keep`.
    fn scan<T: Record>(&self, prefix: &str, keep: impl Fn(&T) -> bool) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(T::TABLE).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if !key.value().starts_with(prefix) {
                break;
            }
            let record: T = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if keep(&record) {
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Every row of one application. App ids may contain the key separator,
    /// so the prefix match is narrowed by the stored `app_id`.
    fn scan_app<T: Record>(&self, app_id: &str) -> StateResult<Vec<T>> {
        let prefix = format!("{app_id}_");
        self.scan(&prefix, |record: &T| record.app_id() == app_id)
    }

    /// Number of rows in the table holding `T`.
    pub fn count<T: Record>(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(T::TABLE).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    // ── Applications ───────────────────────────────────────────────

    pub fn get_application(&self, app_id: &str) -> StateResult<Option<Application>> {
        self.get(app_id)
    }

    /// All applications, most recently finished first.
    pub fn list_applications(&self) -> StateResult<Vec<Application>> {
        let mut apps: Vec<Application> = self.scan("", |_| true)?;
        apps.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        Ok(apps)
    }

    /// Latest end time over all stored applications.
    pub fn latest_end_time(&self) -> StateResult<Option<Timestamp>> {
        let apps: Vec<Application> = self.scan("", |_| true)?;
        Ok(apps.into_iter().map(|app| app.end_time).max())
    }

    // ── Executors ──────────────────────────────────────────────────

    pub fn list_executors(&self, app_id: &str) -> StateResult<Vec<Executor>> {
        self.scan_app(app_id)
    }

    pub fn get_executor(&self, executor_key: &str) -> StateResult<Option<Executor>> {
        self.get(executor_key)
    }

    // ── Jobs ───────────────────────────────────────────────────────

    pub fn list_jobs(&self, app_id: &str) -> StateResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.scan_app(app_id)?;
        jobs.sort_by_key(|job| job.job_id);
        Ok(jobs)
    }

    // ── Stages ─────────────────────────────────────────────────────

    pub fn list_stages(&self, app_id: &str) -> StateResult<Vec<Stage>> {
        let mut stages: Vec<Stage> = self.scan_app(app_id)?;
        stages.sort_by_key(|stage| stage.stage_id);
        Ok(stages)
    }

    pub fn get_stage(&self, stage_key: &str) -> StateResult<Option<Stage>> {
        self.get(stage_key)
    }

    pub fn get_stage_statistics(&self, stage_key: &str) -> StateResult<Option<StageStatistics>> {
        self.get(stage_key)
    }

    pub fn list_stage_executors(&self, stage_key: &str) -> StateResult<Vec<StageExecutor>> {
        let prefix = format!("{stage_key}_");
        self.scan(&prefix, |row: &StageExecutor| row.stage_key == stage_key)
    }

    // ── Tasks ──────────────────────────────────────────────────────

    pub fn list_tasks(&self, stage_key: &str) -> StateResult<Vec<Task>> {
        let prefix = format!("{stage_key}_");
        self.scan(&prefix, |task: &Task| task.stage_key == stage_key)
    }
}
