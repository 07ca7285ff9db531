//! One ingestion run: every walker in dependency order inside a single
//! ingest session.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use sparkscope_core::{SparkscopeConfig, UrlBuilder};
use sparkscope_state::{IngestSession, StateResult, StateStore, Timestamp};
use tracing::{debug, error, info};

use crate::error::FetchResult;
use crate::pool::FetchPool;
use crate::walkers::{self, WalkContext, format_timestamp};

/// Which applications a run asks the history server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Applications completed after everything already stored.
    Incremental,
    /// A fixed number of the newest applications, ignoring the store.
    Test,
}

/// Outcome of a committed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub app_ids: Vec<String>,
    pub rows: usize,
    pub elapsed: Duration,
}

pub struct Orchestrator {
    store: StateStore,
    pool: FetchPool,
    urls: UrlBuilder,
    task_limit: u64,
    test_apps: u32,
}

impl Orchestrator {
    pub fn new(store: StateStore, config: &SparkscopeConfig) -> FetchResult<Self> {
        let server = &config.history_server;
        Ok(Self {
            store,
            pool: FetchPool::new(server)?,
            urls: UrlBuilder::new(&server.base_url),
            task_limit: server.task_limit,
            test_apps: config.testing.apps_number,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Fetch, stage and commit one batch of applications.
    ///
    /// Either everything the run fetched becomes visible or nothing does.
    pub async fn run(&self, mode: SyncMode) -> FetchResult<IngestReport> {
        let started = Instant::now();
        let listing_url = match mode {
            SyncMode::Incremental => {
                let since = watermark(&self.store)?;
                info!(watermark = %since, "incremental sync");
                self.urls.applications_since(&since)
            }
            SyncMode::Test => {
                info!(limit = self.test_apps, "test-mode sync");
                self.urls.applications_limited(self.test_apps)
            }
        };

        let mut session = self.store.begin_ingest();
        let app_ids = match self.walk_all(&mut session, &listing_url).await {
            Ok(app_ids) => app_ids,
            Err(e) => {
                error!(error = %e, "ingestion failed, rolling back");
                session.rollback();
                return Err(e);
            }
        };

        let rows = session.commit().inspect_err(|e| {
            error!(error = %e, "ingestion commit failed");
        })?;
        let elapsed = started.elapsed();
        info!(
            apps = app_ids.len(),
            rows,
            elapsed_ms = elapsed.as_millis() as u64,
            "ingestion committed"
        );
        Ok(IngestReport {
            app_ids,
            rows,
            elapsed,
        })
    }

    async fn walk_all(
        &self,
        session: &mut IngestSession,
        listing_url: &str,
    ) -> FetchResult<Vec<String>> {
        let ctx = WalkContext {
            pool: &self.pool,
            urls: &self.urls,
            task_limit: self.task_limit,
        };

        debug!(url = %listing_url, "phase: applications");
        let app_ids = walkers::application::walk(&ctx, session, listing_url).await?;
        if app_ids.is_empty() {
            info!("no new applications");
            return Ok(app_ids);
        }

        debug!(apps = app_ids.len(), "phase: executors");
        walkers::executor::walk(&ctx, session, &app_ids).await?;

        debug!("phase: jobs");
        let ownership = walkers::job::walk(&ctx, session, &app_ids).await?;

        debug!(claimed = ownership.len(), "phase: stages");
        let stages = walkers::stage::walk(&ctx, session, &app_ids, &ownership).await?;

        debug!("phase: stage executors");
        walkers::stage_executor::walk(&ctx, session, &stages).await?;

        debug!("phase: stage statistics");
        walkers::stage_statistics::walk(&ctx, session, &stages).await?;

        debug!("phase: tasks");
        walkers::task::walk(&ctx, session, &stages).await?;

        Ok(app_ids)
    }
}

// ── Watermark ──────────────────────────────────────────────────────

/// Lower bound on end time for the next incremental run.
pub fn watermark(store: &StateStore) -> StateResult<String> {
    Ok(format_watermark(store.latest_end_time()?))
}

/// One millisecond past `latest`, or past the epoch for an empty store.
pub fn format_watermark(latest: Option<Timestamp>) -> String {
    let base = latest.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    format_timestamp(base + TimeDelta::milliseconds(1))
}
