//! Job walker. Also records which job owns each stage, since stage payloads
//! do not name their job.

use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};

use serde::Deserialize;
use sparkscope_core::keys::composite_key;
use sparkscope_state::{IngestSession, Job, Timestamp};
use tracing::{debug, info};

use super::{WalkContext, decode, gmt_opt, rows};
use crate::error::FetchResult;
use crate::pool::KeyMode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobData {
    job_id: u64,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "gmt_opt")]
    submission_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "gmt_opt")]
    completion_time: Option<Timestamp>,
    stage_ids: Vec<u64>,
    status: String,
    num_tasks: u64,
    num_active_tasks: u64,
    num_completed_tasks: u64,
    num_skipped_tasks: u64,
    num_failed_tasks: u64,
    num_killed_tasks: u64,
    num_completed_indices: u64,
    num_active_stages: u64,
    num_completed_stages: u64,
    num_skipped_stages: u64,
    num_failed_stages: u64,
    #[serde(default)]
    killed_tasks_summary: BTreeMap<String, u64>,
}

/// Stage key to owning job key, built by the job walker and consumed by the
/// stage walker.
///
/// A stage reused by a later job (shown there as skipped) stays with the
/// lowest job id that claims it, the job that actually ran it.
#[derive(Debug, Default)]
pub struct StageOwnership {
    owners: HashMap<String, (u64, String)>,
}

impl StageOwnership {
    pub fn claim(&mut self, stage_key: String, job_id: u64, job_key: &str) {
        match self.owners.entry(stage_key) {
            Entry::Occupied(mut owner) => {
                if job_id < owner.get().0 {
                    owner.insert((job_id, job_key.to_string()));
                }
            }
            Entry::Vacant(slot) => {
                slot.insert((job_id, job_key.to_string()));
            }
        }
    }

    pub fn owner(&self, stage_key: &str) -> Option<&str> {
        self.owners.get(stage_key).map(|(_, job_key)| job_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    app_ids: &[String],
) -> FetchResult<StageOwnership> {
    let urls = app_ids.iter().map(|id| ctx.urls.jobs(id)).collect();
    let results = ctx.pool.fetch_all(urls, KeyMode::ByApp).await;

    let mut ownership = StageOwnership::default();
    let mut staged = 0;
    for (app_id, payload) in &results {
        let Some(payload) = payload else { continue };
        for raw in rows("job list", app_id, payload)? {
            let data: JobData = decode("job", app_id, raw)?;
            let job_key = composite_key(app_id, data.job_id);
            for stage_id in &data.stage_ids {
                ownership.claim(composite_key(app_id, stage_id), data.job_id, &job_key);
            }
            session.add(&job(app_id, job_key, data))?;
            staged += 1;
        }
        debug!(%app_id, "jobs staged");
    }

    info!(count = staged, stages_claimed = ownership.len(), "jobs staged");
    Ok(ownership)
}

fn job(app_id: &str, job_key: String, data: JobData) -> Job {
    Job {
        job_key,
        app_id: app_id.to_string(),
        job_id: data.job_id,
        name: data.name,
        status: data.status,
        submission_time: data.submission_time,
        completion_time: data.completion_time,
        num_tasks: data.num_tasks,
        num_active_tasks: data.num_active_tasks,
        num_completed_tasks: data.num_completed_tasks,
        num_skipped_tasks: data.num_skipped_tasks,
        num_failed_tasks: data.num_failed_tasks,
        num_killed_tasks: data.num_killed_tasks,
        num_completed_indices: data.num_completed_indices,
        num_active_stages: data.num_active_stages,
        num_completed_stages: data.num_completed_stages,
        num_skipped_stages: data.num_skipped_stages,
        num_failed_stages: data.num_failed_stages,
        killed_tasks_summary: data.killed_tasks_summary,
    }
}
