use sparkscope_core::config::FailureConfig;
use sparkscope_state::{Job, StateStore};

use crate::details::{DetailsList, MetricDetails, Ranking};
use crate::error::AnalyzerResult;
use crate::metric::{Metric, MetricKind};
use crate::severity::Severity;

pub struct JobAnalyzer<'a> {
    config: &'a FailureConfig,
    jobs: Vec<Job>,
}

impl<'a> JobAnalyzer<'a> {
    pub fn new(store: &StateStore, app_id: &str, config: &'a FailureConfig) -> AnalyzerResult<Self> {
        Ok(Self {
            config,
            jobs: store.list_jobs(app_id)?,
        })
    }

    /// HIGH whenever any job failed or was killed.
    pub fn failed_jobs(&self) -> Option<Metric> {
        let mut details = DetailsList::new(Ranking::SmallestFirst);
        for job in self.jobs.iter().filter(|j| j.is_failed()) {
            details.push(
                MetricDetails::new(
                    job.job_id.to_string(),
                    format!("Job {} {}", job.job_id, job.status),
                    job.job_id as f64,
                )
                .with_subdetails(vec![format!(
                    "{} of {} tasks failed, {} of {} stages failed",
                    job.num_failed_tasks,
                    job.num_tasks,
                    job.num_failed_stages,
                    job.num_completed_stages + job.num_failed_stages + job.num_skipped_stages
                )]),
            );
        }
        if details.is_empty() {
            return None;
        }

        let summary = format!("{}/{} jobs failed", details.len(), self.jobs.len());
        Some(Metric::new(
            MetricKind::JobFailure,
            Severity::High,
            summary,
            details,
            self.config.max_listed,
        ))
    }
}
