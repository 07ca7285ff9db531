//! Stage-level findings: failures, run time skew and memory spill.

use sparkscope_core::config::ThresholdsConfig;
use sparkscope_core::units::{fmt_bytes, fmt_time};
use sparkscope_state::{Stage, StateStore, maximum, median};
use tracing::debug;

use crate::details::{DetailsList, MetricDetails, Ranking};
use crate::error::AnalyzerResult;
use crate::metric::{Metric, MetricKind};
use crate::severity::Severity;
use crate::thresholds::Thresholds;

pub struct StageAnalyzer<'a> {
    store: &'a StateStore,
    thresholds: &'a ThresholdsConfig,
    stages: Vec<Stage>,
}

impl<'a> StageAnalyzer<'a> {
    pub fn new(
        store: &'a StateStore,
        app_id: &str,
        thresholds: &'a ThresholdsConfig,
    ) -> AnalyzerResult<Self> {
        let stages = store.list_stages(app_id)?;
        debug!(%app_id, stages = stages.len(), "stage analyzer loaded");
        Ok(Self {
            store,
            thresholds,
            stages,
        })
    }

    /// HIGH whenever any stage failed or was killed.
    pub fn failed_stages(&self) -> Option<Metric> {
        let mut details = DetailsList::new(Ranking::SmallestFirst);
        for stage in self.stages.iter().filter(|s| s.is_failed()) {
            let reason = stage.failure_reason.as_deref().unwrap_or("no reason given");
            details.push(MetricDetails::new(
                stage.stage_id.to_string(),
                format!("Stage {} {}: {reason}", stage.stage_id, stage.status),
                stage.stage_id as f64,
            ));
        }
        if details.is_empty() {
            return None;
        }

        let summary = format!("{}/{} stages failed", details.len(), self.stages.len());
        Some(Metric::new(
            MetricKind::StageFailure,
            Severity::High,
            summary,
            details,
            self.thresholds.stage_failure.max_listed,
        ))
    }

    /// Max over median task run time, for stages long enough to matter.
    pub fn stage_skew(&self) -> AnalyzerResult<Option<Metric>> {
        let config = &self.thresholds.stage_skew;
        let thresholds = Thresholds::ascending(config.ratio);

        let mut severity = Severity::None;
        let mut details = DetailsList::new(Ranking::LargestFirst);
        for stage in &self.stages {
            if stage.executor_run_time <= config.min_runtime_ms {
                continue;
            }
            let Some(stats) = self.store.get_stage_statistics(&stage.stage_key)? else {
                debug!(stage_key = %stage.stage_key, "no statistics, skew not evaluated");
                continue;
            };

            let runtime_median = median(&stats.executor_run_time) / 1000.0;
            let runtime_max = maximum(&stats.executor_run_time) / 1000.0;
            let stage_severity = if runtime_median == 0.0 {
                Severity::High
            } else {
                thresholds.severity_of(runtime_max / runtime_median)
            };
            if !stage_severity.is_issue() {
                continue;
            }
            severity = severity.max(stage_severity);

            let pair = |values: &[f64; 5]| {
                format!(
                    "{} (max), {} (median)",
                    fmt_bytes(maximum(values)),
                    fmt_bytes(median(values))
                )
            };
            details.push(
                MetricDetails::new(
                    stage.stage_id.to_string(),
                    format!(
                        "Stage {}: executor run time {} (max), {} (median)",
                        stage.stage_id,
                        fmt_time(runtime_max),
                        fmt_time(runtime_median)
                    ),
                    runtime_max - runtime_median,
                )
                .with_subdetails(vec![
                    format!("Read {}", pair(&stats.bytes_read)),
                    format!("Wrote {}", pair(&stats.bytes_written)),
                    format!("Shuffle read {}", pair(&stats.shuffle_read_bytes)),
                    format!("Shuffle write {}", pair(&stats.shuffle_write_bytes)),
                ]),
            );
        }
        if details.is_empty() {
            return Ok(None);
        }

        let summary = format!("{} stages with significant skew found", details.len());
        Ok(Some(Metric::new(
            MetricKind::StageSkew,
            severity,
            summary,
            details,
            config.max_listed,
        )))
    }

    /// Spilled memory relative to the stage's largest IO volume.
    pub fn disk_spill(&self) -> AnalyzerResult<Option<Metric>> {
        let config = &self.thresholds.stage_disk_spill;
        let thresholds = Thresholds::ascending(config.ratio);

        let mut severity = Severity::None;
        let mut details = DetailsList::new(Ranking::LargestFirst);
        let mut total_spilled = 0u64;
        let mut spilling_stages = 0usize;
        for stage in self.stages.iter().filter(|s| s.memory_bytes_spilled > 0) {
            total_spilled += stage.memory_bytes_spilled;
            spilling_stages += 1;

            let max_io = stage.max_io_bytes();
            let stage_severity = if max_io == 0 {
                Severity::High
            } else {
                thresholds.severity_of(stage.memory_bytes_spilled as f64 / max_io as f64)
            };
            if !stage_severity.is_issue() {
                continue;
            }
            severity = severity.max(stage_severity);

            let worst_task = self
                .store
                .list_tasks(&stage.stage_key)?
                .into_iter()
                .max_by_key(|t| t.memory_bytes_spilled);
            let contributor = match worst_task {
                Some(task) => format!(
                    "Biggest contributor: task {}, {} spilled ({} on disk)",
                    task.task_id,
                    fmt_bytes(task.memory_bytes_spilled as f64),
                    fmt_bytes(task.disk_bytes_spilled as f64)
                ),
                None => "No task data for this stage".to_string(),
            };
            details.push(
                MetricDetails::new(
                    stage.stage_id.to_string(),
                    format!(
                        "Stage {} spilled {} ({} on disk)",
                        stage.stage_id,
                        fmt_bytes(stage.memory_bytes_spilled as f64),
                        fmt_bytes(stage.disk_bytes_spilled as f64)
                    ),
                    stage.memory_bytes_spilled as f64,
                )
                .with_subdetails(vec![
                    format!(
                        "Input: {}, output: {}",
                        fmt_bytes(stage.input_bytes as f64),
                        fmt_bytes(stage.output_bytes as f64)
                    ),
                    format!(
                        "Shuffle read: {}, shuffle write: {}",
                        fmt_bytes(stage.shuffle_read_bytes as f64),
                        fmt_bytes(stage.shuffle_write_bytes as f64)
                    ),
                    contributor,
                ]),
            );
        }
        if details.is_empty() {
            return Ok(None);
        }

        let summary = format!(
            "{} spilled in {spilling_stages} stages",
            fmt_bytes(total_spilled as f64)
        );
        Ok(Some(Metric::new(
            MetricKind::StageDiskSpill,
            severity,
            summary,
            details,
            config.max_listed,
        )))
    }
}
