//! Runs every analyzer for one application and merges their findings.

use std::collections::BTreeMap;

use sparkscope_core::config::ThresholdsConfig;
use sparkscope_state::StateStore;
use tracing::{debug, info};

use crate::analyzers::{AppConfigAnalyzer, ExecutorAnalyzer, JobAnalyzer, StageAnalyzer};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::metric::{Metric, MetricKind};
use crate::severity::Severity;

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub app_id: String,
    /// Findings above `None`, keyed by kind.
    pub metrics: BTreeMap<MetricKind, Metric>,
    /// Highest severity across `metrics`, `None` when there are none.
    pub severity: Severity,
}

impl Diagnostics {
    pub fn run(
        store: &StateStore,
        app_id: &str,
        thresholds: &ThresholdsConfig,
    ) -> AnalyzerResult<Self> {
        let app = store
            .get_application(app_id)?
            .ok_or_else(|| AnalyzerError::AppNotFound(app_id.to_string()))?;

        let stages = StageAnalyzer::new(store, app_id, thresholds)?;
        let jobs = JobAnalyzer::new(store, app_id, &thresholds.job_failure)?;
        let executors =
            ExecutorAnalyzer::new(store, app_id, &thresholds.driver_gc, &thresholds.executor_gc)?;
        let config = AppConfigAnalyzer::new(&app, &thresholds.app_config);

        let findings = [
            stages.failed_stages(),
            stages.stage_skew()?,
            stages.disk_spill()?,
            jobs.failed_jobs(),
            executors.driver_gc_time(),
            executors.executors_gc_time(),
            config.serializer(),
            config.dynamic_allocation(),
            config.min_max_executors(),
            config.yarn_queue(),
            config.memory(),
            config.cores(),
        ];
        let diagnostics = Self::from_metrics(app_id, findings.into_iter().flatten());
        info!(
            %app_id,
            findings = diagnostics.metrics.len(),
            severity = %diagnostics.severity,
            "diagnostics complete"
        );
        Ok(diagnostics)
    }

    /// Keep the metrics that flag an issue; later duplicates of a kind win.
    pub fn from_metrics(app_id: &str, metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut overview = BTreeMap::new();
        for metric in metrics {
            if !metric.severity.is_issue() {
                debug!(%app_id, kind = ?metric.kind, "dropping metric without severity");
                continue;
            }
            overview.insert(metric.kind, metric);
        }
        let severity = Severity::max_of(overview.values().map(|m| m.severity));
        Self {
            app_id: app_id.to_string(),
            metrics: overview,
            severity,
        }
    }

    /// Kind to severity, the shape shown in an application overview.
    pub fn overview(&self) -> BTreeMap<MetricKind, Severity> {
        self.metrics
            .iter()
            .map(|(kind, metric)| (*kind, metric.severity))
            .collect()
    }

    pub fn get(&self, kind: MetricKind) -> Option<&Metric> {
        self.metrics.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::DetailsList;
    use crate::fixtures::{Fixture, app_with, job, stage};
    use crate::properties::*;
    use sparkscope_core::config::ListLimit;

    fn metric(kind: MetricKind, severity: Severity) -> Metric {
        Metric::new(kind, severity, "summary", DetailsList::default(), ListLimit::Unbounded)
    }

    #[test]
    fn overall_severity_is_maximum() {
        let d = Diagnostics::from_metrics(
            "app-1",
            [
                metric(MetricKind::StageSkew, Severity::Low),
                metric(MetricKind::JobFailure, Severity::High),
                metric(MetricKind::Serializer, Severity::None),
            ],
        );
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.metrics.len(), 2);
        assert!(d.get(MetricKind::Serializer).is_none());
        assert_eq!(d.overview()[&MetricKind::StageSkew], Severity::Low);
    }

    #[test]
    fn no_findings_is_none() {
        let d = Diagnostics::from_metrics("app-1", Vec::<Metric>::new());
        assert_eq!(d.severity, Severity::None);
        assert!(d.overview().is_empty());
    }

    #[test]
    fn unknown_application() {
        let store = StateStore::open_in_memory().unwrap();
        let err = Diagnostics::run(&store, "missing", &ThresholdsConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyzerError::AppNotFound(id) if id == "missing"));
    }

    #[test]
    fn well_configured_healthy_app() {
        let app = app_with(&[
            (SERIALIZER, "org.apache.spark.serializer.KryoSerializer"),
            (DYNAMIC_ALLOCATION, "true"),
            (SHUFFLE_SERVICE, "true"),
            (MAX_EXECUTORS, "20"),
            (QUEUE, "etl"),
            (EXECUTOR_CORES, "4"),
        ]);
        let fixture = Fixture::new(app)
            .with_jobs(&[job(0, "SUCCEEDED")])
            .with_stages(&[stage(0, "COMPLETE")]);

        let d = Diagnostics::run(&fixture.store, "app-1", &ThresholdsConfig::default()).unwrap();
        assert!(d.metrics.is_empty(), "unexpected findings: {:?}", d.overview());
        assert_eq!(d.severity, Severity::None);
    }

    #[test]
    fn failures_dominate() {
        let fixture = Fixture::new(app_with(&[]))
            .with_jobs(&[job(0, "FAILED")])
            .with_stages(&[stage(0, "FAILED")]);

        let d = Diagnostics::run(&fixture.store, "app-1", &ThresholdsConfig::default()).unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.overview()[&MetricKind::JobFailure], Severity::High);
        assert_eq!(d.overview()[&MetricKind::StageFailure], Severity::High);
        assert!(d.get(MetricKind::Serializer).is_some());
    }
}
