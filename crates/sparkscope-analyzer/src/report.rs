//! Text and JSON renderings of an application's diagnostics.

use std::fmt;

use serde::Serialize;
use sparkscope_core::units::{fmt_bytes, fmt_time};

use crate::details::MetricDetails;
use crate::diagnostics::Diagnostics;
use crate::metric::{Metric, MetricKind};
use crate::severity::Severity;
use crate::summary::{AppSummary, ConfigSnapshot};

/// Serializable view of one analysis, evidence already capped.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub app_id: &'a str,
    pub severity: Severity,
    pub summary: &'a AppSummary,
    pub config: &'a ConfigSnapshot,
    pub metrics: Vec<MetricView<'a>>,
}

#[derive(Debug, Serialize)]
pub struct MetricView<'a> {
    pub kind: MetricKind,
    pub title: &'static str,
    pub severity: Severity,
    pub summary: &'a str,
    pub evidence: Vec<&'a MetricDetails>,
    pub hidden: usize,
}

impl<'a> From<&'a Metric> for MetricView<'a> {
    fn from(metric: &'a Metric) -> Self {
        Self {
            kind: metric.kind,
            title: metric.title(),
            severity: metric.severity,
            summary: &metric.summary,
            evidence: metric.evidence(),
            hidden: metric.hidden(),
        }
    }
}

impl<'a> Report<'a> {
    pub fn new(
        diagnostics: &'a Diagnostics,
        summary: &'a AppSummary,
        config: &'a ConfigSnapshot,
    ) -> Self {
        Self {
            app_id: &diagnostics.app_id,
            severity: diagnostics.severity,
            summary,
            config,
            metrics: diagnostics.metrics.values().map(MetricView::from).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain text: banner, basic figures, then one block per finding.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "{} ({})  overall severity: {}", s.name, self.app_id, self.severity)?;
        writeln!(
            f,
            "  duration {}, executor run time {}, cpu time {}",
            fmt_time(s.duration as f64 / 1000.0),
            fmt_time(s.executor_run_time as f64 / 1000.0),
            fmt_time(s.executor_cpu_time as f64 / 1e9),
        )?;
        writeln!(
            f,
            "  {} jobs, {} stages, {} tasks, {} executors, GC {}",
            s.jobs,
            s.stages,
            s.tasks,
            s.executors,
            fmt_time(s.total_gc_time as f64 / 1000.0),
        )?;

        let c = self.config;
        writeln!(
            f,
            "  driver {} + {} overhead, {} cores; executors {} + {} overhead, {} cores",
            fmt_bytes(c.driver_memory as f64),
            fmt_bytes(c.driver_memory_overhead as f64),
            c.driver_cores,
            fmt_bytes(c.executor_memory as f64),
            fmt_bytes(c.executor_memory_overhead as f64),
            c.executor_cores,
        )?;

        if self.metrics.is_empty() {
            return writeln!(f, "\nNo issues found.");
        }
        for metric in &self.metrics {
            writeln!(f, "\n[{}] {}", metric.severity, metric.title)?;
            writeln!(f, "  {}", metric.summary)?;
            for details in &metric.evidence {
                writeln!(f, "  - {}", details.detail)?;
                for line in &details.subdetails {
                    writeln!(f, "      {line}")?;
                }
            }
            if metric.hidden > 0 {
                writeln!(f, "  ... and {} more", metric.hidden)?;
            }
        }
        Ok(())
    }
}
