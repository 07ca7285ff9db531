use std::fmt;

use serde::Serialize;
use sparkscope_core::config::ListLimit;

use crate::details::{DetailsList, MetricDetails};
use crate::severity::Severity;

/// Every finding the diagnostics engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    StageFailure,
    StageSkew,
    StageDiskSpill,
    JobFailure,
    DriverGcTime,
    ExecutorGcTime,
    Serializer,
    DynamicAllocation,
    MinMaxExecutors,
    YarnQueue,
    MemoryConfig,
    CoreNumber,
}

impl MetricKind {
    pub fn title(self) -> &'static str {
        match self {
            MetricKind::StageFailure => "Failed Stages",
            MetricKind::StageSkew => "Stage Skew",
            MetricKind::StageDiskSpill => "Disk Spill",
            MetricKind::JobFailure => "Failed Jobs",
            MetricKind::DriverGcTime => "Driver GC Time",
            MetricKind::ExecutorGcTime => "Executors GC Time",
            MetricKind::Serializer => "Serializer",
            MetricKind::DynamicAllocation => "Dynamic Allocation",
            MetricKind::MinMaxExecutors => "Min/Max Executors",
            MetricKind::YarnQueue => "YARN Queue",
            MetricKind::MemoryConfig => "Memory Config",
            MetricKind::CoreNumber => "Number of Cores",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A non-empty finding: severity, one-line summary and ranked evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub kind: MetricKind,
    pub severity: Severity,
    pub summary: String,
    pub details: DetailsList,
    /// How much of `details` is shown.
    pub max_listed: ListLimit,
}

impl Metric {
    pub fn new(
        kind: MetricKind,
        severity: Severity,
        summary: impl Into<String>,
        details: DetailsList,
        max_listed: ListLimit,
    ) -> Self {
        Self {
            kind,
            severity,
            summary: summary.into(),
            details,
            max_listed,
        }
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// The evidence records to show, worst first.
    pub fn evidence(&self) -> Vec<&MetricDetails> {
        self.details.top(self.max_listed)
    }

    /// Records left out of [`evidence`](Self::evidence).
    pub fn hidden(&self) -> usize {
        self.details.len() - self.evidence().len()
    }
}
