//! Garbage collection share of task time, for the driver and for the
//! executors as a whole.

use sparkscope_core::config::GcConfig;
use sparkscope_core::units::fmt_time;
use sparkscope_state::{Executor, StateStore};

use crate::details::{DetailsList, MetricDetails, Ranking};
use crate::error::AnalyzerResult;
use crate::metric::{Metric, MetricKind};
use crate::severity::Severity;
use crate::thresholds::Thresholds;

pub struct ExecutorAnalyzer<'a> {
    driver_config: &'a GcConfig,
    executor_config: &'a GcConfig,
    driver: Option<Executor>,
    executors: Vec<Executor>,
}

/// Which side of the healthy GC band a ratio fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GcVerdict {
    TooLow(Severity),
    TooHigh(Severity),
}

impl<'a> ExecutorAnalyzer<'a> {
    pub fn new(
        store: &StateStore,
        app_id: &str,
        driver_config: &'a GcConfig,
        executor_config: &'a GcConfig,
    ) -> AnalyzerResult<Self> {
        let (drivers, executors): (Vec<_>, Vec<_>) = store
            .list_executors(app_id)?
            .into_iter()
            .partition(Executor::is_driver);
        Ok(Self {
            driver_config,
            executor_config,
            driver: drivers.into_iter().next(),
            executors,
        })
    }

    pub fn driver_gc_time(&self) -> Option<Metric> {
        let driver = self.driver.as_ref()?;
        let config = self.driver_config;
        let verdict = verdict(config, driver.total_gc_time, driver.total_duration)?;
        let mut details = DetailsList::new(ranking(verdict));
        if let Some(entry) = executor_entry(driver) {
            details.push(entry);
        }
        Some(gc_metric(
            MetricKind::DriverGcTime,
            "Driver",
            verdict,
            driver.total_gc_time,
            driver.total_duration,
            details,
            config,
        ))
    }

    /// Aggregated over every non-driver executor.
    pub fn executors_gc_time(&self) -> Option<Metric> {
        let config = self.executor_config;
        let gc_time: u64 = self.executors.iter().map(|e| e.total_gc_time).sum();
        let duration: u64 = self.executors.iter().map(|e| e.total_duration).sum();
        let verdict = verdict(config, gc_time, duration)?;

        let mut details = DetailsList::new(ranking(verdict));
        for entry in self.executors.iter().filter_map(executor_entry) {
            details.push(entry);
        }
        Some(gc_metric(
            MetricKind::ExecutorGcTime,
            "Executors",
            verdict,
            gc_time,
            duration,
            details,
            config,
        ))
    }
}

/// `None` for no issue or no recorded duration. Equal severities on both
/// sides resolve to "too high".
fn verdict(config: &GcConfig, gc_time: u64, duration: u64) -> Option<GcVerdict> {
    if duration == 0 {
        return None;
    }
    let ratio = gc_time as f64 / duration as f64;
    let too_low = Thresholds::descending(config.too_low).severity_of(ratio);
    let too_high = Thresholds::ascending(config.too_high).severity_of(ratio);
    if too_low > too_high {
        Some(GcVerdict::TooLow(too_low))
    } else if too_high.is_issue() {
        Some(GcVerdict::TooHigh(too_high))
    } else {
        None
    }
}

fn ranking(verdict: GcVerdict) -> Ranking {
    match verdict {
        GcVerdict::TooLow(_) => Ranking::SmallestFirst,
        GcVerdict::TooHigh(_) => Ranking::LargestFirst,
    }
}

fn executor_entry(executor: &Executor) -> Option<MetricDetails> {
    if executor.total_duration == 0 {
        return None;
    }
    let ratio = executor.total_gc_time as f64 / executor.total_duration as f64;
    Some(MetricDetails::new(
        executor.id.clone(),
        format!(
            "Executor {}: {} of {} ({:.2} %)",
            executor.id,
            fmt_time(executor.total_gc_time as f64 / 1000.0),
            fmt_time(executor.total_duration as f64 / 1000.0),
            ratio * 100.0
        ),
        ratio,
    ))
}

fn gc_metric(
    kind: MetricKind,
    subject: &str,
    verdict: GcVerdict,
    gc_time: u64,
    duration: u64,
    details: DetailsList,
    config: &GcConfig,
) -> Metric {
    let (severity, amount) = match verdict {
        GcVerdict::TooLow(severity) => (severity, "too little"),
        GcVerdict::TooHigh(severity) => (severity, "too much"),
    };
    let ratio = gc_time as f64 / duration as f64;
    let summary = format!(
        "{subject} spent {amount} time with Garbage Collection: {} out of {} ({:.2} %)",
        fmt_time(gc_time as f64 / 1000.0),
        fmt_time(duration as f64 / 1000.0),
        ratio * 100.0
    );
    Metric::new(kind, severity, summary, details, config.max_listed)
}
