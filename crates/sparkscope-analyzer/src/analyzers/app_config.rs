//! Checks over the configuration an application was submitted with.

use sparkscope_core::config::AppConfigThresholds;
use sparkscope_core::units::fmt_bytes;
use sparkscope_state::Application;

use crate::details::{DetailsList, MetricDetails, Ranking};
use crate::metric::{Metric, MetricKind};
use crate::properties::{self as keys, SparkProperties};
use crate::severity::Severity;
use crate::thresholds::{IntervalThresholds, Thresholds};

pub struct AppConfigAnalyzer<'a> {
    props: SparkProperties<'a>,
    config: &'a AppConfigThresholds,
}

impl<'a> AppConfigAnalyzer<'a> {
    pub fn new(app: &'a Application, config: &'a AppConfigThresholds) -> Self {
        Self {
            props: SparkProperties::new(app),
            config,
        }
    }

    pub fn serializer(&self) -> Option<Metric> {
        let used = self.props.serializer();
        let preferred = &self.config.preferred_serializer;
        if used == preferred.as_str() {
            return None;
        }
        Some(self.metric(
            MetricKind::Serializer,
            Severity::High,
            format!("{used} was used, but {preferred} could have better performance"),
            DetailsList::default(),
        ))
    }

    /// Dynamic allocation should be on, and when on it needs somewhere to
    /// keep shuffle files of released executors.
    pub fn dynamic_allocation(&self) -> Option<Metric> {
        let enabled = self.props.flag(keys::DYNAMIC_ALLOCATION);
        if self.config.dynamic_allocation_preferred && !enabled {
            return Some(self.metric(
                MetricKind::DynamicAllocation,
                Severity::High,
                "Dynamic allocation was disabled for this application",
                DetailsList::default(),
            ));
        }

        let tracking = self.props.flag(keys::SHUFFLE_TRACKING);
        let service = self.props.flag(keys::SHUFFLE_SERVICE);
        if !enabled || tracking || service {
            return None;
        }
        let mut details = DetailsList::default();
        details.push(MetricDetails::note("Current settings:").with_subdetails(vec![
            format!("{} = {tracking}", keys::SHUFFLE_TRACKING),
            format!("{} = {service}", keys::SHUFFLE_SERVICE),
        ]));
        Some(self.metric(
            MetricKind::DynamicAllocation,
            Severity::High,
            "With dynamic allocation enabled, an external shuffle service or shuffle tracking should be enabled",
            details,
        ))
    }

    /// Only meaningful under dynamic allocation. The maximum is checked only
    /// on the default queue, where nothing else caps it.
    pub fn min_max_executors(&self) -> Option<Metric> {
        if !self.props.flag(keys::DYNAMIC_ALLOCATION) {
            return None;
        }

        let mut severity = Severity::None;
        let mut details = DetailsList::new(Ranking::LargestFirst);

        let min = self.props.count(keys::MIN_EXECUTORS).unwrap_or(0);
        let min_severity = Thresholds::ascending(self.config.min_executors).severity_of(min as f64);
        if min_severity.is_issue() {
            severity = severity.max(min_severity);
            details.push(MetricDetails::new(
                keys::MIN_EXECUTORS,
                format!(
                    "{} = {min}, recommended at most {}",
                    keys::MIN_EXECUTORS,
                    self.config.min_executors.low
                ),
                min as f64,
            ));
        }

        if self.props.uses_default_queue() {
            let max = self.props.count(keys::MAX_EXECUTORS);
            let max_value = max.map_or(f64::INFINITY, |n| n as f64);
            let max_severity = Thresholds::ascending(self.config.max_executors).severity_of(max_value);
            if max_severity.is_issue() {
                severity = severity.max(max_severity);
                let shown = max.map_or_else(|| "unset (unlimited)".to_string(), |n| n.to_string());
                details.push(MetricDetails::new(
                    keys::MAX_EXECUTORS,
                    format!(
                        "{} = {shown}, recommended at most {}",
                        keys::MAX_EXECUTORS,
                        self.config.max_executors.low
                    ),
                    max_value,
                ));
            }
        }

        if details.is_empty() {
            return None;
        }
        Some(self.metric(
            MetricKind::MinMaxExecutors,
            severity,
            "The number of executors under dynamic allocation is not capped sensibly",
            details,
        ))
    }

    pub fn yarn_queue(&self) -> Option<Metric> {
        if self.config.default_queue_allowed || !self.props.uses_default_queue() {
            return None;
        }
        Some(self.metric(
            MetricKind::YarnQueue,
            Severity::High,
            format!(
                "The application ran in the {} queue; submit it with {} set",
                keys::DEFAULT_QUEUE,
                keys::QUEUE
            ),
            DetailsList::default(),
        ))
    }

    /// Memory and memory overhead ceilings for the driver and the executors.
    pub fn memory(&self) -> Option<Metric> {
        let config = self.config;
        let fraction = config.overhead_fraction;
        let floor = config.overhead_floor.bytes();

        let driver_memory = self.props.bytes(keys::DRIVER_MEMORY, keys::DEFAULT_MEMORY);
        let executor_memory = self.props.bytes(keys::EXECUTOR_MEMORY, keys::DEFAULT_MEMORY);
        let checks = [
            (keys::DRIVER_MEMORY, driver_memory, config.driver_memory),
            (
                keys::DRIVER_MEMORY_OVERHEAD,
                self.props
                    .overhead(keys::DRIVER_MEMORY_OVERHEAD, driver_memory, fraction, floor),
                config.driver_memory_overhead,
            ),
            (keys::EXECUTOR_MEMORY, executor_memory, config.executor_memory),
            (
                keys::EXECUTOR_MEMORY_OVERHEAD,
                self.props
                    .overhead(keys::EXECUTOR_MEMORY_OVERHEAD, executor_memory, fraction, floor),
                config.executor_memory_overhead,
            ),
        ];

        let mut severity = Severity::None;
        let mut details = DetailsList::new(Ranking::LargestFirst);
        for (key, value, bounds) in checks {
            let check = Thresholds::bytes(bounds).severity_of(value as f64);
            if !check.is_issue() {
                continue;
            }
            severity = severity.max(check);
            details.push(MetricDetails::new(
                key,
                format!(
                    "{key} = {}, recommended at most {}",
                    fmt_bytes(value as f64),
                    fmt_bytes(bounds.low.bytes() as f64)
                ),
                value as f64,
            ));
        }

        if details.is_empty() {
            return None;
        }
        Some(self.metric(
            MetricKind::MemoryConfig,
            severity,
            "The requested memory exceeds the recommended limits",
            details,
        ))
    }

    pub fn cores(&self) -> Option<Metric> {
        let checks = [
            (keys::DRIVER_CORES, self.config.driver_cores),
            (keys::EXECUTOR_CORES, self.config.executor_cores),
        ];

        let mut severity = Severity::None;
        let mut details = DetailsList::new(Ranking::LargestFirst);
        for (key, bounds) in checks {
            let cores = self.props.count(key).unwrap_or(keys::DEFAULT_CORES);
            let check = IntervalThresholds::from(bounds).severity_of(cores as f64);
            if !check.is_issue() {
                continue;
            }
            severity = severity.max(check);
            details.push(MetricDetails::new(
                key,
                format!(
                    "{key} = {cores}, recommended between {} and {}",
                    bounds.lower_low, bounds.upper_low
                ),
                cores as f64,
            ));
        }

        if details.is_empty() {
            return None;
        }
        Some(self.metric(
            MetricKind::CoreNumber,
            severity,
            "The number of driver or executor cores is not set optimally",
            details,
        ))
    }

    fn metric(
        &self,
        kind: MetricKind,
        severity: Severity,
        summary: impl Into<String>,
        details: DetailsList,
    ) -> Metric {
        Metric::new(kind, severity, summary, details, self.config.max_listed)
    }
}
