//! sparkscope.toml configuration parser.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{self, UnitError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkscopeConfig {
    pub history_server: HistoryServerConfig,
    pub testing: TestingConfig,
    pub store: StoreConfig,
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryServerConfig {
    /// API root, e.g. `https://shs.example.com:18488/api/v1/applications`.
    pub base_url: String,
    pub verify_certificates: bool,
    pub worker_pool_size: usize,
    /// Maximum tasks fetched per stage, longest-running first.
    pub task_limit: u64,
    pub request_timeout_secs: u64,
}

impl Default for HistoryServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:18080/api/v1/applications".to_string(),
            verify_certificates: true,
            worker_pool_size: 8,
            task_limit: i32::MAX as u64,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    pub apps_number: u32,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self { apps_number: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sparkscope.redb"),
        }
    }
}

// ── Threshold values ───────────────────────────────────────────────

/// How many evidence records a metric shows. `-1` in TOML means all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ListLimit {
    Unbounded,
    Top(usize),
}

impl From<i64> for ListLimit {
    fn from(n: i64) -> Self {
        if n < 0 {
            ListLimit::Unbounded
        } else {
            ListLimit::Top(n as usize)
        }
    }
}

impl From<ListLimit> for i64 {
    fn from(limit: ListLimit) -> Self {
        match limit {
            ListLimit::Unbounded => -1,
            ListLimit::Top(n) => n as i64,
        }
    }
}

/// A byte size written Spark-style (`"8g"`, `"384m"`), validated at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl TryFrom<String> for ByteSize {
    type Error = UnitError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        units::size_in_bytes(&text).map(ByteSize)
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const STEPS: [(u64, &str); 3] = [(1 << 30, "g"), (1 << 20, "m"), (1 << 10, "k")];
        for (unit, suffix) in STEPS {
            if self.0 >= unit && self.0 % unit == 0 {
                return write!(f, "{}{suffix}", self.0 / unit);
            }
        }
        write!(f, "{}b", self.0)
    }
}

fn gib(n: u64) -> ByteSize {
    ByteSize(n << 30)
}

/// A one-sided threshold pair. Direction is fixed by the check using it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ByteBounds {
    pub low: ByteSize,
    pub high: ByteSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalBounds {
    pub lower_high: f64,
    pub lower_low: f64,
    pub upper_low: f64,
    pub upper_high: f64,
}

impl IntervalBounds {
    fn is_ordered(&self) -> bool {
        self.lower_high <= self.lower_low
            && self.lower_low <= self.upper_low
            && self.upper_low <= self.upper_high
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub stage_failure: FailureConfig,
    pub job_failure: FailureConfig,
    pub stage_skew: StageSkewConfig,
    pub stage_disk_spill: DiskSpillConfig,
    pub driver_gc: GcConfig,
    pub executor_gc: GcConfig,
    pub app_config: AppConfigThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub max_listed: ListLimit,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            max_listed: ListLimit::Top(10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSkewConfig {
    /// Stages with less total executor run time are ignored.
    pub min_runtime_ms: u64,
    pub max_listed: ListLimit,
    /// Ascending bounds over max/median executor run time.
    pub ratio: Bounds,
}

impl Default for StageSkewConfig {
    fn default() -> Self {
        Self {
            min_runtime_ms: 30_000,
            max_listed: ListLimit::Top(5),
            ratio: Bounds::new(2.0, 1_000_000.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskSpillConfig {
    pub max_listed: ListLimit,
    /// Ascending bounds over spilled bytes / largest IO volume.
    pub ratio: Bounds,
}

impl Default for DiskSpillConfig {
    fn default() -> Self {
        Self {
            max_listed: ListLimit::Top(5),
            ratio: Bounds::new(0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    pub max_listed: ListLimit,
    /// Descending bounds: GC share this small is suspicious.
    pub too_low: Bounds,
    /// Ascending bounds: GC share this large hurts throughput.
    pub too_high: Bounds,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            max_listed: ListLimit::Unbounded,
            too_low: Bounds::new(0.04, 0.01),
            too_high: Bounds::new(0.08, 0.15),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfigThresholds {
    pub preferred_serializer: String,
    pub dynamic_allocation_preferred: bool,
    pub default_queue_allowed: bool,
    /// Overhead assumed when unset: `max(floor, fraction * memory)`.
    pub overhead_fraction: f64,
    pub overhead_floor: ByteSize,
    pub max_listed: ListLimit,
    pub min_executors: Bounds,
    pub max_executors: Bounds,
    pub driver_memory: ByteBounds,
    pub driver_memory_overhead: ByteBounds,
    pub executor_memory: ByteBounds,
    pub executor_memory_overhead: ByteBounds,
    pub driver_cores: IntervalBounds,
    pub executor_cores: IntervalBounds,
}

impl Default for AppConfigThresholds {
    fn default() -> Self {
        Self {
            preferred_serializer: "org.apache.spark.serializer.KryoSerializer".to_string(),
            dynamic_allocation_preferred: true,
            default_queue_allowed: false,
            overhead_fraction: 0.10,
            overhead_floor: ByteSize(384 << 20),
            max_listed: ListLimit::Unbounded,
            min_executors: Bounds::new(5.0, 10.0),
            max_executors: Bounds::new(50.0, 100.0),
            driver_memory: ByteBounds {
                low: gib(8),
                high: gib(16),
            },
            driver_memory_overhead: ByteBounds {
                low: gib(2),
                high: gib(4),
            },
            executor_memory: ByteBounds {
                low: gib(16),
                high: gib(32),
            },
            executor_memory_overhead: ByteBounds {
                low: gib(4),
                high: gib(8),
            },
            driver_cores: IntervalBounds {
                lower_high: 1.0,
                lower_low: 1.0,
                upper_low: 4.0,
                upper_high: 8.0,
            },
            executor_cores: IntervalBounds {
                lower_high: 1.0,
                lower_low: 2.0,
                upper_low: 5.0,
                upper_high: 8.0,
            },
        }
    }
}

impl SparkscopeConfig {
    /// Load, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), base_url = %config.history_server.base_url, "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SparkscopeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.history_server;
        if server.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "history_server.base_url must not be empty".to_string(),
            ));
        }
        if server.worker_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "history_server.worker_pool_size must be at least 1".to_string(),
            ));
        }
        if server.task_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_server.task_limit must be at least 1".to_string(),
            ));
        }

        let app = &self.thresholds.app_config;
        for (name, interval) in [
            ("driver_cores", &app.driver_cores),
            ("executor_cores", &app.executor_cores),
        ] {
            if !interval.is_ordered() {
                return Err(ConfigError::Invalid(format!(
                    "thresholds.app_config.{name} must satisfy lower_high <= lower_low <= upper_low <= upper_high"
                )));
            }
        }
        Ok(())
    }
}
