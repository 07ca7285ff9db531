//! Typed reads of an application's submitted Spark properties.
//!
//! Values that do not parse fall back to the given default with a warning;
//! a bad property never fails an analysis.

use sparkscope_core::units::{parse_bool, size_in_bytes};
use sparkscope_state::Application;
use tracing::warn;

pub const SERIALIZER: &str = "spark.serializer";
pub const DYNAMIC_ALLOCATION: &str = "spark.dynamicAllocation.enabled";
pub const SHUFFLE_TRACKING: &str = "spark.dynamicAllocation.shuffleTracking.enabled";
pub const SHUFFLE_SERVICE: &str = "spark.shuffle.service.enabled";
pub const MIN_EXECUTORS: &str = "spark.dynamicAllocation.minExecutors";
pub const MAX_EXECUTORS: &str = "spark.dynamicAllocation.maxExecutors";
pub const EXECUTOR_INSTANCES: &str = "spark.executor.instances";
pub const QUEUE: &str = "spark.yarn.queue";
pub const DRIVER_MEMORY: &str = "spark.driver.memory";
pub const DRIVER_MEMORY_OVERHEAD: &str = "spark.driver.memoryOverhead";
pub const EXECUTOR_MEMORY: &str = "spark.executor.memory";
pub const EXECUTOR_MEMORY_OVERHEAD: &str = "spark.executor.memoryOverhead";
pub const DRIVER_CORES: &str = "spark.driver.cores";
pub const EXECUTOR_CORES: &str = "spark.executor.cores";

pub const DEFAULT_SERIALIZER: &str = "org.apache.spark.serializer.JavaSerializer";
pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_MEMORY: u64 = 1 << 30;
pub const DEFAULT_CORES: u64 = 1;

pub struct SparkProperties<'a> {
    app: &'a Application,
}

impl<'a> SparkProperties<'a> {
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.app.spark_property(key)
    }

    pub fn serializer(&self) -> &'a str {
        self.get(SERIALIZER).unwrap_or(DEFAULT_SERIALIZER)
    }

    /// The submitted queue, `None` when unset.
    pub fn queue(&self) -> Option<&'a str> {
        self.get(QUEUE)
    }

    /// Unset or explicitly `default`.
    pub fn uses_default_queue(&self) -> bool {
        self.queue().is_none_or(|queue| queue == DEFAULT_QUEUE)
    }

    /// Boolean property; unset and malformed both read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        let Some(raw) = self.get(key) else {
            return false;
        };
        parse_bool(raw).unwrap_or_else(|e| {
            warn!(app_id = %self.app.app_id, key, error = %e, "malformed flag, assuming false");
            false
        })
    }

    /// Byte-size property, `default` when unset or malformed.
    pub fn bytes(&self, key: &str, default: u64) -> u64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        size_in_bytes(raw).unwrap_or_else(|e| {
            warn!(app_id = %self.app.app_id, key, error = %e, default, "malformed size, using default");
            default
        })
    }

    /// Non-negative integer property. Malformed values read as unset.
    pub fn count(&self, key: &str) -> Option<u64> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(app_id = %self.app.app_id, key, error = %e, "malformed count, ignoring");
                None
            }
        }
    }

    /// Memory overhead, or `max(floor, fraction * memory)` when unset.
    pub fn overhead(&self, key: &str, memory: u64, fraction: f64, floor: u64) -> u64 {
        let assumed = ((memory as f64 * fraction) as u64).max(floor);
        self.bytes(key, assumed)
    }
}
