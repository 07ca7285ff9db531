//! Resource walkers, one per telemetry level.
//!
//! Every walker follows the same template: build one URL per known parent
//! key, fetch them through the [`FetchPool`], decode each child record into
//! its typed upstream shape, and stage the resulting entity in the run's
//! [`IngestSession`](sparkscope_state::IngestSession).

pub mod application;
pub mod executor;
pub mod job;
pub mod stage;
pub mod stage_executor;
pub mod stage_statistics;
pub mod task;

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sparkscope_core::UrlBuilder;
use sparkscope_state::Timestamp;

use crate::error::{FetchError, FetchResult};
use crate::pool::FetchPool;

pub use job::StageOwnership;

/// Persisted stage ids per application, the parent set for stage-level walkers.
pub type StageIndex = BTreeMap<String, Vec<u64>>;

/// Shared inputs for every walker in one run.
pub struct WalkContext<'a> {
    pub pool: &'a FetchPool,
    pub urls: &'a UrlBuilder,
    pub task_limit: u64,
}

impl WalkContext<'_> {
    /// One URL per `(app, stage)` pair of `stages`.
    pub(crate) fn stage_urls(
        &self,
        stages: &StageIndex,
        build: impl Fn(&UrlBuilder, &str, u64) -> String,
    ) -> Vec<String> {
        stages
            .iter()
            .flat_map(|(app_id, ids)| ids.iter().map(move |&id| (app_id, id)))
            .map(|(app_id, id)| build(self.urls, app_id, id))
            .collect()
    }
}

// ── Payload decoding ───────────────────────────────────────────────

pub(crate) fn shape_error(entity: &'static str, key: &str, reason: impl Display) -> FetchError {
    FetchError::Shape {
        entity,
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Decode one upstream record into its typed shape.
pub(crate) fn decode<T: DeserializeOwned>(
    entity: &'static str,
    key: &str,
    value: &Value,
) -> FetchResult<T> {
    T::deserialize(value).map_err(|e| shape_error(entity, key, e))
}

/// The elements of a list endpoint's body.
pub(crate) fn rows<'a>(entity: &'static str, key: &str, payload: &'a Value) -> FetchResult<&'a [Value]> {
    payload
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| shape_error(entity, key, "expected a JSON array"))
}

// ── Timestamps ─────────────────────────────────────────────────────

/// Upstream timestamps look like `2020-10-23T12:34:56.012GMT`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const TIMEZONE_SUFFIX: &str = "GMT";

pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let local = text.strip_suffix(TIMEZONE_SUFFIX)?;
    NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

pub fn format_timestamp(ts: Timestamp) -> String {
    format!("{}{TIMEZONE_SUFFIX}", ts.format(TIMESTAMP_FORMAT))
}

/// Required timestamp field.
pub(crate) fn gmt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("unparseable timestamp {text:?}")))
}

/// Optional timestamp field; unparseable values become `None`.
pub(crate) fn gmt_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn timestamp_roundtrip_shape() {
        let ts = parse_timestamp("2020-10-23T12:34:56.012GMT").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2020, 10, 23, 12, 34, 56).unwrap() + chrono::TimeDelta::milliseconds(12));
        assert_eq!(format_timestamp(ts), "2020-10-23T12:34:56.012GMT");
    }

    #[test]
    fn bad_timestamps() {
        assert_eq!(parse_timestamp("2020-10-23T12:34:56.012"), None);
        assert_eq!(parse_timestamp("yesterday GMT"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Times {
        #[serde(deserialize_with = "gmt")]
        end_time: Timestamp,
        #[serde(default, deserialize_with = "gmt_opt")]
        remove_time: Option<Timestamp>,
    }

    #[test]
    fn timestamp_fields() {
        let ok: Times = decode("times", "k", &json!({"endTime": "2020-10-23T12:34:56.012GMT", "removeTime": "garbage"})).unwrap();
        assert_eq!(ok.remove_time, None);
        assert_eq!(format_timestamp(ok.end_time), "2020-10-23T12:34:56.012GMT");

        let missing: Times = decode("times", "k", &json!({"endTime": "2020-10-23T12:34:56.012GMT"})).unwrap();
        assert_eq!(missing.remove_time, None);

        let err = decode::<Times>("times", "k", &json!({"endTime": "soon"})).unwrap_err();
        assert!(matches!(err, FetchError::Shape { entity: "times", .. }));
    }

    #[test]
    fn rows_requires_array() {
        assert_eq!(rows("jobs", "app", &json!([1, 2])).unwrap().len(), 2);
        assert!(rows("jobs", "app", &json!({"message": "no such app"})).is_err());
    }
}
