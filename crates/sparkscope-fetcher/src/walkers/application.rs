//! Application walker: the listing plus one environment per application.

use serde::Deserialize;
use serde_json::Value;
use sparkscope_core::json::{lookup, lookup_str, property_pairs};
use sparkscope_state::{Application, ExecutionMode, IngestSession, RuntimeInfo, Timestamp};
use tracing::{debug, info, warn};

use super::{WalkContext, decode, gmt, shape_error};
use crate::error::{FetchError, FetchResult};
use crate::pool::KeyMode;

/// System property holding the submitted driver command line.
const DRIVER_COMMAND_PROPERTY: &str = "sun.java.command";

#[derive(Debug, Deserialize)]
struct ApplicationInfo {
    id: String,
    name: String,
    attempts: Vec<AttemptInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptInfo {
    attempt_id: Option<String>,
    #[serde(deserialize_with = "gmt")]
    start_time: Timestamp,
    #[serde(deserialize_with = "gmt")]
    end_time: Timestamp,
    duration: u64,
    spark_user: String,
    completed: bool,
}

/// Stage every listed application. Returns their ids in listing order.
pub async fn walk(
    ctx: &WalkContext<'_>,
    session: &mut IngestSession,
    listing_url: &str,
) -> FetchResult<Vec<String>> {
    let listing = ctx
        .pool
        .fetch(listing_url)
        .await
        .ok_or_else(|| FetchError::ApplicationList(listing_url.to_string()))?;
    let infos: Vec<ApplicationInfo> = decode("application list", listing_url, &listing)?;
    debug!(count = infos.len(), "applications listed");

    let mut listed = Vec::with_capacity(infos.len());
    for info in infos {
        let attempt = info
            .attempts
            .into_iter()
            .next()
            .ok_or_else(|| shape_error("application", &info.id, "no attempts"))?;
        listed.push((info.id, info.name, attempt));
    }

    let env_urls = listed
        .iter()
        .map(|(id, _, attempt)| ctx.urls.environment(id, attempt.attempt_id.as_deref()))
        .collect();
    let environments = ctx.pool.fetch_all(env_urls, KeyMode::ByApp).await;

    let mut app_ids = Vec::with_capacity(listed.len());
    for (app_id, name, attempt) in listed {
        let env = environments.get(&app_id).and_then(Option::as_ref);
        let mode = if attempt.attempt_id.is_some() {
            ExecutionMode::Cluster
        } else {
            ExecutionMode::Client
        };
        let app = Application {
            spark_properties: env
                .and_then(|e| lookup(e, &["sparkProperties"]))
                .map(property_pairs)
                .unwrap_or_default(),
            runtime: env.map(runtime_info),
            spark_command: env.and_then(|e| driver_command(e, &app_id)),
            app_id,
            name,
            start_time: attempt.start_time,
            end_time: attempt.end_time,
            duration: attempt.duration,
            spark_user: attempt.spark_user,
            completed: attempt.completed,
            mode,
        };
        session.add(&app)?;
        app_ids.push(app.app_id);
    }

    info!(count = app_ids.len(), "applications staged");
    Ok(app_ids)
}

fn runtime_info(env: &Value) -> RuntimeInfo {
    let field = |name: &str| lookup_str(env, &["runtime", name]).map(str::to_string);
    RuntimeInfo {
        java_version: field("javaVersion"),
        java_home: field("javaHome"),
        scala_version: field("scalaVersion"),
    }
}

/// The driver command line, only when exactly one entry carries it.
fn driver_command(env: &Value, app_id: &str) -> Option<String> {
    let properties = property_pairs(lookup(env, &["systemProperties"])?);
    let mut commands = properties
        .into_iter()
        .filter(|(key, _)| key == DRIVER_COMMAND_PROPERTY)
        .map(|(_, value)| value);
    match (commands.next(), commands.next()) {
        (Some(command), None) => Some(command),
        (None, _) => {
            warn!(%app_id, "no driver command in environment");
            None
        }
        (Some(_), Some(_)) => {
            warn!(%app_id, "ambiguous driver command in environment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_from_environment() {
        let env = json!({"runtime": {"javaVersion": "1.8.0_252", "scalaVersion": "2.12.10"}});
        let runtime = runtime_info(&env);
        assert_eq!(runtime.java_version.as_deref(), Some("1.8.0_252"));
        assert_eq!(runtime.java_home, None);
        assert_eq!(runtime.scala_version.as_deref(), Some("2.12.10"));
    }

    #[test]
    fn driver_command_requires_single_match() {
        let single = json!({"systemProperties": [
            ["java.version", "1.8"],
            ["sun.java.command", "org.apache.spark.deploy.SparkSubmit --class Etl"],
        ]});
        assert_eq!(
            driver_command(&single, "app").as_deref(),
            Some("org.apache.spark.deploy.SparkSubmit --class Etl")
        );

        let twice = json!({"systemProperties": [
            ["sun.java.command", "a"],
            ["sun.java.command", "b"],
        ]});
        assert_eq!(driver_command(&twice, "app"), None);
        assert_eq!(driver_command(&json!({"systemProperties": []}), "app"), None);
        assert_eq!(driver_command(&json!({}), "app"), None);
    }

    #[test]
    fn attempt_decoding() {
        let info: ApplicationInfo = decode(
            "application list",
            "listing",
            &json!({
                "id": "app-1",
                "name": "etl",
                "attempts": [{
                    "attemptId": "1",
                    "startTime": "2020-10-23T12:00:00.000GMT",
                    "endTime": "2020-10-23T12:34:56.012GMT",
                    "duration": 2096012,
                    "sparkUser": "spark",
                    "completed": true
                }]
            }),
        )
        .unwrap();
        assert_eq!(info.attempts[0].attempt_id.as_deref(), Some("1"));
        assert_eq!(info.attempts[0].duration, 2_096_012);
    }
}
